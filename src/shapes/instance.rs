use std::sync::Arc;

use super::{HitRecord, ShadowRecord, Shape, SurfaceSample};
use crate::math::{Matrix4x4, Ray, XorShift128};

/// A shape placed into the world by a transform.
///
/// Shares the child shape, so one mesh can appear any number of times.
pub struct ShapeInstance {
    child: Arc<dyn Shape>,
    world: Matrix4x4,
    inv_world: Matrix4x4,
}

impl ShapeInstance {
    /// Fails when `world` is singular.
    pub fn new(child: Arc<dyn Shape>, world: Matrix4x4) -> Option<Self> {
        let inv_world = world.inverted()?;
        Some(Self {
            child,
            world,
            inv_world,
        })
    }

    fn to_local(&self, ray: &Ray) -> Ray {
        Ray::new(
            self.inv_world.transform_coord(ray.pos),
            self.inv_world.transform_dir(ray.dir).normalized(),
        )
    }
}

impl Shape for ShapeInstance {
    fn hit<'a>(&'a self, ray: &Ray, record: &mut HitRecord<'a>) -> bool {
        let local_ray = self.to_local(ray);

        if self.child.hit(&local_ray, record) {
            record.pos = self.world.transform_coord(record.pos);
            record.nrm = self.inv_world.transform_normal(record.nrm).normalized();
            true
        } else {
            false
        }
    }

    fn shadow_hit<'a>(&'a self, ray: &Ray, record: &mut ShadowRecord<'a>) -> bool {
        let local_ray = self.to_local(ray);
        self.child.shadow_hit(&local_ray, record)
    }

    fn sample(&self, rng: &mut XorShift128) -> SurfaceSample {
        let sample = self.child.sample(rng);
        SurfaceSample {
            pos: self.world.transform_coord(sample.pos),
            nrm: self.inv_world.transform_normal(sample.nrm).normalized(),
            pdf: sample.pdf,
        }
    }
}
