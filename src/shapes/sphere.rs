use std::sync::Arc;

use super::{HitRecord, ShadowRecord, Shape, SurfaceSample};
use crate::{
    materials::Material,
    math::{Ray, Vector2, Vector3, XorShift128, F_HIT_MAX, F_HIT_MIN},
};

pub struct Sphere {
    radius: f32,
    center: Vector3,
    material: Arc<dyn Material>,
}

impl Sphere {
    pub fn new(radius: f32, center: Vector3, material: Arc<dyn Material>) -> Self {
        Self {
            radius,
            center,
            material,
        }
    }

    pub fn area(&self) -> f32 {
        4.0 * std::f32::consts::PI * self.radius * self.radius
    }

    /// Returns the distance of the closest valid intersection, or
    /// [`F_HIT_MAX`] on a miss.
    fn intersect(&self, ray: &Ray) -> f32 {
        let p = self.center - ray.pos;
        let b = p.dot(ray.dir);
        let det = b * b - p.dot(p) + self.radius * self.radius;
        if det >= 0.0 {
            let sqrt_det = det.sqrt();
            let t1 = b - sqrt_det;
            let t2 = b + sqrt_det;
            if t1 > F_HIT_MIN {
                return t1;
            } else if t2 > F_HIT_MIN {
                return t2;
            }
        }

        F_HIT_MAX
    }

    /// Equirectangular projection of a unit normal.
    fn uv(normal: Vector3) -> Vector2 {
        let theta = normal.y.clamp(-1.0, 1.0).acos();
        let mut phi = normal.x.atan2(normal.z);
        if phi < 0.0 {
            phi += std::f32::consts::TAU;
        }
        Vector2::new(
            phi / std::f32::consts::TAU,
            (std::f32::consts::PI - theta) * std::f32::consts::FRAC_1_PI,
        )
    }
}

impl Shape for Sphere {
    fn hit<'a>(&'a self, ray: &Ray, record: &mut HitRecord<'a>) -> bool {
        let dist = self.intersect(ray);
        if dist >= record.dist {
            return false;
        }

        let pos = ray.point(dist);
        let nrm = (pos - self.center) / self.radius;

        record.dist = dist;
        record.pos = pos;
        record.nrm = nrm;
        record.uv = Self::uv(nrm);
        record.shape = Some(self);
        record.material = Some(self.material.as_ref());

        true
    }

    fn shadow_hit<'a>(&'a self, ray: &Ray, record: &mut ShadowRecord<'a>) -> bool {
        let dist = self.intersect(ray);
        if dist >= record.dist {
            return false;
        }

        record.dist = dist;
        record.pdf = 1.0 / self.area();
        record.shape = Some(self);
        record.material = Some(self.material.as_ref());

        true
    }

    fn sample(&self, rng: &mut XorShift128) -> SurfaceSample {
        let r1 = std::f32::consts::TAU * rng.next_f32();
        let r2 = 1.0 - 2.0 * rng.next_f32();
        let r3 = (1.0 - r2 * r2).sqrt();

        let nrm = Vector3::new(r3 * r1.cos(), r3 * r1.sin(), r2);
        SurfaceSample {
            pos: self.center + nrm * self.radius,
            nrm,
            pdf: 1.0 / self.area(),
        }
    }
}
