use super::Integrator;
use crate::{
    materials::ShadingArg,
    math::{Ray, Vector3, XorShift128},
    scene::Scene,
    shapes::HitRecord,
};

/// Unidirectional path tracing with Russian roulette termination.
///
/// Beyond `max_depth` bounces a path survives with the hit material's
/// roulette threshold and pays for it in throughput, so the estimate stays
/// unbiased at any depth.
pub struct PathIntegrator {
    max_depth: u32,
}

impl Default for PathIntegrator {
    fn default() -> Self {
        Self { max_depth: 3 }
    }
}

impl PathIntegrator {
    pub fn new(max_depth: u32) -> Self {
        Self { max_depth }
    }
}

impl Integrator for PathIntegrator {
    fn li(&self, mut ray: Ray, scene: &Scene, rng: &mut XorShift128) -> Vector3 {
        let mut radiance = Vector3::zeros();
        let mut throughput = Vector3::ones();

        for depth in 0.. {
            let mut record = HitRecord::new();
            if !scene.hit(&ray, &mut record) {
                radiance += throughput * scene.sample_ibl(ray.dir);
                break;
            }
            let Some(material) = record.material else {
                break;
            };

            radiance += throughput * material.emission();

            let p = if depth > self.max_depth {
                let threshold = material.threshold();
                if rng.next_f32() >= threshold {
                    break;
                }
                threshold
            } else {
                1.0
            };

            let mut arg = ShadingArg::new(ray.dir, record.nrm, record.uv, rng);
            let weight = material.shade(&mut arg);

            ray = Ray::new(record.pos, arg.output);
            throughput = throughput * weight / p;

            if throughput.max_comp() < f32::EPSILON {
                break;
            }
            // A degenerate bounce poisons everything downstream, cut it here
            if !throughput.is_finite() {
                break;
            }
            if !radiance.is_finite() {
                break;
            }
        }

        if radiance.is_finite() {
            radiance
        } else {
            Vector3::zeros()
        }
    }
}

// Next event estimation is deliberately not part of the loop: the shadow
// query contract and surface sampling exist on shapes, so adding it with MIS
// stays local to this file.
