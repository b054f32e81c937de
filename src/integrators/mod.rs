mod path;

pub use path::PathIntegrator;

use crate::{
    math::{Ray, Vector3, XorShift128},
    scene::Scene,
};

/// Generic interface that needs to be implemented by all integrators.
pub trait Integrator: Send + Sync {
    /// Evaluates the incoming radiance along `ray`.
    fn li(&self, ray: Ray, scene: &Scene, rng: &mut XorShift128) -> Vector3;
}
