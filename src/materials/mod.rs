mod lambert;
mod mirror;
mod phong;
mod refract;

pub use lambert::Lambert;
pub use mirror::Mirror;
pub use phong::Phong;
pub use refract::Refract;

use crate::math::{Vector2, Vector3, XorShift128};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MaterialKind {
    Lambert,
    Mirror,
    Refract,
    Phong,
}

/// In- and outputs of a single [`Material::shade`] call.
///
/// `input` is the incident ray direction and `normal` the shading normal at
/// the hit. `shade` fills `output` with the sampled outgoing direction and
/// `pdf` with its sampling density.
pub struct ShadingArg<'a> {
    pub input: Vector3,
    pub normal: Vector3,
    pub uv: Vector2,
    pub rng: &'a mut XorShift128,
    pub output: Vector3,
    pub pdf: f32,
}

impl<'a> ShadingArg<'a> {
    pub fn new(input: Vector3, normal: Vector3, uv: Vector2, rng: &'a mut XorShift128) -> Self {
        Self {
            input,
            normal,
            uv,
            rng,
            output: Vector3::zeros(),
            pdf: 0.0,
        }
    }
}

pub trait Material: Send + Sync {
    fn kind(&self) -> MaterialKind;

    /// `true` for materials whose scattering is a delta distribution.
    fn is_delta(&self) -> bool {
        false
    }

    fn emission(&self) -> Vector3;

    /// Russian roulette continuation probability, the maximum albedo channel
    /// floored so even black surfaces keep a sliver of survival.
    fn threshold(&self) -> f32;

    /// Samples an outgoing direction into `arg` and returns the throughput
    /// weight, already divided by the sampling pdf with the cosine applied
    /// where the lobe calls for it.
    fn shade(&self, arg: &mut ShadingArg) -> Vector3;
}

pub(crate) fn roulette_threshold(albedo: Vector3) -> f32 {
    albedo.max_comp().clamp(1e-3, 1.0)
}

/// Reorients `normal` against the incident direction.
pub(crate) fn orienting_normal(normal: Vector3, incident: Vector3) -> Vector3 {
    if normal.dot(incident) < 0.0 {
        normal
    } else {
        -normal
    }
}
