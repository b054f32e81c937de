use std::sync::Arc;

use super::{orienting_normal, roulette_threshold, Material, MaterialKind, ShadingArg};
use crate::{
    math::{reflect, Onb, Vector2, Vector3},
    textures::Texture,
};

/// A glossy lobe around the perfect reflection direction.
pub struct Phong {
    albedo: Vector3,
    emission: Vector3,
    shininess: f32,
    texture: Option<Arc<Texture>>,
}

impl Phong {
    pub fn new(
        albedo: Vector3,
        emission: Vector3,
        shininess: f32,
        texture: Option<Arc<Texture>>,
    ) -> Self {
        Self {
            albedo,
            emission,
            shininess,
            texture,
        }
    }

    fn albedo(&self, uv: Vector2) -> Vector3 {
        match &self.texture {
            Some(texture) => self.albedo * texture.sample2d(uv),
            None => self.albedo,
        }
    }
}

impl Material for Phong {
    fn kind(&self) -> MaterialKind {
        MaterialKind::Phong
    }

    fn emission(&self) -> Vector3 {
        self.emission
    }

    fn threshold(&self) -> f32 {
        roulette_threshold(self.albedo)
    }

    fn shade(&self, arg: &mut ShadingArg) -> Vector3 {
        let normal = orienting_normal(arg.normal, arg.input);
        let onb = Onb::from_w(reflect(arg.input, normal));

        let s = self.shininess;
        let phi = std::f32::consts::TAU * arg.rng.next_f32();
        let cos_theta = (1.0 - arg.rng.next_f32()).powf(1.0 / (s + 1.0));
        let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();

        let dir = (onb.u * phi.cos() * sin_theta
            + onb.v * phi.sin() * sin_theta
            + onb.w * cos_theta)
            .normalized();

        arg.output = dir;
        arg.pdf = (s + 1.0) * std::f32::consts::FRAC_1_PI * 0.5 * cos_theta.powf(s);

        // Lobe samples can dip under the surface, those carry no energy
        let cos_out = dir.dot(normal).max(0.0);
        self.albedo(arg.uv) * (cos_out * (s + 2.0) / (s + 1.0))
    }
}
