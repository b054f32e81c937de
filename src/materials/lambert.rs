use std::sync::Arc;

use super::{orienting_normal, roulette_threshold, Material, MaterialKind, ShadingArg};
use crate::{
    math::{Onb, Vector2, Vector3},
    textures::Texture,
};

/// An ideal diffuse surface.
pub struct Lambert {
    albedo: Vector3,
    emission: Vector3,
    texture: Option<Arc<Texture>>,
}

impl Lambert {
    pub fn new(albedo: Vector3, emission: Vector3, texture: Option<Arc<Texture>>) -> Self {
        Self {
            albedo,
            emission,
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

impl Material for Lambert {
    fn kind(&self) -> MaterialKind {
        MaterialKind::Lambert
    }

    fn emission(&self) -> Vector3 {
        self.emission
    }

    fn threshold(&self) -> f32 {
        roulette_threshold(self.albedo)
    }

    fn shade(&self, arg: &mut ShadingArg) -> Vector3 {
        let normal = orienting_normal(arg.normal, arg.input);
        let onb = Onb::from_w(normal);

        // Cosine-weighted hemisphere sample
        let r1 = std::f32::consts::TAU * arg.rng.next_f32();
        let r2 = arg.rng.next_f32();
        let r2s = r2.sqrt();

        let dir = (onb.u * r1.cos() * r2s + onb.v * r1.sin() * r2s + onb.w * (1.0 - r2).sqrt())
            .normalized();

        arg.output = dir;
        arg.pdf = dir.dot(normal) * std::f32::consts::FRAC_1_PI;

        // The explicit cosine and the sampling pdf cancel
        self.albedo(arg.uv)
    }
}
