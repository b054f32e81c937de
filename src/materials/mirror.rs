use std::sync::Arc;

use super::{orienting_normal, roulette_threshold, Material, MaterialKind, ShadingArg};
use crate::{
    math::{reflect, Vector2, Vector3},
    textures::Texture,
};

/// A perfect specular reflector.
pub struct Mirror {
    albedo: Vector3,
    emission: Vector3,
    texture: Option<Arc<Texture>>,
}

impl Mirror {
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

impl Material for Mirror {
    fn kind(&self) -> MaterialKind {
        MaterialKind::Mirror
    }

    fn is_delta(&self) -> bool {
        true
    }

    fn emission(&self) -> Vector3 {
        self.emission
    }

    fn threshold(&self) -> f32 {
        roulette_threshold(self.albedo)
    }

    fn shade(&self, arg: &mut ShadingArg) -> Vector3 {
        let normal = orienting_normal(arg.normal, arg.input);

        arg.output = reflect(arg.input, normal);
        arg.pdf = 1.0;

        self.albedo(arg.uv)
    }
}
