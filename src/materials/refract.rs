use std::sync::Arc;

use super::{orienting_normal, roulette_threshold, Material, MaterialKind, ShadingArg};
use crate::{
    math::{reflect, Vector2, Vector3},
    textures::Texture,
};

/// A dielectric that splits between reflection and transmission by Fresnel.
pub struct Refract {
    albedo: Vector3,
    emission: Vector3,
    ior: f32,
    texture: Option<Arc<Texture>>,
}

/// Schlick's reflectance approximation. `c` is the Fresnel cosine term.
pub(crate) fn schlick_reflectance(nc: f32, nt: f32, c: f32) -> f32 {
    let a = nt - nc;
    let b = nt + nc;
    let r0 = (a * a) / (b * b);
    r0 + (1.0 - r0) * c.powi(5)
}

impl Refract {
    pub fn new(albedo: Vector3, emission: Vector3, ior: f32, texture: Option<Arc<Texture>>) -> Self {
        Self {
            albedo,
            emission,
            ior,
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

impl Material for Refract {
    fn kind(&self) -> MaterialKind {
        MaterialKind::Refract
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
        let normal = arg.normal;
        let oriented = orienting_normal(normal, arg.input);
        let reflect_dir = reflect(arg.input, oriented);
        let albedo = self.albedo(arg.uv);

        // Air on the outside
        let nc = 1.0;
        let nt = self.ior;

        let into = normal.dot(oriented) > 0.0;
        let nnt = if into { nc / nt } else { nt / nc };
        let ddn = arg.input.dot(oriented);
        let cos2t = 1.0 - nnt * nnt * (1.0 - ddn * ddn);

        // Total internal reflection
        if cos2t <= 0.0 {
            arg.output = reflect_dir;
            arg.pdf = 1.0;
            return albedo;
        }

        let transmit_dir = (arg.input * nnt
            - normal * (if into { 1.0 } else { -1.0 }) * (ddn * nnt + cos2t.sqrt()))
        .normalized();

        let c = 1.0
            - if into {
                -ddn
            } else {
                transmit_dir.dot(normal)
            };
        let re = schlick_reflectance(nc, nt, c);
        let tr = 1.0 - re;
        let prob = 0.25 + 0.5 * re;

        if arg.rng.next_f32() < prob {
            arg.output = reflect_dir;
            arg.pdf = prob;
            albedo * (re / prob)
        } else {
            arg.output = transmit_dir;
            arg.pdf = 1.0 - prob;
            albedo * (tr / (1.0 - prob))
        }
    }
}
