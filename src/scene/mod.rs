mod loader;

use std::{path::PathBuf, sync::Arc, time::Instant};

use log::info;

use crate::{
    bvh::BvhSettings,
    camera::Camera,
    materials::Material,
    math::{Ray, Vector3},
    shapes::{HitRecord, ShadowRecord, Shape},
    textures::Texture,
};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[derive(Clone, Debug)]
pub struct SceneLoadSettings {
    pub path: PathBuf,
    pub bvh: BvhSettings,
}

impl Default for SceneLoadSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("test_scene.xml"),
            bvh: BvhSettings::default(),
        }
    }
}

/// The whole render input: geometry, materials, camera, environment and the
/// target image dimensions. Owns every resource it references; everything is
/// released together when the scene drops.
pub struct Scene {
    pub textures: Vec<Arc<Texture>>,
    pub materials: Vec<Arc<dyn Material>>,
    pub shapes: Vec<Arc<dyn Shape>>,
    pub camera: Camera,
    pub ibl: Option<Arc<Texture>>,
    pub width: u32,
    pub height: u32,
    pub samples: u32,
}

impl Scene {
    /// Loads a scene document and every resource it references.
    ///
    /// Also returns the time it took to load in seconds.
    pub fn load(settings: &SceneLoadSettings) -> Result<(Scene, f32)> {
        let load_start = Instant::now();

        let scene = loader::load(settings)?;

        let total_secs = load_start.elapsed().as_secs_f32();
        info!("Scene: Loading took {:.2}s in total", total_secs);

        Ok((scene, total_secs))
    }

    /// Finds the closest hit along `ray`, folding over the top level shapes.
    pub fn hit<'a>(&'a self, ray: &Ray, record: &mut HitRecord<'a>) -> bool {
        let mut any_hit = false;
        for shape in &self.shapes {
            any_hit |= shape.hit(ray, record);
        }
        any_hit
    }

    pub fn shadow_hit<'a>(&'a self, ray: &Ray, record: &mut ShadowRecord<'a>) -> bool {
        let mut any_hit = false;
        for shape in &self.shapes {
            any_hit |= shape.shadow_hit(ray, record);
        }
        any_hit
    }

    /// Environment radiance for a direction. Black without an IBL.
    pub fn sample_ibl(&self, dir: Vector3) -> Vector3 {
        match &self.ibl {
            Some(ibl) => ibl.sample3d(dir),
            None => Vector3::zeros(),
        }
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("textures", &self.textures.len())
            .field("materials", &self.materials.len())
            .field("shapes", &self.shapes.len())
            .field("camera", &self.camera)
            .field("ibl", &self.ibl.is_some())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("samples", &self.samples)
            .finish()
    }
}
