use std::path::Path;

use crate::math::{Vector2, Vector3};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// A 3-channel float texture with repeat addressing.
pub struct Texture {
    width: usize,
    height: usize,
    pixels: Vec<f32>,
}

impl Texture {
    /// Decodes the image at `path` into a float RGB buffer.
    pub fn load(path: &Path) -> Result<Self> {
        let image = image::open(path)?.to_rgb32f();
        let width = image.width() as usize;
        let height = image.height() as usize;
        Ok(Self {
            width,
            height,
            pixels: image.into_raw(),
        })
    }

    pub fn from_pixels(width: usize, height: usize, pixels: Vec<f32>) -> Self {
        assert_eq!(pixels.len(), width * height * 3);
        Self {
            width,
            height,
            pixels,
        }
    }

    fn at(&self, x: i32, y: i32) -> Vector3 {
        let x = (x % self.width as i32).unsigned_abs() as usize;
        let y = (y % self.height as i32).unsigned_abs() as usize;

        let idx = (self.width * y + x) * 3;
        Vector3::new(self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2])
    }

    /// Nearest 2D tap.
    pub fn sample_point(&self, texcoord: Vector2) -> Vector3 {
        let x = (texcoord.x * self.width as f32 + 0.5) as i32;
        let y = (texcoord.y * self.height as f32 + 0.5) as i32;
        self.at(x, y)
    }

    /// Bilinear 2D tap.
    pub fn sample2d(&self, texcoord: Vector2) -> Vector3 {
        let fx = texcoord.x * self.width as f32;
        let fy = texcoord.y * self.height as f32;

        let x0 = fx.floor() as i32;
        let y0 = fy.floor() as i32;
        let x1 = x0 + 1;
        let y1 = y0 + 1;

        let wx = fx - x0 as f32;
        let wy = fy - y0 as f32;

        (self.at(x0, y0) * (1.0 - wy) + self.at(x0, y1) * wy) * (1.0 - wx)
            + (self.at(x1, y0) * (1.0 - wy) + self.at(x1, y1) * wy) * wx
    }

    /// Spheremap tap for a direction, used for environment lookups.
    pub fn sample3d(&self, dir: Vector3) -> Vector3 {
        let mut uv = Vector2::new(0.0, dir.y.clamp(-1.0, 1.0).acos() * std::f32::consts::FRAC_1_PI);

        if dir.x != 0.0 || dir.z != 0.0 {
            let mut phi = dir.z.atan2(dir.x);
            if dir.z < 0.0 {
                phi += std::f32::consts::TAU;
            }
            uv.x = phi / std::f32::consts::TAU;
        }

        self.sample2d(uv)
    }
}
