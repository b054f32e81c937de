use std::{
    path::Path,
    sync::{
        atomic::{AtomicU32, Ordering},
        Mutex,
    },
};

use log::info;

use crate::math::{saturate, Vector3};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[derive(Copy, Clone, Debug, Default)]
pub enum ToneMap {
    None,
    Reinhard,
    #[default]
    AcesFilmic,
}

/// The render target.
///
/// Accumulation is thread safe: every channel lives in an atomic word and
/// [`Canvas::add`] sums with a compare and swap, so two workers on different
/// sample passes of one pixel cannot shear each other. The accumulator is
/// only ever summed into, never reset between passes; `write` works on
/// buffers of its own and may run while workers keep adding, a snapshot torn
/// across passes is fine for preview output.
pub struct Canvas {
    width: usize,
    height: usize,
    accum: Vec<AtomicU32>,
    snapshot: Mutex<Snapshot>,
}

struct Snapshot {
    temp: Vec<Vector3>,
    output: Vec<u8>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        let count = width * height;
        Self {
            width,
            height,
            accum: (0..count * 3).map(|_| AtomicU32::new(0)).collect(),
            snapshot: Mutex::new(Snapshot {
                temp: vec![Vector3::zeros(); count],
                output: vec![0; count * 3],
            }),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Sums `value` into the pixel at `(x, y)`.
    pub fn add(&self, x: usize, y: usize, value: Vector3) {
        let idx = (y * self.width + x) * 3;
        for channel in 0..3 {
            // Atomic float add by bit-casting through the u32 word
            let _ = self.accum[idx + channel].fetch_update(
                Ordering::Relaxed,
                Ordering::Relaxed,
                |bits| Some((f32::from_bits(bits) + value[channel]).to_bits()),
            );
        }
    }

    /// Reads the pixel at `(x, y)` out of the accumulator.
    pub fn at(&self, x: usize, y: usize) -> Vector3 {
        let idx = (y * self.width + x) * 3;
        Vector3::new(
            f32::from_bits(self.accum[idx].load(Ordering::Relaxed)),
            f32::from_bits(self.accum[idx + 1].load(Ordering::Relaxed)),
            f32::from_bits(self.accum[idx + 2].load(Ordering::Relaxed)),
        )
    }

    /// Tone maps the accumulator and writes it out as an 8-bit BMP.
    pub fn write(&self, path: &Path, tone_map: ToneMap) -> Result<()> {
        let mut snapshot = match self.snapshot.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Snapshot { temp, output } = &mut *snapshot;

        for (i, pixel) in temp.iter_mut().enumerate() {
            *pixel = Vector3::new(
                f32::from_bits(self.accum[i * 3].load(Ordering::Relaxed)),
                f32::from_bits(self.accum[i * 3 + 1].load(Ordering::Relaxed)),
                f32::from_bits(self.accum[i * 3 + 2].load(Ordering::Relaxed)),
            );
        }

        match tone_map {
            ToneMap::None => (),
            ToneMap::Reinhard => tonemap_reinhard(temp),
            ToneMap::AcesFilmic => tonemap_aces(temp),
        }
        srgb_correction(temp);

        for (pixel, out) in temp.iter().zip(output.chunks_exact_mut(3)) {
            out[0] = (saturate(pixel.x) * 255.0 + 0.5) as u8;
            out[1] = (saturate(pixel.y) * 255.0 + 0.5) as u8;
            out[2] = (saturate(pixel.z) * 255.0 + 0.5) as u8;
        }

        image::save_buffer(
            path,
            output,
            self.width as u32,
            self.height as u32,
            image::ColorType::Rgb8,
        )?;

        Ok(())
    }

    /// Writes a numbered snapshot under `dir`.
    pub fn write_numbered(&self, dir: &Path, counter: u32, tone_map: ToneMap) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{:03}.bmp", counter));
        self.write(&path, tone_map)?;
        info!("captured {}", path.display());
        Ok(())
    }
}

/// Rec.601 luminance.
fn luminance(value: Vector3) -> f32 {
    value.dot(Vector3::new(0.299, 0.587, 0.114))
}

/// Geometric mean of the pixel luminances, offset so black pixels do not
/// drag the log sum to -inf.
fn log_average_luminance(pixels: &[Vector3]) -> f32 {
    let sum: f32 = pixels
        .iter()
        .map(|&p| (1e-5 + luminance(p)).ln())
        .sum();
    (sum / pixels.len() as f32).exp()
}

fn tonemap_reinhard(pixels: &mut [Vector3]) {
    let a = 0.18;
    let ave_lw = log_average_luminance(pixels);
    let max_lw = pixels
        .iter()
        .map(|&p| luminance(p))
        .fold(0.0f32, f32::max);

    let coeff = a / ave_lw;
    let max_lw2 = (max_lw * coeff) * (max_lw * coeff);

    for pixel in pixels.iter_mut() {
        let l = *pixel * coeff;
        *pixel = Vector3::new(
            l.x * (1.0 + l.x / max_lw2) / (1.0 + l.x),
            l.y * (1.0 + l.y / max_lw2) / (1.0 + l.y),
            l.z * (1.0 + l.z / max_lw2) / (1.0 + l.z),
        );
    }
}

fn tonemap_aces(pixels: &mut [Vector3]) {
    // Narkowicz's curve fit
    let a = 2.51;
    let b = 0.03;
    let c = 2.43;
    let d = 0.59;
    let e = 0.14;

    let exposure = 0.18;
    let coeff = exposure / log_average_luminance(pixels);

    let curve = |x: f32| saturate((x * (a * x + b)) / (x * (c * x + d) + e));
    for pixel in pixels.iter_mut() {
        let p = *pixel * coeff * 0.6;
        *pixel = Vector3::new(curve(p.x), curve(p.y), curve(p.z));
    }
}

/// Piecewise sRGB encode.
pub fn srgb_encode(value: f32) -> f32 {
    if value < 0.0031308 {
        12.92 * value
    } else {
        1.055 * value.powf(1.0 / 2.4) - 0.055
    }
}

fn srgb_correction(pixels: &mut [Vector3]) {
    for pixel in pixels.iter_mut() {
        *pixel = Vector3::new(
            srgb_encode(pixel.x),
            srgb_encode(pixel.y),
            srgb_encode(pixel.z),
        );
    }
}
