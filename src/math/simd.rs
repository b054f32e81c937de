//! SIMD packs for testing a ray against 4 or 8 AABBs at once.
//!
//! Boxes are stored in structure-of-arrays layout so each slab evaluates as
//! straight lane arithmetic. The packed tests run the exact algorithm of
//! [`Bounds3::intersect`] and must stay bit-identical to it per lane;
//! [`hit_slab_reference`] is the scalar oracle the equivalence tests compare
//! against.

use wide::{f32x4, f32x8, CmpLe};

use super::{bounds::Bounds3, ray::Ray, F_HIT_MAX};

/// A scalar ray expanded into 4 identical lanes.
#[derive(Copy, Clone)]
pub struct RayPack4 {
    pub pos_x: f32x4,
    pub pos_y: f32x4,
    pub pos_z: f32x4,
    pub inv_dir_x: f32x4,
    pub inv_dir_y: f32x4,
    pub inv_dir_z: f32x4,
}

impl RayPack4 {
    pub fn splat(ray: Ray) -> Self {
        Self {
            pos_x: f32x4::splat(ray.pos.x),
            pos_y: f32x4::splat(ray.pos.y),
            pos_z: f32x4::splat(ray.pos.z),
            inv_dir_x: f32x4::splat(1.0 / ray.dir.x),
            inv_dir_y: f32x4::splat(1.0 / ray.dir.y),
            inv_dir_z: f32x4::splat(1.0 / ray.dir.z),
        }
    }
}

/// Four AABBs in structure-of-arrays layout.
#[derive(Copy, Clone)]
pub struct Bounds3x4 {
    pub min_x: f32x4,
    pub min_y: f32x4,
    pub min_z: f32x4,
    pub max_x: f32x4,
    pub max_y: f32x4,
    pub max_z: f32x4,
}

impl Bounds3x4 {
    pub fn from_bounds(bounds: [Bounds3; 4]) -> Self {
        Self {
            min_x: f32x4::new(bounds.map(|b| b.mini.x)),
            min_y: f32x4::new(bounds.map(|b| b.mini.y)),
            min_z: f32x4::new(bounds.map(|b| b.mini.z)),
            max_x: f32x4::new(bounds.map(|b| b.maxi.x)),
            max_y: f32x4::new(bounds.map(|b| b.maxi.y)),
            max_z: f32x4::new(bounds.map(|b| b.maxi.z)),
        }
    }

    /// Slab tests the four boxes against `ray`, returning a bitmask of lanes that hit.
    pub fn hit(&self, ray: &RayPack4) -> u32 {
        let t0x = (self.min_x - ray.pos_x) * ray.inv_dir_x;
        let t1x = (self.max_x - ray.pos_x) * ray.inv_dir_x;
        let t0y = (self.min_y - ray.pos_y) * ray.inv_dir_y;
        let t1y = (self.max_y - ray.pos_y) * ray.inv_dir_y;
        let t0z = (self.min_z - ray.pos_z) * ray.inv_dir_z;
        let t1z = (self.max_z - ray.pos_z) * ray.inv_dir_z;

        let tmin = t0x
            .min(t1x)
            .max(t0y.min(t1y))
            .max(t0z.min(t1z))
            .max(f32x4::splat(-F_HIT_MAX));
        let tmax = t0x
            .max(t1x)
            .min(t0y.max(t1y))
            .min(t0z.max(t1z))
            .min(f32x4::splat(F_HIT_MAX));

        lane_mask(&tmin.cmp_le(tmax).to_array())
    }
}

/// Collapses an all-bits-set comparison result into a lane bitmask.
fn lane_mask(lanes: &[f32]) -> u32 {
    let mut mask = 0;
    for (lane, value) in lanes.iter().enumerate() {
        if value.to_bits() != 0 {
            mask |= 1 << lane;
        }
    }
    mask
}

/// A scalar ray expanded into 8 identical lanes.
#[derive(Copy, Clone)]
pub struct RayPack8 {
    pub pos_x: f32x8,
    pub pos_y: f32x8,
    pub pos_z: f32x8,
    pub inv_dir_x: f32x8,
    pub inv_dir_y: f32x8,
    pub inv_dir_z: f32x8,
}

impl RayPack8 {
    pub fn splat(ray: Ray) -> Self {
        Self {
            pos_x: f32x8::splat(ray.pos.x),
            pos_y: f32x8::splat(ray.pos.y),
            pos_z: f32x8::splat(ray.pos.z),
            inv_dir_x: f32x8::splat(1.0 / ray.dir.x),
            inv_dir_y: f32x8::splat(1.0 / ray.dir.y),
            inv_dir_z: f32x8::splat(1.0 / ray.dir.z),
        }
    }
}

/// Eight AABBs in structure-of-arrays layout.
#[derive(Copy, Clone)]
pub struct Bounds3x8 {
    pub min_x: f32x8,
    pub min_y: f32x8,
    pub min_z: f32x8,
    pub max_x: f32x8,
    pub max_y: f32x8,
    pub max_z: f32x8,
}

impl Bounds3x8 {
    pub fn from_bounds(bounds: [Bounds3; 8]) -> Self {
        Self {
            min_x: f32x8::new(bounds.map(|b| b.mini.x)),
            min_y: f32x8::new(bounds.map(|b| b.mini.y)),
            min_z: f32x8::new(bounds.map(|b| b.mini.z)),
            max_x: f32x8::new(bounds.map(|b| b.maxi.x)),
            max_y: f32x8::new(bounds.map(|b| b.maxi.y)),
            max_z: f32x8::new(bounds.map(|b| b.maxi.z)),
        }
    }

    /// Slab tests the eight boxes against `ray`, returning a bitmask of lanes that hit.
    pub fn hit(&self, ray: &RayPack8) -> u32 {
        let t0x = (self.min_x - ray.pos_x) * ray.inv_dir_x;
        let t1x = (self.max_x - ray.pos_x) * ray.inv_dir_x;
        let t0y = (self.min_y - ray.pos_y) * ray.inv_dir_y;
        let t1y = (self.max_y - ray.pos_y) * ray.inv_dir_y;
        let t0z = (self.min_z - ray.pos_z) * ray.inv_dir_z;
        let t1z = (self.max_z - ray.pos_z) * ray.inv_dir_z;

        let tmin = t0x
            .min(t1x)
            .max(t0y.min(t1y))
            .max(t0z.min(t1z))
            .max(f32x8::splat(-F_HIT_MAX));
        let tmax = t0x
            .max(t1x)
            .min(t0y.max(t1y))
            .min(t0z.max(t1z))
            .min(f32x8::splat(F_HIT_MAX));

        lane_mask(&tmin.cmp_le(tmax).to_array())
    }
}

/// Scalar reference for the packed slab test.
///
/// Mirrors the lane select semantics of the SIMD min/max ops so equivalence
/// holds bit for bit even when a division produces a NaN.
pub fn hit_slab_reference(bounds: Bounds3, ray: Ray) -> bool {
    fn lane_min(a: f32, b: f32) -> f32 {
        if a < b {
            a
        } else {
            b
        }
    }
    fn lane_max(a: f32, b: f32) -> f32 {
        if a > b {
            a
        } else {
            b
        }
    }

    let inv_dir_x = 1.0 / ray.dir.x;
    let inv_dir_y = 1.0 / ray.dir.y;
    let inv_dir_z = 1.0 / ray.dir.z;

    let t0x = (bounds.mini.x - ray.pos.x) * inv_dir_x;
    let t1x = (bounds.maxi.x - ray.pos.x) * inv_dir_x;
    let t0y = (bounds.mini.y - ray.pos.y) * inv_dir_y;
    let t1y = (bounds.maxi.y - ray.pos.y) * inv_dir_y;
    let t0z = (bounds.mini.z - ray.pos.z) * inv_dir_z;
    let t1z = (bounds.maxi.z - ray.pos.z) * inv_dir_z;

    // Fold order matches the packed implementations exactly
    let tmin = lane_max(
        lane_max(
            lane_max(lane_min(t0x, t1x), lane_min(t0y, t1y)),
            lane_min(t0z, t1z),
        ),
        -F_HIT_MAX,
    );
    let tmax = lane_min(
        lane_min(
            lane_min(lane_max(t0x, t1x), lane_max(t0y, t1y)),
            lane_max(t0z, t1z),
        ),
        F_HIT_MAX,
    );

    tmin <= tmax
}
