//! 4- and 8-wide BVH variants.
//!
//! Behavioral duplicates of the binary [`BoundingVolumeHierarchy`]: the
//! binary split just repeats until the fan-out is filled and the child boxes
//! of a node are slab tested as one SIMD pack. The scalar ray is packed once
//! at traversal entry; leaves run the ordinary scalar triangle tests.

use super::{split_triangles, triangle_bounds, SplitMethod};
use crate::{
    math::{
        simd::{Bounds3x4, Bounds3x8, RayPack4, RayPack8},
        Bounds3, Ray,
    },
    shapes::{HitRecord, ShadowRecord, Shape, Triangle},
};

const WIDE4_LEAF_LIMIT: usize = 16;
const WIDE8_LEAF_LIMIT: usize = 64;

#[derive(Copy, Clone)]
enum Child {
    Node(u32),
    /// Indexes into the ordered triangle array.
    Leaf {
        first: u32,
        count: u32,
    },
    Empty,
}

/// Splits `triangles[start..end]` into up to `2^levels` contiguous ranges.
///
/// A range that is at or under the leaf limit, or that the split declines, is
/// final and gets flagged so the caller collapses that branch into a leaf.
fn fan_out(
    triangles: &mut [Triangle],
    start: usize,
    end: usize,
    levels: u32,
    leaf_limit: usize,
    split_method: SplitMethod,
    ranges: &mut Vec<(usize, usize, bool)>,
) {
    if levels == 0 {
        ranges.push((start, end, true));
        return;
    }
    if end - start <= leaf_limit {
        ranges.push((start, end, false));
        return;
    }

    match split_triangles(&mut triangles[start..end], split_method) {
        Some(mid) => {
            fan_out(
                triangles,
                start,
                start + mid,
                levels - 1,
                leaf_limit,
                split_method,
                ranges,
            );
            fan_out(
                triangles,
                start + mid,
                end,
                levels - 1,
                leaf_limit,
                split_method,
                ranges,
            );
        }
        None => ranges.push((start, end, false)),
    }
}

macro_rules! impl_wide_bvh {
    ($name:ident, $node:ident, $boxes:ty, $ray_pack:ty, $width:expr, $levels:expr, $leaf_limit:expr) => {
        struct $node {
            boxes: $boxes,
            children: [Child; $width],
        }

        pub struct $name {
            nodes: Vec<$node>,
            triangles: Vec<Triangle>,
        }

        impl $name {
            pub fn new(mut triangles: Vec<Triangle>, split_method: SplitMethod) -> Self {
                let mut nodes = Vec::new();
                if !triangles.is_empty() {
                    let end = triangles.len();
                    Self::build_node(&mut nodes, &mut triangles, 0, end, split_method);
                }
                Self { nodes, triangles }
            }

            pub fn triangles(&self) -> &[Triangle] {
                &self.triangles
            }

            fn build_node(
                nodes: &mut Vec<$node>,
                triangles: &mut [Triangle],
                start: usize,
                end: usize,
                split_method: SplitMethod,
            ) -> usize {
                let mut ranges = Vec::new();
                if end - start <= $leaf_limit {
                    ranges.push((start, end, false));
                } else {
                    fan_out(
                        triangles,
                        start,
                        end,
                        $levels,
                        $leaf_limit,
                        split_method,
                        &mut ranges,
                    );
                }

                let index = nodes.len();
                nodes.push($node {
                    boxes: <$boxes>::from_bounds([Bounds3::default(); $width]),
                    children: [Child::Empty; $width],
                });

                let mut bounds = [Bounds3::default(); $width];
                let mut children = [Child::Empty; $width];
                for (lane, &(s, e, splittable)) in ranges.iter().enumerate() {
                    bounds[lane] = triangle_bounds(&triangles[s..e]);
                    children[lane] = if splittable && e - s > $leaf_limit {
                        let child =
                            Self::build_node(nodes, triangles, s, e, split_method);
                        Child::Node(child as u32)
                    } else {
                        Child::Leaf {
                            first: s as u32,
                            count: (e - s) as u32,
                        }
                    };
                }

                nodes[index].boxes = <$boxes>::from_bounds(bounds);
                nodes[index].children = children;

                index
            }

            pub fn hit<'a>(&'a self, ray: &Ray, record: &mut HitRecord<'a>) -> bool {
                if self.nodes.is_empty() {
                    return false;
                }
                let pack = <$ray_pack>::splat(*ray);
                self.hit_node(0, ray, &pack, record)
            }

            fn hit_node<'a>(
                &'a self,
                index: usize,
                ray: &Ray,
                pack: &$ray_pack,
                record: &mut HitRecord<'a>,
            ) -> bool {
                let node = &self.nodes[index];
                let mask = node.boxes.hit(pack);
                if mask == 0 {
                    return false;
                }

                let mut any_hit = false;
                for (lane, child) in node.children.iter().enumerate() {
                    if mask & (1 << lane) == 0 {
                        continue;
                    }
                    match *child {
                        Child::Node(child_index) => {
                            any_hit |= self.hit_node(child_index as usize, ray, pack, record);
                        }
                        Child::Leaf { first, count } => {
                            let range = (first as usize)..((first + count) as usize);
                            for triangle in &self.triangles[range] {
                                any_hit |= triangle.hit(ray, record);
                            }
                        }
                        Child::Empty => (),
                    }
                }

                any_hit
            }

            pub fn shadow_hit<'a>(&'a self, ray: &Ray, record: &mut ShadowRecord<'a>) -> bool {
                if self.nodes.is_empty() {
                    return false;
                }
                let pack = <$ray_pack>::splat(*ray);
                self.shadow_hit_node(0, ray, &pack, record)
            }

            fn shadow_hit_node<'a>(
                &'a self,
                index: usize,
                ray: &Ray,
                pack: &$ray_pack,
                record: &mut ShadowRecord<'a>,
            ) -> bool {
                let node = &self.nodes[index];
                let mask = node.boxes.hit(pack);
                if mask == 0 {
                    return false;
                }

                let mut any_hit = false;
                for (lane, child) in node.children.iter().enumerate() {
                    if mask & (1 << lane) == 0 {
                        continue;
                    }
                    match *child {
                        Child::Node(child_index) => {
                            any_hit |=
                                self.shadow_hit_node(child_index as usize, ray, pack, record);
                        }
                        Child::Leaf { first, count } => {
                            let range = (first as usize)..((first + count) as usize);
                            for triangle in &self.triangles[range] {
                                any_hit |= triangle.shadow_hit(ray, record);
                            }
                        }
                        Child::Empty => (),
                    }
                }

                any_hit
            }
        }
    };
}

impl_wide_bvh!(Bvh4, Bvh4Node, Bounds3x4, RayPack4, 4, 2, WIDE4_LEAF_LIMIT);
impl_wide_bvh!(Bvh8, Bvh8Node, Bounds3x8, RayPack8, 8, 3, WIDE8_LEAF_LIMIT);
