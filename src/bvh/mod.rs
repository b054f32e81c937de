mod wide;

pub use wide::{Bvh4, Bvh8};

use strum::{Display, EnumString, EnumVariantNames};

use crate::{
    math::{Bounds3, Ray, Vector3},
    shapes::{HitRecord, ShadowRecord, Shape, Triangle},
};

// The split machinery is based on Physically Based Rendering 3rd ed.
// http://www.pbr-book.org/3ed-2018/Primitives_and_Intersection_Acceleration/Bounding_Volume_Hierarchies.html

#[derive(Copy, Clone, Debug, Display, EnumString, EnumVariantNames)]
pub enum SplitMethod {
    SurfaceAreaHeuristic,
    Middle,
}

#[derive(Copy, Clone, Debug, Display, EnumString, EnumVariantNames)]
pub enum BvhWidth {
    Scalar,
    Wide4,
    Wide8,
}

#[derive(Copy, Clone, Debug)]
pub struct BvhSettings {
    pub split_method: SplitMethod,
    pub width: BvhWidth,
}

impl Default for BvhSettings {
    fn default() -> Self {
        Self {
            split_method: SplitMethod::SurfaceAreaHeuristic,
            width: BvhWidth::Wide8,
        }
    }
}

/// The acceleration structure of one mesh, built at the width the scene asked
/// for. The variants answer identical queries at different SIMD widths.
pub enum TriangleBvh {
    Scalar(BoundingVolumeHierarchy),
    Wide4(Bvh4),
    Wide8(Bvh8),
}

impl TriangleBvh {
    pub fn new(triangles: Vec<Triangle>, settings: BvhSettings) -> Self {
        match settings.width {
            BvhWidth::Scalar => Self::Scalar(BoundingVolumeHierarchy::new(
                triangles,
                settings.split_method,
            )),
            BvhWidth::Wide4 => Self::Wide4(Bvh4::new(triangles, settings.split_method)),
            BvhWidth::Wide8 => Self::Wide8(Bvh8::new(triangles, settings.split_method)),
        }
    }

    pub fn hit<'a>(&'a self, ray: &Ray, record: &mut HitRecord<'a>) -> bool {
        match self {
            Self::Scalar(bvh) => bvh.hit(ray, record),
            Self::Wide4(bvh) => bvh.hit(ray, record),
            Self::Wide8(bvh) => bvh.hit(ray, record),
        }
    }

    pub fn shadow_hit<'a>(&'a self, ray: &Ray, record: &mut ShadowRecord<'a>) -> bool {
        match self {
            Self::Scalar(bvh) => bvh.shadow_hit(ray, record),
            Self::Wide4(bvh) => bvh.shadow_hit(ray, record),
            Self::Wide8(bvh) => bvh.shadow_hit(ray, record),
        }
    }

    pub fn triangles(&self) -> &[Triangle] {
        match self {
            Self::Scalar(bvh) => &bvh.triangles,
            Self::Wide4(bvh) => bvh.triangles(),
            Self::Wide8(bvh) => bvh.triangles(),
        }
    }
}

const SCALAR_LEAF_LIMIT: usize = 4;

#[derive(Copy, Clone)]
enum NodeContent {
    /// First child is the next node, second indexes into the node array.
    Interior { second_child_index: u32 },
    /// Indexes into the ordered triangle array.
    Leaf { first: u32, count: u32 },
}

#[derive(Copy, Clone)]
struct BvhNode {
    bounds: Bounds3,
    content: NodeContent,
}

/// A binary BVH over the triangles of one mesh.
///
/// Owns a permutation of the triangle array; a leaf's triangles are
/// contiguous in it.
pub struct BoundingVolumeHierarchy {
    nodes: Vec<BvhNode>,
    triangles: Vec<Triangle>,
}

impl BoundingVolumeHierarchy {
    pub fn new(mut triangles: Vec<Triangle>, split_method: SplitMethod) -> Self {
        let mut nodes = Vec::new();
        if !triangles.is_empty() {
            let end = triangles.len();
            build_node(&mut nodes, &mut triangles, 0, end, split_method);
        }
        Self { nodes, triangles }
    }

    pub fn bounds(&self) -> Bounds3 {
        self.nodes
            .first()
            .map_or_else(Bounds3::default, |n| n.bounds)
    }

    pub fn hit<'a>(&'a self, ray: &Ray, record: &mut HitRecord<'a>) -> bool {
        if self.nodes.is_empty() {
            return false;
        }

        // Pre-calculated to speed up the slab tests
        let inv_dir = Vector3::new(1.0 / ray.dir.x, 1.0 / ray.dir.y, 1.0 / ray.dir.z);

        let mut any_hit = false;
        let mut current_node_index = 0;
        let mut to_visit_index = 0;
        let mut to_visit_stack = [0usize; 64];
        loop {
            let node = &self.nodes[current_node_index];
            if node.bounds.intersect(*ray, inv_dir) {
                match node.content {
                    NodeContent::Interior { second_child_index } => {
                        debug_assert!(to_visit_index < to_visit_stack.len());
                        to_visit_stack[to_visit_index] = second_child_index as usize;
                        to_visit_index += 1;
                        current_node_index += 1;
                        continue;
                    }
                    NodeContent::Leaf { first, count } => {
                        let range = (first as usize)..((first + count) as usize);
                        for triangle in &self.triangles[range] {
                            any_hit |= triangle.hit(ray, record);
                        }
                    }
                }
            }

            if to_visit_index == 0 {
                break;
            }
            to_visit_index -= 1;
            current_node_index = to_visit_stack[to_visit_index];
        }

        any_hit
    }

    pub fn shadow_hit<'a>(&'a self, ray: &Ray, record: &mut ShadowRecord<'a>) -> bool {
        if self.nodes.is_empty() {
            return false;
        }

        let inv_dir = Vector3::new(1.0 / ray.dir.x, 1.0 / ray.dir.y, 1.0 / ray.dir.z);

        let mut any_hit = false;
        let mut current_node_index = 0;
        let mut to_visit_index = 0;
        let mut to_visit_stack = [0usize; 64];
        loop {
            let node = &self.nodes[current_node_index];
            if node.bounds.intersect(*ray, inv_dir) {
                match node.content {
                    NodeContent::Interior { second_child_index } => {
                        debug_assert!(to_visit_index < to_visit_stack.len());
                        to_visit_stack[to_visit_index] = second_child_index as usize;
                        to_visit_index += 1;
                        current_node_index += 1;
                        continue;
                    }
                    NodeContent::Leaf { first, count } => {
                        let range = (first as usize)..((first + count) as usize);
                        for triangle in &self.triangles[range] {
                            any_hit |= triangle.shadow_hit(ray, record);
                        }
                    }
                }
            }

            if to_visit_index == 0 {
                break;
            }
            to_visit_index -= 1;
            current_node_index = to_visit_stack[to_visit_index];
        }

        any_hit
    }
}

/// Emits the node for `triangles[start..end]` in depth-first order and
/// returns its index.
fn build_node(
    nodes: &mut Vec<BvhNode>,
    triangles: &mut [Triangle],
    start: usize,
    end: usize,
    split_method: SplitMethod,
) -> usize {
    let bounds = triangle_bounds(&triangles[start..end]);
    let index = nodes.len();

    let split = if end - start > SCALAR_LEAF_LIMIT {
        split_triangles(&mut triangles[start..end], split_method)
    } else {
        None
    };

    match split {
        Some(mid) => {
            // Reserve the slot, the second child index is known only after
            // the first subtree is emitted
            nodes.push(BvhNode {
                bounds,
                content: NodeContent::Leaf { first: 0, count: 0 },
            });
            build_node(nodes, triangles, start, start + mid, split_method);
            let second_child_index = build_node(nodes, triangles, start + mid, end, split_method);
            nodes[index].content = NodeContent::Interior {
                second_child_index: second_child_index as u32,
            };
        }
        None => {
            nodes.push(BvhNode {
                bounds,
                content: NodeContent::Leaf {
                    first: start as u32,
                    count: (end - start) as u32,
                },
            });
        }
    }

    index
}

pub(crate) fn triangle_bounds(triangles: &[Triangle]) -> Bounds3 {
    triangles
        .iter()
        .fold(Bounds3::default(), |b, t| b.union_b(t.bounds()))
}

/// Partitions `triangles` for an interior node and returns the split point.
///
/// Returns [None] when the node should become a leaf instead: all centroids
/// coincide along every axis, or the SAH deems splitting more expensive than
/// iterating the triangles.
pub(crate) fn split_triangles(
    triangles: &mut [Triangle],
    split_method: SplitMethod,
) -> Option<usize> {
    if triangles.len() < 2 {
        return None;
    }

    let centroid_bounds = triangles
        .iter()
        .fold(Bounds3::default(), |b, t| b.union_p(t.centroid()));
    let axis = centroid_bounds.maximum_extent();

    #[allow(clippy::float_cmp)] // We really do want the exact case
    if centroid_bounds.maxi[axis] == centroid_bounds.mini[axis] {
        // No splitting method can help when the extent is zero
        return None;
    }

    match split_method {
        SplitMethod::SurfaceAreaHeuristic => split_sah(triangles, &centroid_bounds, axis),
        SplitMethod::Middle => {
            let mid = split_middle(triangles, &centroid_bounds, axis);
            if mid != 0 && mid != triangles.len() {
                Some(mid)
            } else {
                Some(split_equal_counts(triangles, axis))
            }
        }
    }
}

fn split_equal_counts(triangles: &mut [Triangle], axis: usize) -> usize {
    let mid = triangles.len() / 2;
    triangles.select_nth_unstable_by(mid, |a, b| {
        a.centroid()[axis]
            .partial_cmp(&b.centroid()[axis])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    mid
}

fn split_middle(triangles: &mut [Triangle], centroid_bounds: &Bounds3, axis: usize) -> usize {
    let mid_value = (centroid_bounds.mini[axis] + centroid_bounds.maxi[axis]) / 2.0;
    itertools::partition(triangles.iter_mut(), |t| t.centroid()[axis] < mid_value)
}

fn split_sah(
    triangles: &mut [Triangle],
    centroid_bounds: &Bounds3,
    axis: usize,
) -> Option<usize> {
    const N_BUCKETS: usize = 12;

    #[derive(Clone, Copy)]
    struct BucketInfo {
        count: usize,
        bounds: Bounds3,
    }

    let bounds = triangle_bounds(triangles);

    let bucket_index = |t: &Triangle| {
        let bf = N_BUCKETS as f32 * centroid_bounds.offset(t.centroid())[axis];
        #[allow(clippy::cast_sign_loss)] // Explicit max is used
        let b = (bf.max(0.0) as usize).min(N_BUCKETS - 1);
        b
    };

    // Sort triangles into the buckets
    let mut buckets = [BucketInfo {
        count: 0,
        bounds: Bounds3::default(),
    }; N_BUCKETS];
    for t in triangles.iter() {
        let b = bucket_index(t);
        buckets[b].count += 1;
        buckets[b].bounds = buckets[b].bounds.union_b(t.bounds());
    }

    // Evaluate the split cost after each bucket
    let mut costs = [0.0f32; N_BUCKETS - 1];
    for (i, cost) in costs.iter_mut().enumerate() {
        let (b0, count0) = buckets[0..=i]
            .iter()
            .fold((Bounds3::default(), 0), |(b, c), bucket| {
                (b.union_b(bucket.bounds), c + bucket.count)
            });
        let (b1, count1) = buckets[(i + 1)..]
            .iter()
            .fold((Bounds3::default(), 0), |(b, c), bucket| {
                (b.union_b(bucket.bounds), c + bucket.count)
            });
        *cost = 1.0
            + ((count0 as f32) * b0.surface_area() + (count1 as f32) * b1.surface_area())
                / bounds.surface_area().max(1e-10);
    }

    // Pick best
    let (min_cost_split_bucket, &min_cost) = costs
        .iter()
        .enumerate()
        .min_by(|(_, c0), (_, c1)| c0.partial_cmp(c1).unwrap_or(std::cmp::Ordering::Equal))?;

    let leaf_cost = triangles.len() as f32;
    if min_cost < leaf_cost {
        let mid = itertools::partition(triangles.iter_mut(), |t| {
            bucket_index(t) <= min_cost_split_bucket
        });
        if mid != 0 && mid != triangles.len() {
            Some(mid)
        } else {
            Some(split_equal_counts(triangles, axis))
        }
    } else {
        None
    }
}
