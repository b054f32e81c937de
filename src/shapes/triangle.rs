use std::sync::Arc;

use super::{HitRecord, ShadowRecord, Shape, SurfaceSample};
use crate::{
    materials::Material,
    math::{Bounds3, Ray, Vector2, Vector3, XorShift128, F_HIT_MAX, F_HIT_MIN},
};

/// A mesh vertex with shading attributes.
#[derive(Copy, Clone, Debug, Default)]
pub struct Vertex {
    pub pos: Vector3,
    pub nrm: Vector3,
    pub uv: Vector2,
}

/// The vertex pool triangles of one mesh index into.
pub struct MeshData {
    pub vertices: Vec<Vertex>,
}

/// One mesh triangle with its intersection state precomputed.
pub struct Triangle {
    data: Arc<MeshData>,
    indices: [u32; 3],
    material: Arc<dyn Material>,
    // Cached off the vertex positions at build time
    edge1: Vector3,
    edge2: Vector3,
    centroid: Vector3,
    bounds: Bounds3,
}

impl Triangle {
    pub fn new(data: Arc<MeshData>, indices: [u32; 3], material: Arc<dyn Material>) -> Self {
        let p0 = data.vertices[indices[0] as usize].pos;
        let p1 = data.vertices[indices[1] as usize].pos;
        let p2 = data.vertices[indices[2] as usize].pos;

        Self {
            edge1: p1 - p0,
            edge2: p2 - p0,
            centroid: (p0 + p1 + p2) / 3.0,
            bounds: Bounds3::new(p0, p1).union_p(p2),
            data,
            indices,
            material,
        }
    }

    fn vertex(&self, i: usize) -> &Vertex {
        &self.data.vertices[self.indices[i] as usize]
    }

    pub fn bounds(&self) -> Bounds3 {
        self.bounds
    }

    pub fn centroid(&self) -> Vector3 {
        self.centroid
    }

    pub fn area(&self) -> f32 {
        0.5 * self.edge1.cross(self.edge2).len()
    }

    /// Möller-Trumbore over the cached edges. Returns the distance and the
    /// barycentric weights of vertices 1 and 2.
    fn intersect(&self, ray: &Ray) -> Option<(f32, f32, f32)> {
        let pvec = ray.dir.cross(self.edge2);
        let det = self.edge1.dot(pvec);
        if det.abs() <= f32::EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;

        let tvec = ray.pos - self.vertex(0).pos;
        let u = tvec.dot(pvec) * inv_det;
        if u <= 0.0 || u >= 1.0 {
            return None;
        }

        let qvec = tvec.cross(self.edge1);
        let v = ray.dir.dot(qvec) * inv_det;
        if v <= 0.0 || u + v >= 1.0 {
            return None;
        }

        let dist = self.edge2.dot(qvec) * inv_det;
        if dist < F_HIT_MIN || dist >= F_HIT_MAX {
            return None;
        }

        Some((dist, u, v))
    }
}

impl Shape for Triangle {
    fn hit<'a>(&'a self, ray: &Ray, record: &mut HitRecord<'a>) -> bool {
        let Some((dist, u, v)) = self.intersect(ray) else {
            return false;
        };
        if dist >= record.dist {
            return false;
        }

        let w = 1.0 - u - v;
        let v0 = self.vertex(0);
        let v1 = self.vertex(1);
        let v2 = self.vertex(2);

        record.dist = dist;
        record.pos = ray.point(dist);
        record.nrm = (v0.nrm * w + v1.nrm * u + v2.nrm * v).normalized();
        record.uv = Vector2::new(
            v0.uv.x * w + v1.uv.x * u + v2.uv.x * v,
            v0.uv.y * w + v1.uv.y * u + v2.uv.y * v,
        );
        record.shape = Some(self);
        record.material = Some(self.material.as_ref());

        true
    }

    fn shadow_hit<'a>(&'a self, ray: &Ray, record: &mut ShadowRecord<'a>) -> bool {
        let Some((dist, _, _)) = self.intersect(ray) else {
            return false;
        };
        if dist >= record.dist {
            return false;
        }

        record.dist = dist;
        record.pdf = 1.0 / self.area();
        record.shape = Some(self);
        record.material = Some(self.material.as_ref());

        true
    }

    fn sample(&self, rng: &mut XorShift128) -> SurfaceSample {
        let su = rng.next_f32().sqrt();
        let b1 = su * (1.0 - rng.next_f32());
        let b2 = su - b1;

        let p0 = self.vertex(0).pos;
        SurfaceSample {
            pos: p0 + self.edge1 * b1 + self.edge2 * b2,
            // Area sampling reports the geometric normal
            nrm: self.edge1.cross(self.edge2).normalized(),
            pdf: 1.0 / self.area(),
        }
    }
}
