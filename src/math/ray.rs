use super::vector::Vector3;

#[derive(Copy, Clone, Debug)]
pub struct Ray {
    pub pos: Vector3,
    pub dir: Vector3,
}

impl Ray {
    /// Creates a new `Ray`. `dir` is expected to be normalized.
    pub fn new(pos: Vector3, dir: Vector3) -> Self {
        Self { pos, dir }
    }

    /// Finds the point on this `Ray` at distance `t`.
    pub fn point(&self, t: f32) -> Vector3 {
        self.pos + self.dir * t
    }
}
