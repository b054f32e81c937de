use crate::math::{Ray, Vector3, XorShift128};

/// Aperture of a thin lens camera.
#[derive(Copy, Clone, Debug)]
pub struct LensParameters {
    pub radius: f32,
    pub focal_dist: f32,
}

/// Parameters of the camera. `fov` is vertical and in degrees.
#[derive(Copy, Clone, Debug)]
pub struct CameraParameters {
    pub position: Vector3,
    pub direction: Vector3,
    pub up: Vector3,
    pub fov: f32,
    pub near_clip: f32,
    /// Pinhole when absent.
    pub lens: Option<LensParameters>,
}

impl Default for CameraParameters {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            direction: Vector3::new(0.0, 0.0, -1.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            fov: 60.0,
            near_clip: 1.0,
            lens: None,
        }
    }
}

/// A camera emitting primary rays through an image plane at the near clip
/// distance. With a lens it focuses on the plane at the focal distance,
/// without one it is an ideal pinhole.
#[derive(Copy, Clone, Debug)]
pub struct Camera {
    position: Vector3,
    axis_x: Vector3,
    axis_y: Vector3,
    axis_z: Vector3,
    unit_x: Vector3,
    unit_y: Vector3,
    inv_w: f32,
    inv_h: f32,
    near_clip: f32,
    lens: Option<LensParameters>,
}

impl Camera {
    pub fn new(params: &CameraParameters, width: u32, height: u32) -> Self {
        let axis_z = params.direction.normalized();
        let unit_x = axis_z.cross(params.up).normalized();
        let unit_y = axis_z.cross(unit_x).normalized();

        let aspect = width as f32 / height as f32;
        let tan_fov = (params.fov.to_radians() * 0.5).tan();

        Self {
            position: params.position,
            axis_x: unit_x * tan_fov * aspect,
            axis_y: unit_y * tan_fov,
            axis_z,
            unit_x,
            unit_y,
            inv_w: 1.0 / width as f32,
            inv_h: 1.0 / height as f32,
            near_clip: params.near_clip,
            lens: params.lens,
        }
    }

    /// Emits the primary ray for pixel coordinates `(x, y)`.
    pub fn emit(&self, x: f32, y: f32, rng: &mut XorShift128) -> Ray {
        let fx = x * self.inv_w - 0.5;
        let fy = y * self.inv_h - 0.5;
        let dir = (self.axis_x * fx + self.axis_y * fy + self.axis_z).normalized();

        match self.lens {
            None => Ray::new(self.position + dir * self.near_clip, dir),
            Some(lens) => {
                // Where this pinhole ray pierces the focus plane
                let focus = self.position + dir * (lens.focal_dist / dir.dot(self.axis_z));

                // Uniform sample of the aperture disk
                let r = lens.radius * rng.next_f32().sqrt();
                let theta = std::f32::consts::TAU * rng.next_f32();
                let origin =
                    self.position + self.unit_x * (r * theta.cos()) + self.unit_y * (r * theta.sin());

                let dir = (focus - origin).normalized();
                Ray::new(origin + dir * self.near_clip, dir)
            }
        }
    }
}
