use super::vector::Vector3;

/// A right-handed orthonormal basis.
#[derive(Copy, Clone, Debug)]
pub struct Onb {
    pub u: Vector3,
    pub v: Vector3,
    pub w: Vector3,
}

/// Picks the canonical axis least aligned with `value`.
///
/// Keeps the cross products below well conditioned for any input, also in the
/// near-parallel band where a fixed fallback axis starts to collapse.
fn auxiliary_axis(value: Vector3) -> Vector3 {
    let a = value.abs();
    if a.x <= a.y && a.x <= a.z {
        Vector3::new(1.0, 0.0, 0.0)
    } else if a.y <= a.z {
        Vector3::new(0.0, 1.0, 0.0)
    } else {
        Vector3::new(0.0, 0.0, 1.0)
    }
}

impl Onb {
    /// Builds the basis around `value` as the u axis.
    pub fn from_u(value: Vector3) -> Self {
        let u = value.normalized();
        let v = u.cross(auxiliary_axis(u)).normalized();
        let w = u.cross(v);
        Self { u, v, w }
    }

    /// Builds the basis around `value` as the v axis.
    pub fn from_v(value: Vector3) -> Self {
        let v = value.normalized();
        let u = v.cross(auxiliary_axis(v)).normalized();
        let w = u.cross(v);
        Self { u, v, w }
    }

    /// Builds the basis around `value` as the w axis.
    pub fn from_w(value: Vector3) -> Self {
        let w = value.normalized();
        let u = w.cross(auxiliary_axis(w)).normalized();
        let v = w.cross(u);
        Self { u, v, w }
    }
}
