use super::vector::Vector3;

/// A row-major 4x4 matrix over row vectors, `v * M` convention.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Matrix4x4 {
    pub m: [[f32; 4]; 4],
}

impl Default for Matrix4x4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix4x4 {
    pub fn new(m: [[f32; 4]; 4]) -> Self {
        Self { m }
    }

    pub fn identity() -> Self {
        Self {
            m: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    pub fn translation(value: Vector3) -> Self {
        Self {
            m: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [value.x, value.y, value.z, 1.0],
            ],
        }
    }

    pub fn scaling(value: Vector3) -> Self {
        Self {
            m: [
                [value.x, 0.0, 0.0, 0.0],
                [0.0, value.y, 0.0, 0.0],
                [0.0, 0.0, value.z, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Rotation around the y axis by `angle` radians.
    pub fn rotation_y(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            m: [
                [cos, 0.0, -sin, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [sin, 0.0, cos, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    pub fn mul(&self, other: &Self) -> Self {
        let mut m = [[0.0f32; 4]; 4];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = self.m[i][0] * other.m[0][j]
                    + self.m[i][1] * other.m[1][j]
                    + self.m[i][2] * other.m[2][j]
                    + self.m[i][3] * other.m[3][j];
            }
        }
        Self { m }
    }

    pub fn transposed(&self) -> Self {
        let mut m = [[0.0f32; 4]; 4];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = self.m[j][i];
            }
        }
        Self { m }
    }

    /// Inverts this matrix with Gauss-Jordan elimination and full pivoting.
    ///
    /// Returns [None] for a singular matrix.
    pub fn inverted(&self) -> Option<Self> {
        // Adapted from the numerically stable routine in
        // Physically Based Rendering 3rd ed.
        let mut indxc = [0usize; 4];
        let mut indxr = [0usize; 4];
        let mut ipiv = [0usize; 4];
        let mut minv = self.m;

        for i in 0..4 {
            let mut irow = 0;
            let mut icol = 0;
            let mut big = 0.0f32;
            // Choose pivot
            for j in 0..4 {
                if ipiv[j] != 1 {
                    for (k, ipiv_k) in ipiv.iter().enumerate() {
                        if *ipiv_k == 0 && minv[j][k].abs() >= big {
                            big = minv[j][k].abs();
                            irow = j;
                            icol = k;
                        }
                    }
                }
            }
            ipiv[icol] += 1;
            // Swap rows for pivot
            if irow != icol {
                for k in 0..4 {
                    let tmp = minv[irow][k];
                    minv[irow][k] = minv[icol][k];
                    minv[icol][k] = tmp;
                }
            }
            indxr[i] = irow;
            indxc[i] = icol;
            if minv[icol][icol] == 0.0 {
                return None;
            }

            let pivinv = 1.0 / minv[icol][icol];
            minv[icol][icol] = 1.0;
            for k in 0..4 {
                minv[icol][k] *= pivinv;
            }

            // Subtract this row from the others to zero out their columns
            for j in 0..4 {
                if j != icol {
                    let save = minv[j][icol];
                    minv[j][icol] = 0.0;
                    for k in 0..4 {
                        minv[j][k] -= minv[icol][k] * save;
                    }
                }
            }
        }

        // Swap columns back in reverse pivot order
        for j in (0..4).rev() {
            if indxr[j] != indxc[j] {
                for row in &mut minv {
                    row.swap(indxr[j], indxc[j]);
                }
            }
        }

        Some(Self { m: minv })
    }

    /// Transforms a position, including the projective divide when w differs from one.
    pub fn transform_coord(&self, p: Vector3) -> Vector3 {
        let m = &self.m;
        let x = p.x * m[0][0] + p.y * m[1][0] + p.z * m[2][0] + m[3][0];
        let y = p.x * m[0][1] + p.y * m[1][1] + p.z * m[2][1] + m[3][1];
        let z = p.x * m[0][2] + p.y * m[1][2] + p.z * m[2][2] + m[3][2];
        let w = p.x * m[0][3] + p.y * m[1][3] + p.z * m[2][3] + m[3][3];
        if w != 1.0 && w != 0.0 {
            Vector3::new(x / w, y / w, z / w)
        } else {
            Vector3::new(x, y, z)
        }
    }

    /// Transforms a direction with the upper 3x3 part.
    pub fn transform_dir(&self, v: Vector3) -> Vector3 {
        let m = &self.m;
        Vector3::new(
            v.x * m[0][0] + v.y * m[1][0] + v.z * m[2][0],
            v.x * m[0][1] + v.y * m[1][1] + v.z * m[2][1],
            v.x * m[0][2] + v.y * m[1][2] + v.z * m[2][2],
        )
    }

    /// Transforms a normal by the transpose of the upper 3x3 part.
    ///
    /// Callers pass the inverse of the point transform to keep normals
    /// perpendicular under non-uniform scaling.
    pub fn transform_normal(&self, n: Vector3) -> Vector3 {
        let m = &self.m;
        Vector3::new(
            n.x * m[0][0] + n.y * m[0][1] + n.z * m[0][2],
            n.x * m[1][0] + n.y * m[1][1] + n.z * m[1][2],
            n.x * m[2][0] + n.y * m[2][1] + n.z * m[2][2],
        )
    }
}
