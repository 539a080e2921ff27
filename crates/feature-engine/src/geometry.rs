//! Rotation helpers for head orientation

use serde::{Deserialize, Serialize};

const NORM_EPSILON: f64 = 1e-9;

/// 3-component vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(&self, other: &Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction, or `None` for zero/non-finite input
    pub fn normalized(&self) -> Option<Vec3> {
        let n = self.norm();
        if !n.is_finite() || n < NORM_EPSILON {
            return None;
        }
        Some(Vec3::new(self.x / n, self.y / n, self.z / n))
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Head axis triple (right, up, forward), each expressed in camera coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axes {
    pub x: Vec3,
    pub y: Vec3,
    pub z: Vec3,
}

impl Axes {
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Row-major 3x3 matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mat3 {
    pub m: [[f64; 3]; 3],
}

impl Mat3 {
    pub const IDENTITY: Mat3 = Mat3 {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// Matrix whose columns are the given axes
    pub fn from_axes(axes: &Axes) -> Self {
        let Axes { x, y, z } = axes;
        Self {
            m: [[x.x, y.x, z.x], [x.y, y.y, z.y], [x.z, y.z, z.z]],
        }
    }

    /// Columns as an axis triple
    pub fn to_axes(&self) -> Axes {
        let m = &self.m;
        Axes {
            x: Vec3::new(m[0][0], m[1][0], m[2][0]),
            y: Vec3::new(m[0][1], m[1][1], m[2][1]),
            z: Vec3::new(m[0][2], m[1][2], m[2][2]),
        }
    }

    /// Rotation from Euler angles in degrees, composed as Ry(yaw) * Rx(pitch) * Rz(roll)
    pub fn from_euler_deg(yaw: f64, pitch: f64, roll: f64) -> Self {
        let (sa, ca) = yaw.to_radians().sin_cos();
        let (sb, cb) = pitch.to_radians().sin_cos();
        let (sc, cc) = roll.to_radians().sin_cos();
        Self {
            m: [
                [ca * cc + sa * sb * sc, -ca * sc + sa * sb * cc, sa * cb],
                [cb * sc, cb * cc, -sb],
                [-sa * cc + ca * sb * sc, sa * sc + ca * sb * cc, ca * cb],
            ],
        }
    }

    /// Inverse of [`Mat3::from_euler_deg`]: (yaw, pitch, roll) in degrees
    pub fn to_euler_deg(&self) -> (f64, f64, f64) {
        let m = &self.m;
        let pitch = (-m[1][2]).clamp(-1.0, 1.0).asin();
        let yaw = m[0][2].atan2(m[2][2]);
        let roll = m[1][0].atan2(m[1][1]);
        (yaw.to_degrees(), pitch.to_degrees(), roll.to_degrees())
    }

    pub fn transpose(&self) -> Mat3 {
        let m = &self.m;
        Mat3 {
            m: [
                [m[0][0], m[1][0], m[2][0]],
                [m[0][1], m[1][1], m[2][1]],
                [m[0][2], m[1][2], m[2][2]],
            ],
        }
    }

    pub fn mul(&self, other: &Mat3) -> Mat3 {
        let mut out = [[0.0; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.m[i][k] * other.m[k][j]).sum();
            }
        }
        Mat3 { m: out }
    }

    pub fn mul_vec(&self, v: &Vec3) -> Vec3 {
        let m = &self.m;
        Vec3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_euler_round_trip() {
        let (yaw, pitch, roll) = Mat3::from_euler_deg(12.0, -7.5, 3.0).to_euler_deg();
        assert!((yaw - 12.0).abs() < 1e-9);
        assert!((pitch + 7.5).abs() < 1e-9);
        assert!((roll - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotation_is_orthonormal() {
        let r = Mat3::from_euler_deg(40.0, 20.0, -15.0);
        let product = r.transpose().mul(&r);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((product.m[i][j] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_cross_is_right_handed() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(&y), Vec3::new(0.0, 0.0, 1.0));
        assert!(Vec3::default().normalized().is_none());
    }

    proptest! {
        #[test]
        fn prop_euler_recovered_away_from_gimbal_lock(
            yaw in -170.0f64..170.0,
            pitch in -80.0f64..80.0,
            roll in -170.0f64..170.0,
        ) {
            let (y, p, r) = Mat3::from_euler_deg(yaw, pitch, roll).to_euler_deg();
            prop_assert!((y - yaw).abs() < 1e-6);
            prop_assert!((p - pitch).abs() < 1e-6);
            prop_assert!((r - roll).abs() < 1e-6);
        }
    }
}
