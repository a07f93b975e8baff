//! Common types used across o3dexport
//!
//! Small math types shared by the scene model, the scene-graph document and
//! the re-import consumer. Angles are radians unless a name says otherwise.

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing rotations and scales
pub const EPSILON: f32 = 1e-5;

/// 3D vector (location, scale, euler angles)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };
    pub const ONE: Self = Self { x: 1.0, y: 1.0, z: 1.0 };
    pub const UNIT_Z: Self = Self { x: 0.0, y: 0.0, z: 1.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self {
                x: self.x / len,
                y: self.y / len,
                z: self.z / len,
            }
        } else {
            Self::ZERO
        }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Component-wise comparison with an absolute tolerance
    pub fn is_close(&self, other: &Self, tolerance: f32) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.z - other.z).abs() <= tolerance
    }

    /// True when all three components match `x` within `tolerance`
    pub fn is_uniform(&self, tolerance: f32) -> bool {
        self.is_close(&Vec3::new(self.x, self.x, self.x), tolerance)
    }

    pub fn to_degrees(self) -> Self {
        Self::new(self.x.to_degrees(), self.y.to_degrees(), self.z.to_degrees())
    }

    pub fn to_radians(self) -> Self {
        Self::new(self.x.to_radians(), self.y.to_radians(), self.z.to_radians())
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<Vec3> for [f32; 3] {
    fn from(v: Vec3) -> Self {
        v.to_array()
    }
}

/// Rotation quaternion, stored as `w, x, y, z` like the authoring tool does
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Quat {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quat {
    pub const IDENTITY: Self = Self { w: 1.0, x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// Rotation of `angle` radians around `axis`. A zero axis yields identity.
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let axis = axis.normalize();
        if axis == Vec3::ZERO {
            return Self::IDENTITY;
        }
        let (s, c) = (angle * 0.5).sin_cos();
        Self::new(c, axis.x * s, axis.y * s, axis.z * s)
    }

    pub fn from_rotation_x(angle: f32) -> Self {
        Self::from_axis_angle(Vec3::new(1.0, 0.0, 0.0), angle)
    }

    pub fn from_rotation_y(angle: f32) -> Self {
        Self::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), angle)
    }

    pub fn from_rotation_z(angle: f32) -> Self {
        Self::from_axis_angle(Vec3::UNIT_Z, angle)
    }

    /// Builds the rotation `Rz * Ry * Rx` from XYZ eulers in radians.
    pub fn from_euler_xyz(euler: Vec3) -> Self {
        Self::from_rotation_z(euler.z)
            .mul(&Self::from_rotation_y(euler.y))
            .mul(&Self::from_rotation_x(euler.x))
    }

    /// Hamilton product `self * rhs`
    pub fn mul(&self, rhs: &Self) -> Self {
        Self {
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        }
    }

    pub fn normalize(&self) -> Self {
        let len = (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        if len > 0.0 {
            Self::new(self.w / len, self.x / len, self.y / len, self.z / len)
        } else {
            Self::IDENTITY
        }
    }

    /// Converts to XYZ eulers (radians), i.e. the angles `(x, y, z)` such that
    /// the rotation equals `Rz(z) * Ry(y) * Rx(x)`.
    pub fn to_euler_xyz(&self) -> Vec3 {
        let q = self.normalize();
        let (w, x, y, z) = (q.w as f64, q.x as f64, q.y as f64, q.z as f64);

        let m00 = 1.0 - 2.0 * (y * y + z * z);
        let m10 = 2.0 * (x * y + w * z);
        let m20 = 2.0 * (x * z - w * y);
        let m21 = 2.0 * (y * z + w * x);
        let m22 = 1.0 - 2.0 * (x * x + y * y);

        let cos_y = (m00 * m00 + m10 * m10).sqrt();
        if cos_y > 1e-6 {
            Vec3::new(
                m21.atan2(m22) as f32,
                (-m20).atan2(cos_y) as f32,
                m10.atan2(m00) as f32,
            )
        } else {
            // Gimbal lock: fold the whole yaw into X.
            let m11 = 1.0 - 2.0 * (x * x + z * z);
            let m12 = 2.0 * (y * z - w * x);
            Vec3::new((-m12).atan2(m11) as f32, (-m20).atan2(cos_y) as f32, 0.0)
        }
    }

    /// Same rotation test that tolerates the `q == -q` double cover
    pub fn is_close(&self, other: &Self, tolerance: f32) -> bool {
        let dot = self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z;
        (1.0 - dot.abs()) <= tolerance
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<[f32; 4]> for Quat {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Quat> for [f32; 4] {
    fn from(q: Quat) -> Self {
        [q.w, q.x, q.y, q.z]
    }
}

/// One of the six signed axis codes accepted by the mesh exporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    #[serde(rename = "X")]
    X,
    #[serde(rename = "Y")]
    Y,
    #[serde(rename = "Z")]
    Z,
    #[serde(rename = "-X")]
    NegX,
    #[serde(rename = "-Y")]
    NegY,
    #[serde(rename = "-Z")]
    NegZ,
}

impl Axis {
    /// Axis code as passed to the mesh exporter
    pub fn code(&self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
            Axis::NegX => "-X",
            Axis::NegY => "-Y",
            Axis::NegZ => "-Z",
        }
    }

    /// The axis without its sign
    pub fn unsigned(&self) -> Axis {
        match self {
            Axis::X | Axis::NegX => Axis::X,
            Axis::Y | Axis::NegY => Axis::Y,
            Axis::Z | Axis::NegZ => Axis::Z,
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "X" => Ok(Axis::X),
            "Y" => Ok(Axis::Y),
            "Z" => Ok(Axis::Z),
            "-X" => Ok(Axis::NegX),
            "-Y" => Ok(Axis::NegY),
            "-Z" => Ok(Axis::NegZ),
            _ => Err(format!("Unknown axis: {}", s)),
        }
    }
}
