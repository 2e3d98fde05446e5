use nalgebra::{Unit, UnitQuaternion, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// World axis treated as "up" by motion-capture data.
///
/// The two remaining axes span the walking plane. Yaw is rotation about the up axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpAxis {
    X,
    Y,
    #[default]
    Z,
}

impl UpAxis {
    /// Rotation taking this axis onto +Z.
    pub fn to_z_up(self) -> UnitQuaternion<f64> {
        match self {
            UpAxis::X => UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -FRAC_PI_2),
            UpAxis::Y => UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2),
            UpAxis::Z => UnitQuaternion::identity(),
        }
    }

    pub fn unit(self) -> Unit<Vector3<f64>> {
        match self {
            UpAxis::X => Vector3::x_axis(),
            UpAxis::Y => Vector3::y_axis(),
            UpAxis::Z => Vector3::z_axis(),
        }
    }

    /// Projects a world point onto the walking plane.
    pub fn planar(self, v: &Vector3<f64>) -> Vector2<f64> {
        match self {
            UpAxis::Z => Vector2::new(v.x, v.y),
            _ => {
                let z_up = self.to_z_up() * v;
                Vector2::new(z_up.x, z_up.y)
            }
        }
    }

    /// World vector lying on the walking plane at zero height; inverse of [`UpAxis::planar`].
    pub fn lift(self, p: &Vector2<f64>) -> Vector3<f64> {
        let flat = Vector3::new(p.x, p.y, 0.0);
        match self {
            UpAxis::Z => flat,
            _ => self.to_z_up().inverse() * flat,
        }
    }

    /// Heading of `rotation` about this axis, in radians.
    pub fn yaw(self, rotation: &UnitQuaternion<f64>) -> f64 {
        let q = match self {
            UpAxis::Z => *rotation,
            _ => {
                let basis = self.to_z_up();
                basis * rotation * basis.inverse()
            }
        };
        let (_roll, _pitch, yaw) = q.euler_angles();
        yaw
    }
}

fn default_fps() -> f64 {
    30.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    #[serde(default)]
    pub up_axis: UpAxis,
    /// Sample rate assumed for encodings that do not carry one.
    #[serde(default = "default_fps")]
    pub default_fps: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            up_axis: UpAxis::default(),
            default_fps: default_fps(),
        }
    }
}
