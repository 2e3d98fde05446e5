use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::clip::MotionClip;
use crate::config::UpAxis;
use crate::error::{MotionError, MotionResult};

/// Net effect of playing a clip once, used as a planning step size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Planar root displacement, first to last frame.
    pub forward_distance: f64,
    /// Signed heading change about the up axis, radians.
    pub yaw_change: f64,
    /// Seconds.
    pub duration: f64,
    pub frame_count: usize,
}

/// Anything that can answer "what does this primitive do".
pub trait CalibrationSource {
    fn calibration(&self, motion_id: &str) -> Option<Calibration>;
}

impl<T: CalibrationSource + ?Sized> CalibrationSource for Arc<T> {
    fn calibration(&self, motion_id: &str) -> Option<Calibration> {
        (**self).calibration(motion_id)
    }
}

impl CalibrationSource for HashMap<String, Calibration> {
    fn calibration(&self, motion_id: &str) -> Option<Calibration> {
        self.get(motion_id).copied()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Calibrator {
    up_axis: UpAxis,
}

impl Calibrator {
    pub fn new(up_axis: UpAxis) -> Self {
        Self { up_axis }
    }

    pub fn up_axis(&self) -> UpAxis {
        self.up_axis
    }

    /// Measures a clip from its first and last frames only.
    pub fn calibrate(&self, clip: &MotionClip) -> MotionResult<Calibration> {
        let (first, last) = match (clip.first_frame(), clip.last_frame()) {
            (Some(first), Some(last)) if clip.frame_count() >= 2 => (first, last),
            _ => {
                return Err(MotionError::InsufficientFrames {
                    min: 2,
                    actual: clip.frame_count(),
                });
            }
        };

        let displacement = last.root_position - first.root_position;
        let forward_distance = self.up_axis.planar(&displacement).norm();
        let relative = first.root_rotation.inverse() * last.root_rotation;
        let yaw_change = self.up_axis.yaw(&relative);

        Ok(Calibration {
            forward_distance,
            yaw_change,
            duration: clip.duration(),
            frame_count: clip.frame_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::Frame;
    use crate::skeleton::G1;
    use nalgebra::{UnitQuaternion, Vector3};

    fn clip(frames: Vec<Frame>) -> MotionClip {
        MotionClip::new("primitive", &G1, 50.0, frames).unwrap()
    }

    fn yawed(x: f64, y: f64, z: f64, yaw: f64) -> Frame {
        Frame::root(Vector3::new(x, y, z), UnitQuaternion::from_euler_angles(0.0, 0.0, yaw))
    }

    #[test]
    fn walk_distance_ignores_height() {
        let c = clip(vec![yawed(0.0, 0.0, 0.8, 0.0), yawed(0.3, 0.1, 0.9, 0.0), yawed(0.6, 0.8, 0.5, 0.0)]);
        let cal = Calibrator::default().calibrate(&c).unwrap();
        assert!((cal.forward_distance - 1.0).abs() < 1e-9);
        assert!(cal.yaw_change.abs() < 1e-9);
        assert_eq!(cal.frame_count, 3);
        assert!((cal.duration - 0.06).abs() < 1e-12);
    }

    #[test]
    fn yaw_is_relative_to_first_frame() {
        let c = clip(vec![yawed(0.0, 0.0, 0.0, 0.5), yawed(0.0, 0.0, 0.0, 1.3)]);
        let cal = Calibrator::default().calibrate(&c).unwrap();
        assert!((cal.yaw_change - 0.8).abs() < 1e-9);
        assert!(cal.forward_distance.abs() < 1e-12);
    }

    #[test]
    fn right_turn_is_negative() {
        let c = clip(vec![yawed(0.0, 0.0, 0.0, 0.0), yawed(0.0, 0.0, 0.0, -0.7)]);
        let cal = Calibrator::default().calibrate(&c).unwrap();
        assert!((cal.yaw_change + 0.7).abs() < 1e-9);
    }

    #[test]
    fn y_up_clips_use_xz_plane() {
        let first = Frame::root(Vector3::new(0.0, 1.0, 0.0), UnitQuaternion::identity());
        let last = Frame::root(
            Vector3::new(0.0, 1.2, 2.0),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.3),
        );
        let cal = Calibrator::new(UpAxis::Y).calibrate(&clip(vec![first, last])).unwrap();
        assert!((cal.forward_distance - 2.0).abs() < 1e-9);
        assert!((cal.yaw_change - 0.3).abs() < 1e-9);
    }

    #[test]
    fn single_frame_is_insufficient() {
        let err = Calibrator::default().calibrate(&clip(vec![yawed(0.0, 0.0, 0.0, 0.0)])).unwrap_err();
        assert_eq!(err, MotionError::InsufficientFrames { min: 2, actual: 1 });
    }
}
