use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;

use crate::calibrate::{Calibration, CalibrationSource, Calibrator};
use crate::clip::MotionClip;
use crate::config::UpAxis;

/// Lookup of preloaded clips by id.
pub trait ClipSource {
    fn clip(&self, motion_id: &str) -> Option<Arc<MotionClip>>;
}

impl<T: ClipSource + ?Sized> ClipSource for Arc<T> {
    fn clip(&self, motion_id: &str) -> Option<Arc<MotionClip>> {
        (**self).clip(motion_id)
    }
}

impl ClipSource for HashMap<String, Arc<MotionClip>> {
    fn clip(&self, motion_id: &str) -> Option<Arc<MotionClip>> {
        self.get(motion_id).cloned()
    }
}

/// Preloaded clips plus the calibration of each one used as a primitive.
#[derive(Debug, Clone, Default)]
pub struct MotionLibrary {
    calibrator: Calibrator,
    clips: HashMap<String, Arc<MotionClip>>,
    calibrations: HashMap<String, Calibration>,
}

impl MotionLibrary {
    pub fn new(up_axis: UpAxis) -> Self {
        Self {
            calibrator: Calibrator::new(up_axis),
            ..Self::default()
        }
    }

    /// Stores `clip` under `id`, replacing and recalibrating any previous clip.
    pub fn insert(&mut self, id: impl Into<String>, clip: MotionClip) -> Option<Calibration> {
        let id = id.into();
        let calibration = match self.calibrator.calibrate(&clip) {
            Ok(calibration) => {
                info!(
                    "calibrated '{id}': distance {:.3}, yaw {:.3} rad, {:.2}s",
                    calibration.forward_distance, calibration.yaw_change, calibration.duration
                );
                self.calibrations.insert(id.clone(), calibration);
                Some(calibration)
            }
            Err(e) => {
                warn!("'{id}' stored without calibration: {e}");
                self.calibrations.remove(&id);
                None
            }
        };
        self.clips.insert(id, Arc::new(clip));
        calibration
    }

    pub fn remove(&mut self, id: &str) -> Option<Arc<MotionClip>> {
        self.calibrations.remove(id);
        self.clips.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&Arc<MotionClip>> {
        self.clips.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.clips.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.clips.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn up_axis(&self) -> UpAxis {
        self.calibrator.up_axis()
    }
}

impl ClipSource for MotionLibrary {
    fn clip(&self, motion_id: &str) -> Option<Arc<MotionClip>> {
        self.clips.get(motion_id).cloned()
    }
}

impl CalibrationSource for MotionLibrary {
    fn calibration(&self, motion_id: &str) -> Option<Calibration> {
        self.calibrations.get(motion_id).copied()
    }
}
