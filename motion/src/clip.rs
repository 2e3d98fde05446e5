use nalgebra::{UnitQuaternion, Vector3};

use crate::error::{MotionError, MotionResult};
use crate::skeleton::SkeletonLayout;

/// One sample of a clip.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub root_position: Vector3<f64>,
    pub root_rotation: UnitQuaternion<f64>,
    /// Indexed by the clip's layout; `None` marks a joint absent from this sample.
    pub joints: Vec<Option<f64>>,
}

impl Frame {
    pub fn new(root_position: Vector3<f64>, root_rotation: UnitQuaternion<f64>, joints: Vec<Option<f64>>) -> Self {
        Self {
            root_position,
            root_rotation,
            joints,
        }
    }

    /// Root-only sample.
    pub fn root(root_position: Vector3<f64>, root_rotation: UnitQuaternion<f64>) -> Self {
        Self::new(root_position, root_rotation, Vec::new())
    }
}

/// Immutable recorded motion.
#[derive(Debug, Clone)]
pub struct MotionClip {
    name: String,
    layout: &'static SkeletonLayout,
    fps: f64,
    frames: Vec<Frame>,
}

impl MotionClip {
    pub fn new(
        name: impl Into<String>,
        layout: &'static SkeletonLayout,
        fps: f64,
        frames: Vec<Frame>,
    ) -> MotionResult<Self> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(MotionError::invalid_clip(format!("frames per second must be positive, got {fps}")));
        }
        if let Some((i, frame)) = frames
            .iter()
            .enumerate()
            .find(|(_, f)| f.joints.len() > layout.joint_count())
        {
            return Err(MotionError::invalid_clip(format!(
                "frame {i} has {} joint slots but layout '{}' declares {}",
                frame.joints.len(),
                layout.id,
                layout.joint_count()
            )));
        }
        Ok(Self {
            name: name.into(),
            layout,
            fps,
            frames,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn skeleton_id(&self) -> &'static str {
        self.layout.id
    }

    pub fn layout(&self) -> &'static SkeletonLayout {
        self.layout
    }

    pub fn frames_per_second(&self) -> f64 {
        self.fps
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Seconds.
    pub fn duration(&self) -> f64 {
        self.frames.len() as f64 / self.fps
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn first_frame(&self) -> Option<&Frame> {
        self.frames.first()
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn joint_angle(&self, frame: usize, joint: &str) -> Option<f64> {
        let slot = self.layout.index_of(joint)?;
        self.frames.get(frame)?.joints.get(slot).copied().flatten()
    }
}
