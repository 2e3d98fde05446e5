//! Static joint layouts for the supported humanoids.
//!
//! Each layout is an ordered list of joint names. A record for a layout with a root
//! carries 7 root values (position xyz, quaternion xyzw) followed by one angle per joint.
//! Adding a robot means adding a table here.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Number of scalars describing the root pose.
pub const ROOT_VALUES: usize = 7;

#[derive(Debug)]
pub struct SkeletonLayout {
    pub id: &'static str,
    pub has_root: bool,
    pub joints: &'static [&'static str],
    index: OnceLock<HashMap<&'static str, usize>>,
}

impl SkeletonLayout {
    pub const fn new(id: &'static str, has_root: bool, joints: &'static [&'static str]) -> Self {
        Self {
            id,
            has_root,
            joints,
            index: OnceLock::new(),
        }
    }

    /// Scalars per record.
    pub fn record_width(&self) -> usize {
        self.joints.len() + if self.has_root { ROOT_VALUES } else { 0 }
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn index_of(&self, joint: &str) -> Option<usize> {
        self.index
            .get_or_init(|| self.joints.iter().enumerate().map(|(i, name)| (*name, i)).collect())
            .get(joint)
            .copied()
    }
}

const G1_JOINTS: &[&str] = &[
    "left_hip_pitch_joint",
    "left_hip_roll_joint",
    "left_hip_yaw_joint",
    "left_knee_joint",
    "left_ankle_pitch_joint",
    "left_ankle_roll_joint",
    "right_hip_pitch_joint",
    "right_hip_roll_joint",
    "right_hip_yaw_joint",
    "right_knee_joint",
    "right_ankle_pitch_joint",
    "right_ankle_roll_joint",
    "waist_yaw_joint",
    "waist_roll_joint",
    "waist_pitch_joint",
    "left_shoulder_pitch_joint",
    "left_shoulder_roll_joint",
    "left_shoulder_yaw_joint",
    "left_elbow_joint",
    "left_wrist_roll_joint",
    "left_wrist_pitch_joint",
    "left_wrist_yaw_joint",
    "right_shoulder_pitch_joint",
    "right_shoulder_roll_joint",
    "right_shoulder_yaw_joint",
    "right_elbow_joint",
    "right_wrist_roll_joint",
    "right_wrist_pitch_joint",
    "right_wrist_yaw_joint",
];

const H1_JOINTS: &[&str] = &[
    "left_hip_yaw_joint",
    "left_hip_roll_joint",
    "left_hip_pitch_joint",
    "left_knee_joint",
    "left_ankle_joint",
    "right_hip_yaw_joint",
    "right_hip_roll_joint",
    "right_hip_pitch_joint",
    "right_knee_joint",
    "right_ankle_joint",
    "torso_joint",
    "left_shoulder_pitch_joint",
    "left_shoulder_roll_joint",
    "left_shoulder_yaw_joint",
    "left_elbow_joint",
    "right_shoulder_pitch_joint",
    "right_shoulder_roll_joint",
    "right_shoulder_yaw_joint",
    "right_elbow_joint",
];

const H1_2_JOINTS: &[&str] = &[
    "left_hip_yaw_joint",
    "left_hip_pitch_joint",
    "left_hip_roll_joint",
    "left_knee_joint",
    "left_ankle_pitch_joint",
    "left_ankle_roll_joint",
    "right_hip_yaw_joint",
    "right_hip_pitch_joint",
    "right_hip_roll_joint",
    "right_knee_joint",
    "right_ankle_pitch_joint",
    "right_ankle_roll_joint",
    "torso_joint",
    "left_shoulder_pitch_joint",
    "left_shoulder_roll_joint",
    "left_shoulder_yaw_joint",
    "left_elbow_joint",
    "left_wrist_roll_joint",
    "left_wrist_pitch_joint",
    "left_wrist_yaw_joint",
    "right_shoulder_pitch_joint",
    "right_shoulder_roll_joint",
    "right_shoulder_yaw_joint",
    "right_elbow_joint",
    "right_wrist_roll_joint",
    "right_wrist_pitch_joint",
    "right_wrist_yaw_joint",
];

pub static G1: SkeletonLayout = SkeletonLayout::new("g1", true, G1_JOINTS);
pub static H1: SkeletonLayout = SkeletonLayout::new("h1", true, H1_JOINTS);
pub static H1_2: SkeletonLayout = SkeletonLayout::new("h1_2", true, H1_2_JOINTS);

/// Declaration order decides detection ties.
pub static LAYOUTS: &[&SkeletonLayout] = &[&G1, &H1, &H1_2];

pub fn find(id: &str) -> Option<&'static SkeletonLayout> {
    LAYOUTS.iter().copied().find(|layout| layout.id == id)
}

/// Best-effort layout guess from the number of values in one record.
pub fn detect(width: usize) -> Option<&'static SkeletonLayout> {
    LAYOUTS.iter().copied().find(|layout| layout.record_width() == width)
}
