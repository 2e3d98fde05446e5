//! Parsing contract for delimited motion records.
//!
//! One record per line, values separated by commas or whitespace. Tokens that do not
//! parse as finite numbers are ignored, so header rows fall out naturally. For layouts
//! with a root, the first seven values are `px, py, pz, qx, qy, qz, qw`; the rest map in
//! declared joint order. Records with too few values are skipped, never zero-filled.

use log::{debug, warn};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::clip::{Frame, MotionClip};
use crate::error::{MotionError, MotionResult};
use crate::skeleton::{self, ROOT_VALUES, SkeletonLayout};

const MIN_QUATERNION_NORM: f64 = 1e-9;

fn numeric_tokens(line: &str) -> Vec<f64> {
    line.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .filter_map(|t| t.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .collect()
}

fn records(raw: &str) -> impl Iterator<Item = (usize, Vec<f64>)> + '_ {
    raw.lines()
        .enumerate()
        .map(|(n, line)| (n + 1, numeric_tokens(line)))
        .filter(|(_, values)| !values.is_empty())
}

/// Guesses the layout from the value count of the first numeric record.
///
/// Best effort only: layouts sharing a width resolve to the first declared one.
pub fn detect_skeleton(raw_header: &str) -> MotionResult<&'static SkeletonLayout> {
    let (line, values) = records(raw_header)
        .next()
        .ok_or_else(|| MotionError::format("no numeric record to detect a skeleton from"))?;
    skeleton::detect(values.len()).ok_or_else(|| {
        MotionError::format(format!(
            "line {line}: {} values per record match no known skeleton layout",
            values.len()
        ))
    })
}

fn frame_from_record(layout: &SkeletonLayout, values: &[f64]) -> Option<Frame> {
    let (root_position, root_rotation, angles) = if layout.has_root {
        let q = Quaternion::new(values[6], values[3], values[4], values[5]);
        let rotation = UnitQuaternion::try_new(q, MIN_QUATERNION_NORM)?;
        let position = Vector3::new(values[0], values[1], values[2]);
        (position, rotation, &values[ROOT_VALUES..])
    } else {
        (Vector3::zeros(), UnitQuaternion::identity(), values)
    };
    let joints = angles.iter().take(layout.joint_count()).map(|v| Some(*v)).collect();
    Some(Frame::new(root_position, root_rotation, joints))
}

/// Builds a clip from delimited text.
///
/// Without an explicit `skeleton_id` the layout is detected from the first record.
pub fn parse(name: &str, raw: &str, skeleton_id: Option<&str>, fps: f64) -> MotionResult<MotionClip> {
    let layout = match skeleton_id {
        Some(id) => skeleton::find(id).ok_or_else(|| MotionError::format(format!("unknown skeleton '{id}'")))?,
        None => detect_skeleton(raw)?,
    };
    let width = layout.record_width();

    let mut frames = Vec::new();
    for (line, values) in records(raw) {
        if values.len() < width {
            warn!("{name}: line {line} has {} values, {} required; skipped", values.len(), width);
            continue;
        }
        if values.len() > width {
            warn!(
                "{name}: line {line} has {} values, '{}' uses {}; extra values ignored",
                values.len(),
                layout.id,
                width
            );
        }
        match frame_from_record(layout, &values) {
            Some(frame) => frames.push(frame),
            None => warn!("{name}: line {line} has a degenerate root quaternion; skipped"),
        }
    }
    if frames.is_empty() {
        return Err(MotionError::format(format!("{name}: no usable records")));
    }

    debug!("{name}: parsed {} frames for skeleton '{}'", frames.len(), layout.id);
    MotionClip::new(name, layout, fps, frames)
}

/// Same as [`parse`] for raw bytes; the encoding must be UTF-8.
pub fn parse_bytes(name: &str, raw: &[u8], skeleton_id: Option<&str>, fps: f64) -> MotionResult<MotionClip> {
    let text = std::str::from_utf8(raw).map_err(|e| MotionError::format(format!("{name}: {e}")))?;
    parse(name, text, skeleton_id, fps)
}
