//! Greedy waypoint-to-primitive compilation.
//!
//! For each waypoint: turn toward it in whole turn-primitive steps, then walk toward it in
//! whole walk-primitive steps. The running pose is advanced by the calibrated step sizes,
//! not by what was asked for, so rounding error carries into later waypoints. The planner
//! is open loop and never corrects itself.

use log::info;
use motion::{Calibration, CalibrationSource};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

use crate::command::MotionCommand;
use crate::config::{BrainConfig, Primitives};
use crate::error::{BrainError, BrainResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f64,
    pub y: f64,
}

impl Waypoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_vector(self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

impl From<(f64, f64)> for Waypoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<Vector2<f64>> for Waypoint {
    fn from(v: Vector2<f64>) -> Self {
        Self::new(v.x, v.y)
    }
}

/// Where the planner believes the robot stands after a waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarPose {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledPlan {
    /// Single-shot commands, already flattened.
    pub commands: Vec<MotionCommand>,
    /// Seconds.
    pub estimated_duration: f64,
    /// Open-loop pose estimate after each waypoint.
    #[serde(default)]
    pub predicted: Vec<PlanarPose>,
}

impl CompiledPlan {
    pub fn count(&self, motion_id: &str) -> usize {
        self.commands.iter().filter(|c| c.motion_id == motion_id).count()
    }
}

/// The three calibrations the compiler needs, resolved and checked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimitiveCalibrations {
    pub turn_left: Calibration,
    pub turn_right: Calibration,
    pub walk_forward: Calibration,
}

impl PrimitiveCalibrations {
    pub fn resolve(source: &impl CalibrationSource, primitives: &Primitives) -> BrainResult<Self> {
        let get = |id: &str| {
            source
                .calibration(id)
                .ok_or_else(|| BrainError::MissingCalibration(id.to_string()))
        };
        Ok(Self {
            turn_left: get(&primitives.turn_left)?,
            turn_right: get(&primitives.turn_right)?,
            walk_forward: get(&primitives.walk_forward)?,
        })
    }

    /// Rejects steps small enough to blow up repeat counts.
    pub fn check(&self, primitives: &Primitives, epsilon: f64) -> BrainResult<()> {
        for (id, value) in [
            (&primitives.turn_left, self.turn_left.yaw_change.abs()),
            (&primitives.turn_right, self.turn_right.yaw_change.abs()),
            (&primitives.walk_forward, self.walk_forward.forward_distance),
        ] {
            if !(value >= epsilon) {
                return Err(BrainError::DegenerateCalibration {
                    motion_id: id.clone(),
                    value,
                    epsilon,
                });
            }
        }
        Ok(())
    }
}

/// Wraps an angle into `[-π, π)`.
pub fn wrap_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(TAU) - PI
}

fn steps(amount: f64, step: f64, max: usize) -> BrainResult<usize> {
    let repeats = (amount / step).round().max(1.0);
    if !(repeats <= max as f64) {
        return Err(BrainError::Route(format!(
            "{amount:.3} in steps of {step:.3} needs {repeats} repeats, more than the limit of {max}"
        )));
    }
    Ok(repeats as usize)
}

fn check_inputs(waypoints: &[Waypoint], start_position: Vector2<f64>, start_yaw: f64) -> BrainResult<()> {
    let mut problems = Vec::new();
    if !(start_position.x.is_finite() && start_position.y.is_finite()) {
        problems.push(format!("start position ({}, {}) is not finite", start_position.x, start_position.y));
    }
    if !start_yaw.is_finite() {
        problems.push(format!("start yaw {start_yaw} is not finite"));
    }
    for (i, wp) in waypoints.iter().enumerate() {
        if !(wp.x.is_finite() && wp.y.is_finite()) {
            problems.push(format!("waypoint {i} ({}, {}) is not finite", wp.x, wp.y));
        }
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(BrainError::Validation(problems))
    }
}

struct Emitter<'a> {
    primitives: &'a Primitives,
    calibrations: &'a PrimitiveCalibrations,
    commands: Vec<MotionCommand>,
    duration: f64,
}

impl Emitter<'_> {
    fn push(&mut self, motion_id: &str, repeats: usize) {
        let calibration = if motion_id == self.primitives.walk_forward {
            self.calibrations.walk_forward
        } else if motion_id == self.primitives.turn_left {
            self.calibrations.turn_left
        } else {
            self.calibrations.turn_right
        };
        for _ in 0..repeats {
            let id = format!("{motion_id}-{}", self.commands.len() + 1);
            self.commands.push(MotionCommand::new(id, motion_id));
            self.duration += calibration.duration;
        }
    }
}

/// Compiles `waypoints` into turn/walk primitive commands from a start pose.
pub fn compile(
    waypoints: &[Waypoint],
    start_position: Vector2<f64>,
    start_yaw: f64,
    source: &impl CalibrationSource,
    config: &BrainConfig,
) -> BrainResult<CompiledPlan> {
    check_inputs(waypoints, start_position, start_yaw)?;
    let primitives = &config.primitives;
    let calibrations = PrimitiveCalibrations::resolve(source, primitives)?;
    calibrations.check(primitives, config.degenerate_epsilon)?;

    let mut out = Emitter {
        primitives,
        calibrations: &calibrations,
        commands: Vec::new(),
        duration: 0.0,
    };
    let mut position = start_position;
    let mut yaw = start_yaw;
    let mut predicted = Vec::with_capacity(waypoints.len());

    for waypoint in waypoints {
        let target = waypoint.to_vector();
        let delta = target - position;
        // no heading toward a point we already stand on
        if delta != Vector2::zeros() {
            let yaw_diff = wrap_angle(delta.y.atan2(delta.x) - yaw);
            if yaw_diff.abs() > config.turn_threshold {
                let (id, turn) = if yaw_diff > 0.0 {
                    (&primitives.turn_left, calibrations.turn_left)
                } else {
                    (&primitives.turn_right, calibrations.turn_right)
                };
                let repeats = steps(yaw_diff.abs(), turn.yaw_change.abs(), config.max_repeats)?;
                out.push(id, repeats);
                yaw += repeats as f64 * turn.yaw_change;
            }
        }

        let distance = (target - position).norm();
        if distance > config.arrival_threshold {
            let stride = calibrations.walk_forward.forward_distance;
            let repeats = steps(distance, stride, config.max_repeats)?;
            out.push(&primitives.walk_forward, repeats);
            let travelled = stride * repeats as f64;
            position += Vector2::new(yaw.cos(), yaw.sin()) * travelled;
        }
        predicted.push(PlanarPose {
            x: position.x,
            y: position.y,
            yaw,
        });
    }

    info!(
        "compiled {} waypoints into {} commands, {:.1}s estimated",
        waypoints.len(),
        out.commands.len(),
        out.duration
    );
    Ok(CompiledPlan {
        commands: out.commands,
        estimated_duration: out.duration,
        predicted,
    })
}
