//! Fixed primitive calibrations and the canned missions compiled from them.
//!
//! The constants are a snapshot of the stock walk and turn clips, so templates compile
//! the same way on every machine whether or not clips are loaded. They go through the
//! same compiler as live plans.

use motion::{Calibration, CalibrationSource};
use nalgebra::Vector2;
use std::collections::HashMap;
use std::f64::consts::FRAC_PI_4;

use crate::compiler::{self, Waypoint};
use crate::config::{BrainConfig, Primitives};
use crate::error::BrainResult;
use crate::store::SavedPlan;

pub const WALK_FORWARD: Calibration = Calibration {
    forward_distance: 0.62,
    yaw_change: 0.0,
    duration: 1.6,
    frame_count: 48,
};

pub const TURN_LEFT: Calibration = Calibration {
    forward_distance: 0.0,
    yaw_change: FRAC_PI_4,
    duration: 2.0,
    frame_count: 60,
};

pub const TURN_RIGHT: Calibration = Calibration {
    forward_distance: 0.0,
    yaw_change: -FRAC_PI_4,
    duration: 2.0,
    frame_count: 60,
};

#[derive(Debug, Clone)]
pub struct ReferenceCalibrations {
    table: HashMap<String, Calibration>,
}

impl ReferenceCalibrations {
    pub fn new(primitives: &Primitives) -> Self {
        let table = HashMap::from([
            (primitives.walk_forward.clone(), WALK_FORWARD),
            (primitives.turn_left.clone(), TURN_LEFT),
            (primitives.turn_right.clone(), TURN_RIGHT),
        ]);
        Self { table }
    }
}

impl CalibrationSource for ReferenceCalibrations {
    fn calibration(&self, motion_id: &str) -> Option<Calibration> {
        self.table.get(motion_id).copied()
    }
}

fn route(points: &[(f64, f64)]) -> Vec<Waypoint> {
    points.iter().copied().map(Waypoint::from).collect()
}

pub fn template_routes() -> Vec<(&'static str, Vec<Waypoint>)> {
    vec![
        ("square patrol", route(&[(2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)])),
        ("zig-zag", route(&[(1.5, 1.0), (3.0, -1.0), (4.5, 1.0), (6.0, -1.0)])),
        ("out and back", route(&[(4.0, 0.0), (0.0, 0.0)])),
    ]
}

/// Compiles every template route from the origin, facing +x.
pub fn templates(config: &BrainConfig) -> BrainResult<Vec<SavedPlan>> {
    let reference = ReferenceCalibrations::new(&config.primitives);
    template_routes()
        .into_iter()
        .map(|(name, waypoints)| {
            let plan = compiler::compile(&waypoints, Vector2::zeros(), 0.0, &reference, config)?;
            Ok(SavedPlan {
                name: name.to_string(),
                waypoints,
                compiled_commands: plan.commands,
                estimated_duration: plan.estimated_duration,
                is_template: true,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_compile_against_reference_constants() {
        let plans = templates(&BrainConfig::default()).unwrap();
        assert_eq!(plans.len(), 3);
        assert!(plans.iter().all(|p| p.is_template && !p.compiled_commands.is_empty()));

        let out_and_back = &plans[2];
        // 4 m at 0.62 m per step, then a half turn, then back
        let walks = out_and_back.compiled_commands.iter().filter(|c| c.motion_id == "walk_forward").count();
        assert_eq!(walks, 12);
        let turns = out_and_back.compiled_commands.iter().filter(|c| c.motion_id.starts_with("turn_")).count();
        assert_eq!(turns, 4);
    }

    #[test]
    fn reference_table_follows_primitive_names() {
        let primitives = Primitives {
            walk_forward: "stride".to_string(),
            ..Primitives::default()
        };
        let reference = ReferenceCalibrations::new(&primitives);
        assert_eq!(reference.calibration("stride"), Some(WALK_FORWARD));
        assert_eq!(reference.calibration("walk_forward"), None);
    }
}
