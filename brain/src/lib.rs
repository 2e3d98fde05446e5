use motion::{MotionClip, MotionLibrary, UpAxis};
use nalgebra::Vector2;
use std::sync::Arc;

pub mod command;
pub mod compiler;
pub mod config;
pub mod error;
pub mod execution;
pub mod missions;
pub mod schedule;
pub mod sequencer;
pub mod store;

pub use command::MotionCommand;
pub use compiler::{CompiledPlan, PlanarPose, Waypoint};
pub use config::{BrainConfig, Primitives};
pub use error::{BrainError, BrainResult};
pub use execution::{Execution, ScoreReport, TrailSample, WaypointError};
pub use sequencer::{Sequencer, SequencerEvent, SequencerState};
pub use store::{JsonPlanStore, MemoryPlanStore, PlanStore, SavedPlan};

/// Owns the clip library and turns waypoint routes into running executions.
pub struct RobotBrain {
    library: Arc<MotionLibrary>,
    config: BrainConfig,
}

impl RobotBrain {
    pub fn new(up_axis: UpAxis, config: BrainConfig) -> BrainResult<Self> {
        config.validate()?;
        Ok(Self {
            library: Arc::new(MotionLibrary::new(up_axis)),
            config,
        })
    }

    pub fn config(&self) -> &BrainConfig {
        &self.config
    }

    pub fn library(&self) -> &MotionLibrary {
        &self.library
    }

    /// Adds or replaces a clip. Executions already started keep the clips they were given.
    pub fn load_clip(&mut self, id: impl Into<String>, clip: MotionClip) -> Option<motion::Calibration> {
        Arc::make_mut(&mut self.library).insert(id, clip)
    }

    /// Compiles a route against the live calibrations.
    pub fn plan_route(&self, start: Vector2<f64>, start_yaw: f64, waypoints: &[Waypoint]) -> BrainResult<CompiledPlan> {
        compiler::compile(waypoints, start, start_yaw, &*self.library, &self.config)
    }

    pub fn execute(
        &self,
        plan: &CompiledPlan,
        waypoints: &[Waypoint],
        start: Vector2<f64>,
        start_yaw: f64,
    ) -> BrainResult<Execution<Arc<MotionLibrary>>> {
        let sequencer = Sequencer::new(self.library.clone(), &self.config);
        let mut execution = Execution::new(sequencer, self.library.up_axis(), &self.config);
        execution.start(plan, waypoints, start, start_yaw)?;
        Ok(execution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motion::skeleton::H1;
    use motion::Frame;
    use nalgebra::{UnitQuaternion, Vector3};

    fn walk() -> MotionClip {
        let frames = (0..5)
            .map(|i| Frame::root(Vector3::new(i as f64 * 0.25, 0.0, 1.0), UnitQuaternion::identity()))
            .collect();
        MotionClip::new("walk_forward", &H1, 10.0, frames).unwrap()
    }

    #[test]
    fn test_planner() {
        let mut brain = RobotBrain::new(UpAxis::Z, BrainConfig::default()).unwrap();
        assert!(matches!(
            brain.plan_route(Vector2::zeros(), 0.0, &[Waypoint::new(1.0, 0.0)]),
            Err(BrainError::MissingCalibration(_))
        ));

        brain.load_clip("walk_forward", walk());
        for (id, sign) in [("turn_left", 1.0), ("turn_right", -1.0)] {
            let frames = vec![
                Frame::root(Vector3::zeros(), UnitQuaternion::identity()),
                Frame::root(Vector3::zeros(), UnitQuaternion::from_euler_angles(0.0, 0.0, sign * 0.5)),
            ];
            let calibration = brain.load_clip(id, MotionClip::new(id, &H1, 10.0, frames).unwrap()).unwrap();
            assert!((calibration.yaw_change - sign * 0.5).abs() < 1e-9);
        }
        assert_eq!(brain.library().len(), 3);

        let plan = brain.plan_route(Vector2::zeros(), 0.0, &[Waypoint::new(3.0, 0.0)]).unwrap();
        assert_eq!(plan.count("walk_forward"), 3);

        let execution = brain.execute(&plan, &[Waypoint::new(3.0, 0.0)], Vector2::zeros(), 0.0).unwrap();
        assert!(execution.sequencer().is_active());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = BrainConfig {
            trail_interval_ms: 0,
            ..BrainConfig::default()
        };
        assert!(RobotBrain::new(UpAxis::Z, config).is_err());
    }
}
