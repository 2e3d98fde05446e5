//! Running a compiled plan and scoring how closely the robot followed the waypoints.

use log::info;
use motion::{ClipSource, UpAxis};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::compiler::{CompiledPlan, Waypoint};
use crate::config::BrainConfig;
use crate::error::BrainResult;
use crate::schedule::Deferred;
use crate::sequencer::Sequencer;

/// Planar root position at `elapsed` seconds into the execution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailSample {
    pub elapsed: f64,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaypointError {
    pub waypoint: Waypoint,
    pub error: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub errors: Vec<WaypointError>,
    pub mean: f64,
    pub max: f64,
}

/// Nearest-approach distance from the trail to each waypoint.
///
/// Timing is ignored, so a waypoint the trail merely passes near counts as visited.
/// With an empty trail every error is infinite.
pub fn score(trail: &[TrailSample], waypoints: &[Waypoint]) -> ScoreReport {
    let errors: Vec<WaypointError> = waypoints
        .iter()
        .map(|wp| {
            let error = trail
                .iter()
                .map(|s| (s.x - wp.x).hypot(s.y - wp.y))
                .fold(f64::INFINITY, f64::min);
            WaypointError { waypoint: *wp, error }
        })
        .collect();

    let (mean, max) = if errors.is_empty() {
        (0.0, 0.0)
    } else {
        let sum: f64 = errors.iter().map(|e| e.error).sum();
        let max = errors.iter().map(|e| e.error).fold(0.0, f64::max);
        (sum / errors.len() as f64, max)
    };
    ScoreReport { errors, mean, max }
}

pub struct Execution<S> {
    sequencer: Sequencer<S>,
    up_axis: UpAxis,
    trail_interval: Duration,
    sampler: Deferred<()>,
    waypoints: Vec<Waypoint>,
    trail: Vec<TrailSample>,
    started: Option<Duration>,
    finished: bool,
}

impl<S: ClipSource> Execution<S> {
    pub fn new(sequencer: Sequencer<S>, up_axis: UpAxis, config: &BrainConfig) -> Self {
        Self {
            sequencer,
            up_axis,
            trail_interval: config.trail_interval().max(Duration::from_millis(1)),
            sampler: Deferred::new(),
            waypoints: Vec::new(),
            trail: Vec::new(),
            started: None,
            finished: false,
        }
    }

    /// Starts `plan` with the robot standing at `start_position` facing `start_yaw`.
    pub fn start(
        &mut self,
        plan: &CompiledPlan,
        waypoints: &[Waypoint],
        start_position: Vector2<f64>,
        start_yaw: f64,
    ) -> BrainResult<()> {
        self.sequencer.stop();
        self.sampler.cancel();
        if let Some(player) = self.sequencer.manual_player() {
            player.anchor_next(self.up_axis, start_position, start_yaw);
        }
        self.sequencer.play(&plan.commands, false)?;

        info!(
            "executing {} commands toward {} waypoints",
            plan.commands.len(),
            waypoints.len()
        );
        self.waypoints = waypoints.to_vec();
        self.trail.clear();
        self.finished = false;
        let now = self.sequencer.now();
        self.started = Some(now);
        self.sample();
        self.sampler.schedule(now + self.trail_interval, ());
        Ok(())
    }

    pub fn tick(&mut self, dt: Duration) -> BrainResult<()> {
        let result = self.sequencer.tick(dt);
        let now = self.sequencer.now();
        if self.sampler.take_due(now).is_some() {
            self.sample();
            self.sampler.schedule(now + self.trail_interval, ());
        }
        if self.started.is_some() && !self.finished && !self.sequencer.is_active() {
            self.sampler.cancel();
            self.sample();
            self.finished = true;
            let report = self.report();
            info!(
                "execution finished: {} samples, mean error {:.3}, max error {:.3}",
                self.trail.len(),
                report.mean,
                report.max
            );
        }
        result
    }

    pub fn stop(&mut self) {
        self.sequencer.stop();
        self.sampler.cancel();
        self.finished = true;
    }

    fn sample(&mut self) {
        let Some(started) = self.started else {
            return;
        };
        let Some(pose) = self.sequencer.player().pose() else {
            return;
        };
        let p = self.up_axis.planar(&pose.position);
        self.trail.push(TrailSample {
            elapsed: (self.sequencer.now() - started).as_secs_f64(),
            x: p.x,
            y: p.y,
        });
    }
}

impl<S> Execution<S> {
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn trail(&self) -> &[TrailSample] {
        &self.trail
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn report(&self) -> ScoreReport {
        score(&self.trail, &self.waypoints)
    }

    pub fn sequencer(&self) -> &Sequencer<S> {
        &self.sequencer
    }

    pub fn sequencer_mut(&mut self) -> &mut Sequencer<S> {
        &mut self.sequencer
    }
}
