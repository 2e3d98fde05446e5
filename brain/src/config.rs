use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{BrainError, BrainResult};

/// Clip ids the compiler uses as its three primitives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Primitives {
    pub turn_left: String,
    pub turn_right: String,
    pub walk_forward: String,
}

impl Default for Primitives {
    fn default() -> Self {
        Self {
            turn_left: "turn_left".to_string(),
            turn_right: "turn_right".to_string(),
            walk_forward: "walk_forward".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    /// How often the sequencer samples command progress.
    pub poll_interval_ms: u64,
    /// Pause before a looping sequence restarts.
    pub settle_delay_ms: u64,
    /// Spacing of recorded trail samples.
    pub trail_interval_ms: u64,
    /// Heading error (radians) below which no turn is planned.
    pub turn_threshold: f64,
    /// Distance below which a waypoint counts as reached.
    pub arrival_threshold: f64,
    /// Smallest usable primitive step.
    pub degenerate_epsilon: f64,
    /// Most repeats the compiler plans for one turn or one walk.
    pub max_repeats: usize,
    pub primitives: Primitives,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            settle_delay_ms: 500,
            trail_interval_ms: 100,
            turn_threshold: 0.05,
            arrival_threshold: 0.05,
            degenerate_epsilon: 0.001,
            max_repeats: 1_000,
            primitives: Primitives::default(),
        }
    }
}

impl BrainConfig {
    pub fn validate(&self) -> BrainResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(BrainError::config("poll_interval_ms must be positive"));
        }
        if self.trail_interval_ms == 0 {
            return Err(BrainError::config("trail_interval_ms must be positive"));
        }
        if self.max_repeats == 0 {
            return Err(BrainError::config("max_repeats must be positive"));
        }
        for (name, value) in [
            ("turn_threshold", self.turn_threshold),
            ("arrival_threshold", self.arrival_threshold),
            ("degenerate_epsilon", self.degenerate_epsilon),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(BrainError::config(format!("{name} must be a non-negative number")));
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn trail_interval(&self) -> Duration {
        Duration::from_millis(self.trail_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: BrainConfig = serde_json::from_str(r#"{ "poll_interval_ms": 20, "primitives": { "walk_forward": "stride" } }"#).unwrap();
        assert_eq!(cfg.poll_interval(), Duration::from_millis(20));
        assert_eq!(cfg.primitives.walk_forward, "stride");
        assert_eq!(cfg.primitives.turn_left, "turn_left");
        assert_eq!(cfg.turn_threshold, 0.05);
        cfg.validate().unwrap();
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let cfg = BrainConfig {
            poll_interval_ms: 0,
            ..BrainConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(BrainError::Config(_))));
    }
}
