use brain::{BrainConfig, Waypoint};
use motion::MotionConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One clip file to preload.
#[derive(Debug, Clone, Deserialize)]
pub struct ClipEntry {
    pub id: String,
    pub path: PathBuf,
    /// Detected from the record width when absent.
    #[serde(default)]
    pub skeleton: Option<String>,
    #[serde(default)]
    pub fps: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct StartPose {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub motion: MotionConfig,
    pub brain: BrainConfig,
    pub clips: Vec<ClipEntry>,
    pub start: StartPose,
    pub waypoints: Vec<Waypoint>,
    pub tick_hz: f64,
    pub plan_name: String,
    pub plan_store: Option<PathBuf>,
    pub publish: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            motion: MotionConfig::default(),
            brain: BrainConfig::default(),
            clips: Vec::new(),
            start: StartPose::default(),
            waypoints: Vec::new(),
            tick_hz: 60.0,
            plan_name: "latest".to_string(),
            plan_store: None,
            publish: false,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if !(self.tick_hz.is_finite() && self.tick_hz > 0.0) {
            return Err(format!("tick_hz must be positive, got {}", self.tick_hz).into());
        }
        if !(self.motion.default_fps.is_finite() && self.motion.default_fps > 0.0) {
            return Err("motion.default_fps must be positive".into());
        }
        self.brain.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "clips": [{ "id": "walk_forward", "path": "clips/walk.csv" }],
                "waypoints": [{ "x": 1.0, "y": 0.0 }],
                "motion": { "up_axis": "y" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.tick_hz, 60.0);
        assert_eq!(config.clips[0].skeleton, None);
        assert_eq!(config.motion.up_axis, motion::UpAxis::Y);
        assert_eq!(config.brain.poll_interval_ms, 100);
        config.validate().unwrap();
    }

    #[test]
    fn zero_tick_rate_is_rejected() {
        let config = AppConfig {
            tick_hz: 0.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
