//! Plan persistence.
//!
//! Storage is opaque to the rest of the crate: callers only load everything or save one
//! plan by name.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::command::MotionCommand;
use crate::compiler::Waypoint;
use crate::config::BrainConfig;
use crate::error::BrainResult;
use crate::missions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPlan {
    pub name: String,
    pub waypoints: Vec<Waypoint>,
    pub compiled_commands: Vec<MotionCommand>,
    pub estimated_duration: f64,
    #[serde(default)]
    pub is_template: bool,
}

pub trait PlanStore {
    fn load_plans(&self) -> BrainResult<Vec<SavedPlan>>;

    /// Saves under `name`, replacing any earlier plan of that name.
    fn save_plan(
        &mut self,
        name: &str,
        waypoints: &[Waypoint],
        commands: &[MotionCommand],
        estimated_duration: f64,
    ) -> BrainResult<()>;
}

fn upsert(plans: &mut Vec<SavedPlan>, plan: SavedPlan) {
    match plans.iter_mut().find(|p| p.name == plan.name) {
        Some(existing) => *existing = plan,
        None => plans.push(plan),
    }
}

fn user_plan(name: &str, waypoints: &[Waypoint], commands: &[MotionCommand], estimated_duration: f64) -> SavedPlan {
    SavedPlan {
        name: name.to_string(),
        waypoints: waypoints.to_vec(),
        compiled_commands: commands.to_vec(),
        estimated_duration,
        is_template: false,
    }
}

#[derive(Debug, Default)]
pub struct MemoryPlanStore {
    plans: Vec<SavedPlan>,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded with the mission templates.
    pub fn with_templates(config: &BrainConfig) -> BrainResult<Self> {
        Ok(Self {
            plans: missions::templates(config)?,
        })
    }
}

impl PlanStore for MemoryPlanStore {
    fn load_plans(&self) -> BrainResult<Vec<SavedPlan>> {
        Ok(self.plans.clone())
    }

    fn save_plan(
        &mut self,
        name: &str,
        waypoints: &[Waypoint],
        commands: &[MotionCommand],
        estimated_duration: f64,
    ) -> BrainResult<()> {
        upsert(&mut self.plans, user_plan(name, waypoints, commands, estimated_duration));
        Ok(())
    }
}

/// All plans in one JSON document.
#[derive(Debug, Clone)]
pub struct JsonPlanStore {
    path: PathBuf,
}

impl JsonPlanStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PlanStore for JsonPlanStore {
    fn load_plans(&self) -> BrainResult<Vec<SavedPlan>> {
        if !self.path.exists() {
            debug!("{} does not exist yet; no saved plans", self.path.display());
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn save_plan(
        &mut self,
        name: &str,
        waypoints: &[Waypoint],
        commands: &[MotionCommand],
        estimated_duration: f64,
    ) -> BrainResult<()> {
        let mut plans = self.load_plans()?;
        upsert(&mut plans, user_plan(name, waypoints, commands, estimated_duration));

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&plans)?)?;
        fs::rename(&tmp, &self.path)?;
        info!("saved plan '{name}' to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commands() -> Vec<MotionCommand> {
        vec![MotionCommand::new("walk_forward-1", "walk_forward")]
    }

    #[test]
    fn memory_store_replaces_by_name() {
        let mut store = MemoryPlanStore::new();
        store.save_plan("a", &[Waypoint::new(1.0, 0.0)], &commands(), 1.6).unwrap();
        store.save_plan("a", &[Waypoint::new(2.0, 0.0)], &commands(), 3.2).unwrap();
        let plans = store.load_plans().unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].waypoints, vec![Waypoint::new(2.0, 0.0)]);
        assert!(!plans[0].is_template);
    }

    #[test]
    fn templates_are_flagged() {
        let store = MemoryPlanStore::with_templates(&BrainConfig::default()).unwrap();
        let plans = store.load_plans().unwrap();
        assert_eq!(plans.len(), 3);
        assert!(plans.iter().all(|p| p.is_template));
    }

    #[test]
    fn json_store_round_trips_through_disk() {
        let path = std::env::temp_dir().join(format!("brain-plans-{}.json", std::process::id()));
        let _ = fs::remove_file(&path);
        let mut store = JsonPlanStore::new(&path);
        assert!(store.load_plans().unwrap().is_empty());

        store.save_plan("patrol", &[Waypoint::new(1.0, 1.0)], &commands(), 1.6).unwrap();
        store.save_plan("scout", &[], &[], 0.0).unwrap();
        let reopened = JsonPlanStore::new(&path);
        let plans = reopened.load_plans().unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].name, "patrol");
        assert_eq!(plans[0].compiled_commands, commands());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn corrupt_json_is_an_error() {
        let path = std::env::temp_dir().join(format!("brain-plans-bad-{}.json", std::process::id()));
        fs::write(&path, "{ not json").unwrap();
        let store = JsonPlanStore::new(&path);
        assert!(matches!(store.load_plans(), Err(crate::error::BrainError::Serde(_))));
        fs::remove_file(&path).unwrap();
    }
}
