use motion::ClipSource;
use serde::{Deserialize, Serialize};

use crate::error::{BrainError, BrainResult};

fn one() -> u32 {
    1
}

/// "Play clip `motion_id` for `duration`, `repeat_count` times, then wait `transition_delay`."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionCommand {
    pub id: String,
    pub motion_id: String,
    /// Seconds; the clip's own duration when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default = "one")]
    pub repeat_count: u32,
    /// Seconds.
    #[serde(default)]
    pub transition_delay: f64,
}

impl MotionCommand {
    pub fn new(id: impl Into<String>, motion_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            motion_id: motion_id.into(),
            duration: None,
            repeat_count: 1,
            transition_delay: 0.0,
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn with_repeat(mut self, count: u32) -> Self {
        self.repeat_count = count;
        self
    }

    pub fn with_transition_delay(mut self, seconds: f64) -> Self {
        self.transition_delay = seconds;
        self
    }

    fn problems(&self, clips: &impl ClipSource, out: &mut Vec<String>) {
        if clips.clip(&self.motion_id).is_none() {
            out.push(format!("command '{}': unknown motion '{}'", self.id, self.motion_id));
        }
        if let Some(d) = self.duration {
            if !(d.is_finite() && d > 0.0) {
                out.push(format!("command '{}': duration must be > 0, got {d}", self.id));
            }
        }
        if self.repeat_count < 1 {
            out.push(format!("command '{}': repeat_count must be >= 1", self.id));
        }
        if !(self.transition_delay.is_finite() && self.transition_delay >= 0.0) {
            out.push(format!(
                "command '{}': transition_delay must be >= 0, got {}",
                self.id, self.transition_delay
            ));
        }
    }
}

/// Checks every command and reports all problems at once.
pub fn validate(commands: &[MotionCommand], clips: &impl ClipSource) -> BrainResult<()> {
    let mut reasons = Vec::new();
    for command in commands {
        command.problems(clips, &mut reasons);
    }
    if reasons.is_empty() {
        Ok(())
    } else {
        Err(BrainError::Validation(reasons))
    }
}

/// Expands repeats into consecutive single-shot commands.
pub fn flatten(commands: &[MotionCommand]) -> Vec<MotionCommand> {
    commands
        .iter()
        .flat_map(|command| {
            let count = command.repeat_count.max(1);
            (0..count).map(move |n| MotionCommand {
                id: if count == 1 {
                    command.id.clone()
                } else {
                    format!("{}#{}", command.id, n + 1)
                },
                repeat_count: 1,
                ..command.clone()
            })
        })
        .collect()
}
