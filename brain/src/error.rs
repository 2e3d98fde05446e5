use motion::MotionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrainError {
    /// The sequence was rejected before any state changed.
    #[error("validation error: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("missing calibration for primitive '{0}'")]
    MissingCalibration(String),

    #[error("degenerate calibration for primitive '{motion_id}': {value} is below {epsilon}")]
    DegenerateCalibration { motion_id: String, value: f64, epsilon: f64 },

    #[error("route error: {0}")]
    Route(String),

    #[error("command {index} references clip '{motion_id}' which is not loaded")]
    MissingClip { index: usize, motion_id: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("plan storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Motion(#[from] MotionError),
}

impl BrainError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

pub type BrainResult<T> = Result<T, BrainError>;
