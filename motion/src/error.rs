use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionError {
    /// Malformed or undetectable clip encoding.
    #[error("format error: {0}")]
    Format(String),

    #[error("insufficient frames: need at least {min}, got {actual}")]
    InsufficientFrames { min: usize, actual: usize },

    #[error("invalid clip: {0}")]
    InvalidClip(String),
}

impl MotionError {
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub fn invalid_clip(msg: impl Into<String>) -> Self {
        Self::InvalidClip(msg.into())
    }
}

pub type MotionResult<T> = Result<T, MotionError>;
