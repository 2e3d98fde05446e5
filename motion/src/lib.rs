//! Motion clips for articulated robots: the canonical frame model, skeleton layouts,
//! loading, calibration, and transform-chained playback.

pub mod calibrate;
pub mod clip;
pub mod config;
pub mod error;
pub mod events;
pub mod library;
pub mod loader;
pub mod player;
pub mod skeleton;

pub use calibrate::{Calibration, CalibrationSource, Calibrator};
pub use clip::{Frame, MotionClip};
pub use config::{MotionConfig, UpAxis};
pub use error::{MotionError, MotionResult};
pub use events::Notifier;
pub use library::{ClipSource, MotionLibrary};
pub use player::{ClipPlayer, PlayerEvent, WorldPose};
pub use skeleton::SkeletonLayout;
