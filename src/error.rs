//! Error taxonomy for the tracker.
//!
//! A missing target is never an error; it is an `Option::None` flowing out of
//! the blob selector. Everything here is either per-tick recoverable
//! (`FrameError` except `Disconnected`, `ActuationError`) or fatal before the
//! loop starts (`ConfigError`).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("control loop is {0}, cannot start")]
    NotIdle(&'static str),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame has zero size ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("frame buffer length {len} does not match {width}x{height}x3")]
    BadBuffer { width: u32, height: u32, len: usize },
    #[error("frame is {got_width}x{got_height}, expected {width}x{height}")]
    SizeMismatch {
        width: u32,
        height: u32,
        got_width: u32,
        got_height: u32,
    },
    #[error("no frame within {0} ms")]
    Timeout(u64),
    #[error("could not decode frame: {0}")]
    Decode(String),
    #[error("frame source disconnected")]
    Disconnected,
}

impl FrameError {
    /// Fatal errors end the session; everything else is retried next tick.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FrameError::Disconnected)
    }
}

#[derive(Debug, Error)]
pub enum ActuationError {
    #[error("{axis} rejected angle {angle:.2}: {reason}")]
    Rejected {
        axis: crate::actuation::Axis,
        angle: f32,
        reason: String,
    },
    #[error("actuator offline: {0}")]
    Offline(String),
}
