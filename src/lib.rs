pub mod actuation;
pub mod config;
pub mod control;
pub mod error;
pub mod ipc;
pub mod logging;
pub mod metrics;
pub mod runtime;
pub mod sim;
pub mod source;
pub mod tracker;
pub mod vision;

pub use actuation::{ActuationSink, Axis, LoggingSink, RecordingSink, SinkEvent};
pub use config::TrackerConfig;
pub use control::{clamp_angle, ErrorEstimator, PIDController, PidState};
pub use error::{ActuationError, ConfigError, FrameError, Result, TrackerError};
pub use logging::init_logging;
pub use runtime::{run_session, ControlLoop, LoopState, SessionSummary, StopReason};
pub use sim::SimulatedRig;
pub use source::{FrameSource, ImageSequence, OrientedSource, ScriptedSource};
pub use tracker::{AngleCommand, TickReport, Tracker};
pub use vision::{Blob, Frame, Mask, Segmenter};
