//! Control module - error estimation, per-axis control laws and angle clamping

pub mod actuator;
pub mod axis;
pub mod estimator;
pub mod pid;
pub mod step;

pub use actuator::{clamp_angle, AxisActuator};
pub use axis::{AxisControl, AxisLaw};
pub use estimator::{AxisError, ErrorEstimator, TargetError};
pub use pid::{PIDController, PidState, PidTerms, MIN_DT};
pub use step::StepController;
