use super::actuator::AxisActuator;
use super::estimator::AxisError;
use super::pid::{PIDController, PidState};
use super::step::StepController;
use crate::config::{AxisConfig, ControlLaw, TrackingConfig};
use crate::error::ConfigError;

pub enum AxisLaw {
    Pid(PIDController),
    Step(StepController),
}

impl AxisLaw {
    fn delta(&mut self, err: AxisError, dt: f32) -> f32 {
        match self {
            AxisLaw::Pid(pid) => pid.update(err.error, err.measurement, dt),
            AxisLaw::Step(step) => step.update(err.error),
        }
    }

    fn reset(&mut self) {
        if let AxisLaw::Pid(pid) = self {
            pid.reset();
        }
    }
}

/// One servo axis: its control law and the angle it integrates into.
/// Pan and tilt are two independent instances of this.
pub struct AxisControl {
    law: AxisLaw,
    actuator: AxisActuator,
}

impl AxisControl {
    pub fn new(axis: &AxisConfig, tracking: &TrackingConfig) -> Result<Self, ConfigError> {
        let law = match tracking.law {
            ControlLaw::Pid => AxisLaw::Pid(PIDController::new(axis.controller.clone())?),
            ControlLaw::Step => AxisLaw::Step(StepController::new(tracking.step_deg, tracking.step_margin_px)),
        };
        Ok(Self {
            law,
            actuator: AxisActuator::new(axis.limits, axis.direction)?,
        })
    }

    /// Run the law for one tick and return the clamped commanded angle.
    pub fn step(&mut self, err: AxisError, dt: f32) -> f32 {
        let delta = self.law.delta(err, dt);
        self.actuator.apply(delta)
    }

    pub fn reset(&mut self) {
        self.law.reset();
    }

    pub fn angle(&self) -> f32 {
        self.actuator.current_angle()
    }

    pub fn recenter(&mut self) -> f32 {
        self.actuator.recenter()
    }

    /// Controller state, when this axis runs the PID law.
    pub fn pid_state(&self) -> Option<PidState> {
        match &self.law {
            AxisLaw::Pid(pid) => Some(pid.state()),
            AxisLaw::Step(_) => None,
        }
    }
}
