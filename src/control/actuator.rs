use crate::config::{ActuatorLimits, AxisDirection};
use crate::error::ConfigError;

/// `current + sign * delta`, hard-clamped to the physical range.
pub fn clamp_angle(current: f32, delta: f32, sign: f32, limits: &ActuatorLimits) -> f32 {
    (current + sign * delta).clamp(limits.angle_min, limits.angle_max)
}

/// Commanded angle of one servo. Starts at the center angle.
#[derive(Debug, Clone)]
pub struct AxisActuator {
    limits: ActuatorLimits,
    direction: AxisDirection,
    current_angle: f32,
}

impl AxisActuator {
    pub fn new(limits: ActuatorLimits, direction: AxisDirection) -> Result<Self, ConfigError> {
        limits.validate("actuator")?;
        Ok(Self {
            limits,
            direction,
            current_angle: limits.center_angle,
        })
    }

    /// Integrate `delta` and return the new commanded angle. A non-finite
    /// delta leaves the angle where it is.
    pub fn apply(&mut self, delta: f32) -> f32 {
        if delta.is_finite() {
            self.current_angle = clamp_angle(self.current_angle, delta, self.direction.sign(), &self.limits);
        }
        self.current_angle
    }

    pub fn current_angle(&self) -> f32 {
        self.current_angle
    }

    pub fn recenter(&mut self) -> f32 {
        self.current_angle = self.limits.center_angle;
        self.current_angle
    }
}
