use crate::config::ControllerConfig;
use crate::error::ConfigError;

/// Floor applied to `dt` so a stalled clock cannot blow up the D term.
pub const MIN_DT: f32 = 1e-3;

/// Persistent per-axis controller state. Only `update` and `reset` touch it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PidState {
    pub integral: f32,
    pub previous_measurement: Option<f32>,
    pub filtered_derivative: f32,
}

/// Individual contributions of the most recent update, before the output clamp.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PidTerms {
    pub p: f32,
    pub i: f32,
    pub d: f32,
}

/// Discrete PID producing a bounded per-tick angle delta.
///
/// The integral is clamped after accumulation (anti-windup), and the
/// derivative acts on the measurement through a first-order low-pass, so a
/// jump in the error reference never spikes the output.
#[derive(Debug, Clone)]
pub struct PIDController {
    cfg: ControllerConfig,
    state: PidState,
    last_terms: PidTerms,
}

impl PIDController {
    pub fn new(cfg: ControllerConfig) -> Result<Self, ConfigError> {
        cfg.validate("controller")?;
        Ok(Self {
            cfg,
            state: PidState::default(),
            last_terms: PidTerms::default(),
        })
    }

    pub fn update(&mut self, error: f32, measurement: f32, dt: f32) -> f32 {
        if !error.is_finite() || !measurement.is_finite() {
            return 0.0;
        }
        let dt = if dt.is_finite() { dt.max(MIN_DT) } else { MIN_DT };

        // Proportional term
        let p = self.cfg.kp * error;

        // Integral term with anti-windup
        self.state.integral = (self.state.integral + error * dt)
            .clamp(self.cfg.integral_min, self.cfg.integral_max);
        let i = self.cfg.ki * self.state.integral;

        // Derivative on measurement, low-pass filtered
        let raw_d = match self.state.previous_measurement {
            Some(prev) => -(measurement - prev) / dt,
            None => 0.0,
        };
        let alpha = self.cfg.derivative_filter_alpha;
        self.state.filtered_derivative = (1.0 - alpha) * self.state.filtered_derivative + alpha * raw_d;
        let d = self.cfg.kd * self.state.filtered_derivative;

        self.state.previous_measurement = Some(measurement);
        self.last_terms = PidTerms { p, i, d };

        (p + i + d).clamp(self.cfg.output_min, self.cfg.output_max)
    }

    pub fn reset(&mut self) {
        self.state = PidState::default();
        self.last_terms = PidTerms::default();
    }

    pub fn state(&self) -> PidState {
        self.state
    }

    pub fn last_terms(&self) -> PidTerms {
        self.last_terms
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.cfg
    }
}
