//! Tracker configuration: one structure carrying every tunable, loaded from
//! TOML and validated before the control loop is built.
//!
//! Defaults are the values the rig was tuned with (640x480 frames, red hue
//! windows, kp = 0.035, six degrees per frame, servos between 30 and 150).

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "config/tracker_config.toml";

pub const DEFAULT_PAN_CHANNEL: u8 = 0;
pub const DEFAULT_TILT_CHANNEL: u8 = 1;

/// Largest blur or morphology kernel accepted.
pub const MAX_KERNEL: u32 = 31;

/// Largest simulated target radius accepted, in pixels.
pub const MAX_TARGET_RADIUS_PX: u32 = 1024;

// ============================================================================
// TOP-LEVEL CONFIG
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    pub frame: FrameConfig,
    pub segmenter: SegmenterConfig,
    pub tracking: TrackingConfig,
    pub pan: AxisConfig,
    pub tilt: AxisConfig,
    pub runtime: RuntimeConfig,
    pub simulation: SimulationConfig,
}

impl TrackerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: TrackerConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&s)
    }

    /// Like [`TrackerConfig::load`], but a missing file yields the defaults.
    /// A file that exists and does not parse is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn pan_channel(&self) -> u8 {
        self.pan.channel.unwrap_or(DEFAULT_PAN_CHANNEL)
    }

    pub fn tilt_channel(&self) -> u8 {
        self.tilt.channel.unwrap_or(DEFAULT_TILT_CHANNEL)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.frame.validate()?;
        self.segmenter.validate()?;
        self.tracking.validate()?;
        self.pan.validate("pan")?;
        self.tilt.validate("tilt")?;
        if self.pan_channel() == self.tilt_channel() {
            return Err(ConfigError::invalid(
                "tilt.channel",
                format!("pan and tilt both drive channel {}", self.pan_channel()),
            ));
        }
        self.simulation.validate()?;
        Ok(())
    }
}

// ============================================================================
// FRAME
// ============================================================================

/// Fixed flip/rotation applied by the source for the camera's mounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Upright,
    FlipVertical,
    FlipHorizontal,
    Rotate180,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameConfig {
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            orientation: Orientation::Upright,
        }
    }
}

impl FrameConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::invalid(
                "frame",
                format!("size {}x{} must be non-zero", self.width, self.height),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SEGMENTER
// ============================================================================

/// Inclusive hue range on the 0..=179 half-degree scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HueWindow {
    pub min: u8,
    pub max: u8,
}

impl HueWindow {
    pub fn contains(&self, hue: u8) -> bool {
        (self.min..=self.max).contains(&hue)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SegmenterConfig {
    pub blur_kernel: u32,
    pub morph_kernel: u32,
    pub low_hue: HueWindow,
    pub high_hue: HueWindow,
    pub min_saturation: u8,
    pub min_value: u8,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            blur_kernel: 5,
            morph_kernel: 3,
            low_hue: HueWindow { min: 0, max: 10 },
            high_hue: HueWindow { min: 170, max: 179 },
            min_saturation: 120,
            min_value: 70,
        }
    }
}

impl SegmenterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, k) in [
            ("segmenter.blur_kernel", self.blur_kernel),
            ("segmenter.morph_kernel", self.morph_kernel),
        ] {
            if k == 0 || k % 2 == 0 || k > MAX_KERNEL {
                return Err(ConfigError::invalid(
                    field,
                    format!("{k} must be odd and in 1..={MAX_KERNEL}"),
                ));
            }
        }
        for (field, w) in [
            ("segmenter.low_hue", self.low_hue),
            ("segmenter.high_hue", self.high_hue),
        ] {
            if w.max > 179 || w.min > w.max {
                return Err(ConfigError::invalid(
                    field,
                    format!("[{}, {}] is not an ordered range within 0..=179", w.min, w.max),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// TRACKING
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlLaw {
    #[default]
    Pid,
    /// Fixed step per tick whenever the centroid is outside the margin.
    Step,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackingConfig {
    pub dead_band_px: f32,
    pub law: ControlLaw,
    pub step_deg: f32,
    pub step_margin_px: f32,
    /// Consecutive lost ticks after which a reappearing target resets both
    /// controllers. Zero never resets.
    pub reacquire_reset_ticks: u32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            dead_band_px: 12.0,
            law: ControlLaw::Pid,
            step_deg: 2.0,
            step_margin_px: 20.0,
            reacquire_reset_ticks: 15,
        }
    }
}

impl TrackingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        finite_non_negative("tracking.dead_band_px", self.dead_band_px)?;
        finite_non_negative("tracking.step_deg", self.step_deg)?;
        finite_non_negative("tracking.step_margin_px", self.step_margin_px)?;
        Ok(())
    }
}

// ============================================================================
// AXES
// ============================================================================

/// Mounting direction of a servo relative to image coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisDirection {
    #[default]
    Normal,
    Inverted,
}

impl AxisDirection {
    pub fn sign(self) -> f32 {
        match self {
            AxisDirection::Normal => 1.0,
            AxisDirection::Inverted => -1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    pub output_min: f32,
    pub output_max: f32,
    pub integral_min: f32,
    pub integral_max: f32,
    pub derivative_filter_alpha: f32,
}

pub const MAX_DEG_PER_FRAME: f32 = 6.0;

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            kp: 0.035,
            ki: 0.0,
            kd: 0.001,
            output_min: -MAX_DEG_PER_FRAME,
            output_max: MAX_DEG_PER_FRAME,
            integral_min: -15.0,
            integral_max: 15.0,
            derivative_filter_alpha: 0.25,
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self, axis: &str) -> Result<(), ConfigError> {
        for (name, v) in [
            ("kp", self.kp),
            ("ki", self.ki),
            ("kd", self.kd),
            ("output_min", self.output_min),
            ("output_max", self.output_max),
            ("integral_min", self.integral_min),
            ("integral_max", self.integral_max),
        ] {
            if !v.is_finite() {
                return Err(ConfigError::invalid(format!("{axis}.controller.{name}"), "must be finite"));
            }
        }
        if self.output_min > self.output_max {
            return Err(ConfigError::invalid(
                format!("{axis}.controller"),
                format!("output_min {} > output_max {}", self.output_min, self.output_max),
            ));
        }
        if self.integral_min > self.integral_max {
            return Err(ConfigError::invalid(
                format!("{axis}.controller"),
                format!("integral_min {} > integral_max {}", self.integral_min, self.integral_max),
            ));
        }
        let alpha = self.derivative_filter_alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(ConfigError::invalid(
                format!("{axis}.controller.derivative_filter_alpha"),
                format!("{alpha} is outside (0, 1]"),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActuatorLimits {
    pub angle_min: f32,
    pub angle_max: f32,
    pub center_angle: f32,
}

impl Default for ActuatorLimits {
    fn default() -> Self {
        Self {
            angle_min: 30.0,
            angle_max: 150.0,
            center_angle: 90.0,
        }
    }
}

impl ActuatorLimits {
    pub fn validate(&self, axis: &str) -> Result<(), ConfigError> {
        let field = format!("{axis}.limits");
        if !(self.angle_min.is_finite() && self.angle_max.is_finite() && self.center_angle.is_finite()) {
            return Err(ConfigError::invalid(field, "angles must be finite"));
        }
        if self.angle_min >= self.angle_max {
            return Err(ConfigError::invalid(
                field,
                format!("angle_min {} must be below angle_max {}", self.angle_min, self.angle_max),
            ));
        }
        if !(self.angle_min..=self.angle_max).contains(&self.center_angle) {
            return Err(ConfigError::invalid(
                field,
                format!(
                    "center_angle {} is outside [{}, {}]",
                    self.center_angle, self.angle_min, self.angle_max
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AxisConfig {
    /// Output channel on the PWM driver. Unset means channel 0 for pan and
    /// 1 for tilt.
    pub channel: Option<u8>,
    pub direction: AxisDirection,
    pub controller: ControllerConfig,
    pub limits: ActuatorLimits,
}

impl AxisConfig {
    fn validate(&self, axis: &str) -> Result<(), ConfigError> {
        self.controller.validate(axis)?;
        self.limits.validate(axis)
    }
}

// ============================================================================
// RUNTIME
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParkPolicy {
    /// Command both axes to their center angle, then release.
    #[default]
    Center,
    /// Release the actuators where they stand.
    Release,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    pub pipelined: bool,
    pub acquisition_timeout_ms: u64,
    pub park: ParkPolicy,
    /// Keep the frame and mask of every tick in the overlay slot.
    pub capture_overlay: bool,
    pub max_ticks: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            pipelined: false,
            acquisition_timeout_ms: 500,
            park: ParkPolicy::Center,
            capture_overlay: false,
            max_ticks: None,
        }
    }
}

// ============================================================================
// SIMULATION
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub seed: u64,
    pub px_per_degree: f32,
    pub target_radius_px: u32,
    pub target_pan_deg: f32,
    pub target_tilt_deg: f32,
    /// Maximum random walk of the target per frame, in degrees.
    pub wander_deg: f32,
    pub noise_amplitude: u8,
    pub frame_interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            px_per_degree: 8.0,
            target_radius_px: 24,
            target_pan_deg: 110.0,
            target_tilt_deg: 80.0,
            wander_deg: 0.3,
            noise_amplitude: 12,
            frame_interval_ms: 33,
        }
    }
}

impl SimulationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.px_per_degree.is_finite() && self.px_per_degree > 0.0) {
            return Err(ConfigError::invalid("simulation.px_per_degree", "must be positive"));
        }
        finite_non_negative("simulation.wander_deg", self.wander_deg)?;
        if self.target_radius_px > MAX_TARGET_RADIUS_PX {
            return Err(ConfigError::invalid(
                "simulation.target_radius_px",
                format!("{} exceeds {MAX_TARGET_RADIUS_PX}", self.target_radius_px),
            ));
        }
        Ok(())
    }
}

fn finite_non_negative(field: &str, v: f32) -> Result<(), ConfigError> {
    if !v.is_finite() || v < 0.0 {
        return Err(ConfigError::invalid(field, format!("{v} must be finite and >= 0")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        TrackerConfig::default().validate().expect("defaults validate");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = TrackerConfig::from_toml_str(
            r#"
            [tracking]
            dead_band_px = 4.0

            [tilt]
            direction = "inverted"

            [tilt.controller]
            kp = 0.05
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.tracking.dead_band_px, 4.0);
        assert_eq!(cfg.tilt.direction.sign(), -1.0);
        assert_eq!(cfg.tilt.controller.kp, 0.05);
        assert_eq!(cfg.tilt.controller.output_max, MAX_DEG_PER_FRAME);
        assert_eq!(cfg.pan.limits.angle_max, 150.0);
    }

    #[test]
    fn rejects_inverted_integral_bounds() {
        let err = TrackerConfig::from_toml_str(
            r#"
            [pan.controller]
            integral_min = 5.0
            integral_max = -5.0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("integral_min"), "got: {err}");
    }

    #[test]
    fn rejects_empty_angle_range() {
        let mut cfg = TrackerConfig::default();
        cfg.tilt.limits.angle_min = 120.0;
        cfg.tilt.limits.angle_max = 120.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_even_kernel_and_bad_alpha() {
        let mut cfg = TrackerConfig::default();
        cfg.segmenter.blur_kernel = 4;
        assert!(cfg.validate().is_err());

        let mut cfg = TrackerConfig::default();
        cfg.pan.controller.derivative_filter_alpha = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parses_orientation_names() {
        let cfg = TrackerConfig::from_toml_str("[frame]\norientation = \"rotate180\"\n").expect("parse");
        assert_eq!(cfg.frame.orientation, Orientation::Rotate180);
        let cfg = TrackerConfig::from_toml_str("[frame]\norientation = \"flip_horizontal\"\n").expect("parse");
        assert_eq!(cfg.frame.orientation, Orientation::FlipHorizontal);
    }

    #[test]
    fn tilt_table_without_channel_keeps_tilt_channel() {
        let cfg = TrackerConfig::from_toml_str("[tilt]\ndirection = \"inverted\"\n").expect("parse");
        assert_eq!(cfg.pan_channel(), 0);
        assert_eq!(cfg.tilt_channel(), 1);

        let cfg = TrackerConfig::from_toml_str("[pan]\nchannel = 3\n[tilt]\nchannel = 4\n").expect("parse");
        assert_eq!((cfg.pan_channel(), cfg.tilt_channel()), (3, 4));
    }

    #[test]
    fn rejects_shared_channel() {
        let err = TrackerConfig::from_toml_str("[pan]\nchannel = 1\n").unwrap_err();
        assert!(err.to_string().contains("tilt.channel"), "got: {err}");
    }

    #[test]
    fn rejects_oversized_kernels_and_radius() {
        let mut cfg = TrackerConfig::default();
        cfg.segmenter.blur_kernel = MAX_KERNEL;
        assert!(cfg.validate().is_ok());
        cfg.segmenter.blur_kernel = MAX_KERNEL + 2;
        assert!(cfg.validate().is_err());

        let mut cfg = TrackerConfig::default();
        cfg.segmenter.morph_kernel = 10_001;
        assert!(cfg.validate().is_err());

        let mut cfg = TrackerConfig::default();
        cfg.simulation.target_radius_px = 70_000;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_unknown_direction() {
        assert!(TrackerConfig::from_toml_str("[pan]\ndirection = \"sideways\"\n").is_err());
    }
}
