//! One tick of the tracking pipeline: frame -> mask -> blob -> error ->
//! control law -> clamped angles. No I/O happens here.

use tracing::{debug, info};

use crate::config::TrackerConfig;
use crate::control::{AxisControl, ErrorEstimator, TargetError};
use crate::error::{ConfigError, FrameError};
use crate::vision::{largest_blob, Blob, Frame, Mask, Segmenter};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleCommand {
    pub pan: f32,
    pub tilt: f32,
}

/// What one tick saw and decided.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub blob: Option<Blob>,
    pub error: Option<TargetError>,
    /// `None` on a no-target tick: nothing is dispatched and the servos hold.
    pub command: Option<AngleCommand>,
    /// Set when the controllers were reset because the target came back.
    pub reacquired: bool,
    pub mask: Option<Mask>,
    /// Seconds since the previous frame was captured, as fed to the controllers.
    pub dt: f32,
}

pub struct Tracker {
    segmenter: Segmenter,
    estimator: ErrorEstimator,
    pan: AxisControl,
    tilt: AxisControl,
    width: u32,
    height: u32,
    reacquire_reset_ticks: u32,
    lost_ticks: u32,
    capture_mask: bool,
}

impl Tracker {
    pub fn new(cfg: &TrackerConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            segmenter: Segmenter::new(cfg.segmenter.clone())?,
            estimator: ErrorEstimator::new(cfg.tracking.dead_band_px),
            pan: AxisControl::new(&cfg.pan, &cfg.tracking)?,
            tilt: AxisControl::new(&cfg.tilt, &cfg.tracking)?,
            width: cfg.frame.width,
            height: cfg.frame.height,
            reacquire_reset_ticks: cfg.tracking.reacquire_reset_ticks,
            lost_ticks: 0,
            capture_mask: cfg.runtime.capture_overlay,
        })
    }

    pub fn process(&mut self, frame: &Frame, dt: f32) -> Result<TickReport, FrameError> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(FrameError::SizeMismatch {
                width: self.width,
                height: self.height,
                got_width: frame.width(),
                got_height: frame.height(),
            });
        }

        let mask = self.segmenter.segment(frame);
        let blob = largest_blob(&mask);
        let mut report = self.steer(blob.as_ref(), dt);
        if self.capture_mask {
            report.mask = Some(mask);
        }
        Ok(report)
    }

    /// Everything downstream of blob selection.
    pub fn steer(&mut self, blob: Option<&Blob>, dt: f32) -> TickReport {
        let Some(error) = self.estimator.estimate(blob, self.width, self.height) else {
            self.lost_ticks = self.lost_ticks.saturating_add(1);
            if self.lost_ticks == 1 {
                info!("target lost, holding angles");
            }
            return TickReport {
                blob: blob.copied(),
                error: None,
                command: None,
                reacquired: false,
                mask: None,
                dt,
            };
        };

        let reacquired = self.reacquire_reset_ticks > 0 && self.lost_ticks >= self.reacquire_reset_ticks;
        if reacquired {
            info!(lost_ticks = self.lost_ticks, "target reacquired, resetting controllers");
            self.pan.reset();
            self.tilt.reset();
        }
        self.lost_ticks = 0;

        let command = AngleCommand {
            pan: self.pan.step(error.pan, dt),
            tilt: self.tilt.step(error.tilt, dt),
        };
        debug!(
            err_x = error.pan.error,
            err_y = error.tilt.error,
            pan = command.pan,
            tilt = command.tilt,
            "tick"
        );

        TickReport {
            blob: blob.copied(),
            error: Some(error),
            command: Some(command),
            reacquired,
            mask: None,
            dt,
        }
    }

    pub fn pan(&self) -> &AxisControl {
        &self.pan
    }

    pub fn tilt(&self) -> &AxisControl {
        &self.tilt
    }

    pub fn pan_mut(&mut self) -> &mut AxisControl {
        &mut self.pan
    }

    pub fn tilt_mut(&mut self) -> &mut AxisControl {
        &mut self.tilt
    }

    pub fn angles(&self) -> AngleCommand {
        AngleCommand {
            pan: self.pan.angle(),
            tilt: self.tilt.angle(),
        }
    }

    pub fn lost_ticks(&self) -> u32 {
        self.lost_ticks
    }
}
