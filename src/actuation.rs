//! Actuation sink - where commanded angles leave the core

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::ActuationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    Pan,
    Tilt,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Pan => write!(f, "pan"),
            Axis::Tilt => write!(f, "tilt"),
        }
    }
}

/// Receives absolute servo angles. Commands are fire-and-forget: an error is
/// reported back but nothing waits for the hardware to settle.
pub trait ActuationSink {
    fn command(&mut self, axis: Axis, angle_deg: f32) -> Result<(), ActuationError>;

    /// Stop driving the servos. Called once when the session ends.
    fn release(&mut self) -> Result<(), ActuationError> {
        Ok(())
    }
}

impl<T: ActuationSink + ?Sized> ActuationSink for Box<T> {
    fn command(&mut self, axis: Axis, angle_deg: f32) -> Result<(), ActuationError> {
        (**self).command(axis, angle_deg)
    }

    fn release(&mut self) -> Result<(), ActuationError> {
        (**self).release()
    }
}

// ============================================================================
// LOGGING SINK - no hardware, commands go to the log
// ============================================================================

pub struct LoggingSink {
    pan_channel: u8,
    tilt_channel: u8,
}

impl LoggingSink {
    pub fn new(pan_channel: u8, tilt_channel: u8) -> Self {
        Self { pan_channel, tilt_channel }
    }
}

impl ActuationSink for LoggingSink {
    fn command(&mut self, axis: Axis, angle_deg: f32) -> Result<(), ActuationError> {
        let channel = match axis {
            Axis::Pan => self.pan_channel,
            Axis::Tilt => self.tilt_channel,
        };
        debug!(%axis, channel, angle = angle_deg, "servo command");
        Ok(())
    }

    fn release(&mut self) -> Result<(), ActuationError> {
        info!("servos released");
        Ok(())
    }
}

// ============================================================================
// RECORDING SINK - keeps every command, shareable with an observer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SinkEvent {
    Command { axis: Axis, angle: f32 },
    Release,
}

#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    pub fn commands(&self, axis: Axis) -> Vec<f32> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match *e {
                SinkEvent::Command { axis: a, angle } if a == axis => Some(angle),
                _ => None,
            })
            .collect()
    }

    pub fn last_angle(&self, axis: Axis) -> Option<f32> {
        self.commands(axis).last().copied()
    }

    pub fn released(&self) -> usize {
        self.events.lock().iter().filter(|e| **e == SinkEvent::Release).count()
    }
}

impl ActuationSink for RecordingSink {
    fn command(&mut self, axis: Axis, angle_deg: f32) -> Result<(), ActuationError> {
        self.events.lock().push(SinkEvent::Command { axis, angle: angle_deg });
        Ok(())
    }

    fn release(&mut self) -> Result<(), ActuationError> {
        self.events.lock().push(SinkEvent::Release);
        Ok(())
    }
}
