use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::actuation::{ActuationSink, Axis};
use crate::config::{ParkPolicy, TrackerConfig};
use crate::error::{ConfigError, FrameError, Result, TrackerError};
use crate::ipc::{Overlay, OverlaySlot};
use crate::metrics::{MetricsReport, TimingMetrics};
use crate::source::FrameSource;
use crate::tracker::{AngleCommand, TickReport, Tracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

impl LoopState {
    fn name(self) -> &'static str {
        match self {
            LoopState::Idle => "idle",
            LoopState::Running => "running",
            LoopState::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    TickLimit,
    SourceDisconnected,
}

#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub stop_reason: StopReason,
    pub ticks: u64,
    /// Angles the tracker held when the loop stopped, before parking.
    pub final_angles: AngleCommand,
    pub metrics: MetricsReport,
}

/// Owns one tracking session: the source, the sink and all controller
/// state. Single-threaded; the only blocking call is frame acquisition.
///
/// Whatever way the session ends, the actuators are parked exactly once,
/// including when the loop is dropped mid-run.
pub struct ControlLoop<S: FrameSource, A: ActuationSink> {
    source: S,
    sink: A,
    tracker: Tracker,
    park: ParkPolicy,
    max_ticks: Option<u64>,
    capture_overlay: bool,
    state: LoopState,
    metrics: TimingMetrics,
    overlay: OverlaySlot,
    last_frame_at: Option<Instant>,
    tick_count: u64,
}

impl<S: FrameSource, A: ActuationSink> ControlLoop<S, A> {
    pub fn new(cfg: &TrackerConfig, source: S, sink: A) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            source,
            sink,
            tracker: Tracker::new(cfg)?,
            park: cfg.runtime.park,
            max_ticks: cfg.runtime.max_ticks,
            capture_overlay: cfg.runtime.capture_overlay,
            state: LoopState::Idle,
            metrics: TimingMetrics::new(),
            overlay: OverlaySlot::new(),
            last_frame_at: None,
            tick_count: 0,
        })
    }

    pub fn with_metrics(mut self, metrics: TimingMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_overlay(mut self, overlay: OverlaySlot) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn metrics(&self) -> &TimingMetrics {
        &self.metrics
    }

    pub fn overlay(&self) -> &OverlaySlot {
        &self.overlay
    }

    pub fn ticks(&self) -> u64 {
        self.tick_count
    }

    /// Idle -> Running. Centers both servos before the first tick.
    pub fn start(&mut self) -> Result<()> {
        if self.state != LoopState::Idle {
            return Err(TrackerError::NotIdle(self.state.name()));
        }
        let center = AngleCommand {
            pan: self.tracker.pan_mut().recenter(),
            tilt: self.tracker.tilt_mut().recenter(),
        };
        info!(pan = center.pan, tilt = center.tilt, "centering servos");
        self.dispatch(center);
        self.state = LoopState::Running;
        self.last_frame_at = Some(Instant::now());
        Ok(())
    }

    /// One tick. Frame errors come back to the caller, which decides whether
    /// they end the session.
    pub fn tick(&mut self) -> std::result::Result<TickReport, FrameError> {
        let acquire_start = Instant::now();
        let frame = self.source.next_frame();
        let acquired = Instant::now();
        self.metrics.record_acquisition(acquired - acquire_start);

        let frame = frame.map_err(|e| {
            if !e.is_fatal() {
                self.metrics.record_invalid_frame();
            }
            e
        })?;

        let captured = frame.captured_at();
        let dt = captured.saturating_duration_since(self.last_frame_at.unwrap_or(captured));
        self.last_frame_at = Some(captured);
        self.metrics.record_dt(dt);

        let proc_start = Instant::now();
        let report = self.tracker.process(&frame, dt.as_secs_f32()).map_err(|e| {
            self.metrics.record_invalid_frame();
            e
        })?;
        self.metrics.record_processing(proc_start.elapsed());

        if let Some(command) = report.command {
            let dispatch_start = Instant::now();
            self.dispatch(command);
            self.metrics.record_dispatch(dispatch_start.elapsed());
        }

        self.tick_count += 1;
        self.overlay.publish(Overlay {
            tick: self.tick_count,
            blob: report.blob,
            frame: self.capture_overlay.then(|| frame.clone()),
            mask: report.mask.clone(),
            angles: self.tracker.angles(),
        });
        self.metrics.record_tick(acquire_start.elapsed(), report.command.is_some());
        debug!(tick = self.tick_count, seq = frame.sequence_id(), dt_ms = dt.as_secs_f64() * 1000.0, "tick done");

        Ok(report)
    }

    /// Run until `stop` is set, the tick limit is hit or the source goes away,
    /// then park. `stop` is checked once per tick boundary.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<SessionSummary> {
        if self.state == LoopState::Idle {
            self.start()?;
        } else if self.state == LoopState::Stopped {
            return Err(TrackerError::NotIdle(self.state.name()));
        }

        let stop_reason = loop {
            if stop.load(Ordering::Relaxed) {
                break StopReason::Cancelled;
            }
            if self.max_ticks.is_some_and(|max| self.tick_count >= max) {
                break StopReason::TickLimit;
            }
            match self.tick() {
                Ok(_) => {}
                Err(e) if e.is_fatal() => {
                    warn!(error = %e, "frame source failed, stopping");
                    break StopReason::SourceDisconnected;
                }
                Err(e) => warn!(error = %e, "skipping tick"),
            }
        };

        let final_angles = self.tracker.angles();
        self.park();

        let metrics = self.metrics.report();
        info!(
            ?stop_reason,
            ticks = self.tick_count,
            lock_pct = metrics.lock_ratio(),
            invalid_frames = metrics.invalid_frames,
            sink_failures = metrics.sink_failures,
            "session finished"
        );
        Ok(SessionSummary {
            stop_reason,
            ticks: self.tick_count,
            final_angles,
            metrics,
        })
    }

    /// Safe-park: center (per policy), then release. Runs at most once.
    pub fn park(&mut self) {
        if self.state == LoopState::Stopped {
            return;
        }
        let was_running = self.state == LoopState::Running;
        self.state = LoopState::Stopped;
        if !was_running {
            return;
        }

        if self.park == ParkPolicy::Center {
            let center = AngleCommand {
                pan: self.tracker.pan_mut().recenter(),
                tilt: self.tracker.tilt_mut().recenter(),
            };
            info!(pan = center.pan, tilt = center.tilt, "parking servos at center");
            self.dispatch(center);
        }
        if let Err(e) = self.sink.release() {
            warn!(error = %e, "servo release failed");
            self.metrics.record_sink_failure();
        }
    }

    fn dispatch(&mut self, command: AngleCommand) {
        for (axis, angle) in [(Axis::Pan, command.pan), (Axis::Tilt, command.tilt)] {
            if let Err(e) = self.sink.command(axis, angle) {
                warn!(%axis, angle, error = %e, "servo command failed");
                self.metrics.record_sink_failure();
            }
        }
    }
}

impl<S: FrameSource, A: ActuationSink> Drop for ControlLoop<S, A> {
    fn drop(&mut self) {
        self.park();
    }
}
