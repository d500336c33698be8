//! Runtime module - the control loop driver, optional acquisition thread and
//! interrupt handling

pub mod acquisition;
pub mod driver;
pub mod signal;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::actuation::ActuationSink;
use crate::config::TrackerConfig;
use crate::error::Result;
use crate::ipc::{latest_frame_mailbox, OverlaySlot};
use crate::metrics::TimingMetrics;
use crate::source::{FrameSource, OrientedSource};

pub use acquisition::{spawn_acquisition_thread, AcquisitionStats};
pub use driver::{ControlLoop, LoopState, SessionSummary, StopReason};
pub use signal::install_interrupt_handler;

/// Run one tracking session to completion. With `runtime.pipelined` the
/// source is driven from its own thread through a latest-frame mailbox;
/// otherwise acquisition happens inline on the control thread.
pub fn run_session<S, A>(
    cfg: &TrackerConfig,
    source: S,
    sink: A,
    stop: &AtomicBool,
    overlay: OverlaySlot,
) -> Result<SessionSummary>
where
    S: FrameSource + Send + 'static,
    A: ActuationSink,
{
    let source = OrientedSource::new(source, cfg.frame.orientation);
    let metrics = TimingMetrics::new();

    if !cfg.runtime.pipelined {
        let mut control = ControlLoop::new(cfg, source, sink)?
            .with_metrics(metrics)
            .with_overlay(overlay);
        return control.run(stop);
    }

    let timeout = Duration::from_millis(cfg.runtime.acquisition_timeout_ms);
    let (publisher, mailbox) = latest_frame_mailbox(timeout);
    let mut control = ControlLoop::new(cfg, mailbox, sink)?
        .with_metrics(metrics.clone())
        .with_overlay(overlay);

    let shutdown = Arc::new(AtomicBool::new(false));
    let (handle, stats) = spawn_acquisition_thread(source, publisher, shutdown.clone(), metrics)?;

    let result = control.run(stop);
    shutdown.store(true, Ordering::Relaxed);
    drop(control);

    if handle.join().is_err() {
        warn!("acquisition thread panicked");
    }
    info!(
        frames = stats.frames.load(Ordering::Relaxed),
        failures = stats.failures.load(Ordering::Relaxed),
        "acquisition finished"
    );
    result
}
