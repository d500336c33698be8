use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{info, warn};

use crate::ipc::FramePublisher;
use crate::metrics::TimingMetrics;
use crate::source::FrameSource;

#[derive(Default)]
pub struct AcquisitionStats {
    pub frames: AtomicU64,
    pub failures: AtomicU64,
}

/// Pull frames on a dedicated thread and publish each into the mailbox,
/// overwriting any the control loop has not taken yet. The thread ends on
/// `shutdown` or when the source disconnects; either way the publisher is
/// dropped, which the consumer sees as a disconnect.
pub fn spawn_acquisition_thread<S>(
    mut source: S,
    publisher: FramePublisher,
    shutdown: Arc<AtomicBool>,
    metrics: TimingMetrics,
) -> std::io::Result<(thread::JoinHandle<()>, Arc<AcquisitionStats>)>
where
    S: FrameSource + Send + 'static,
{
    let stats = Arc::new(AcquisitionStats::default());
    let stats_clone = stats.clone();

    let handle = thread::Builder::new().name("acquisition".into()).spawn(move || {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                info!("acquisition thread shutting down");
                break;
            }
            match source.next_frame() {
                Ok(frame) => {
                    stats_clone.frames.fetch_add(1, Ordering::Relaxed);
                    publisher.publish(frame);
                    metrics.set_dropped_frames(publisher.dropped());
                }
                Err(e) if e.is_fatal() => {
                    info!(error = %e, "frame source closed");
                    break;
                }
                Err(e) => {
                    stats_clone.failures.fetch_add(1, Ordering::Relaxed);
                    metrics.record_invalid_frame();
                    warn!(error = %e, "acquisition failed");
                }
            }
        }
    })?;

    Ok((handle, stats))
}
