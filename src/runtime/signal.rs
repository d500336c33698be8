use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::info;

/// Set `stop` on the first Ctrl-C. The wait happens on a detached thread
/// running a current-thread tokio runtime, so the control loop itself stays
/// synchronous.
pub fn install_interrupt_handler(stop: Arc<AtomicBool>) -> std::io::Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    thread::Builder::new().name("interrupt".into()).spawn(move || {
        rt.block_on(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, stopping after this tick");
                stop.store(true, Ordering::Relaxed);
            }
        });
    })?;
    Ok(())
}
