use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging to stdout. `RUST_LOG` overrides `default_filter`.
///
/// ```
/// visual_servo_tracker::init_logging("info");
/// ```
pub fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // A second call (tests, embedding) keeps the first subscriber.
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
