//! Metrics module - per-tick timing histograms and session counters

pub mod chart;

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// TIMING METRICS - Thread-safe performance tracking
// ============================================================================

fn histogram() -> Arc<Mutex<Histogram<u64>>> {
    // Auto-resizing; construction only fails for more than 5 significant figures.
    Arc::new(Mutex::new(Histogram::new(3).expect("3 significant figures")))
}

#[derive(Clone)]
pub struct TimingMetrics {
    acquisition_hist: Arc<Mutex<Histogram<u64>>>,
    processing_hist: Arc<Mutex<Histogram<u64>>>,
    dispatch_hist: Arc<Mutex<Histogram<u64>>>,
    tick_hist: Arc<Mutex<Histogram<u64>>>,
    // Jitter tracking (variance in dt between ticks)
    last_dt_ns: Arc<AtomicU64>,
    jitter_hist: Arc<Mutex<Histogram<u64>>>,
    counters: Arc<TickCounters>,
}

#[derive(Default)]
struct TickCounters {
    ticks: AtomicU64,
    target_ticks: AtomicU64,
    lost_ticks: AtomicU64,
    invalid_frames: AtomicU64,
    sink_failures: AtomicU64,
    dropped_frames: AtomicU64,
}

impl Default for TimingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingMetrics {
    pub fn new() -> Self {
        Self {
            acquisition_hist: histogram(),
            processing_hist: histogram(),
            dispatch_hist: histogram(),
            tick_hist: histogram(),
            last_dt_ns: Arc::new(AtomicU64::new(0)),
            jitter_hist: histogram(),
            counters: Arc::new(TickCounters::default()),
        }
    }

    pub fn record_acquisition(&self, duration: Duration) {
        self.acquisition_hist.lock().record(duration.as_nanos() as u64).ok();
    }

    pub fn record_processing(&self, duration: Duration) {
        self.processing_hist.lock().record(duration.as_nanos() as u64).ok();
    }

    pub fn record_dispatch(&self, duration: Duration) {
        self.dispatch_hist.lock().record(duration.as_nanos() as u64).ok();
    }

    pub fn record_tick(&self, duration: Duration, target_seen: bool) {
        self.tick_hist.lock().record(duration.as_nanos() as u64).ok();
        self.counters.ticks.fetch_add(1, Ordering::Relaxed);
        if target_seen {
            self.counters.target_ticks.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.lost_ticks.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record jitter (variation between consecutive dt values)
    pub fn record_dt(&self, dt: Duration) {
        let dt_ns = dt.as_nanos() as u64;
        let last = self.last_dt_ns.swap(dt_ns, Ordering::Relaxed);
        if last > 0 {
            self.jitter_hist.lock().record(dt_ns.abs_diff(last)).ok();
        }
    }

    pub fn record_invalid_frame(&self) {
        self.counters.invalid_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sink_failure(&self) {
        self.counters.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_dropped_frames(&self, dropped: u64) {
        self.counters.dropped_frames.store(dropped, Ordering::Relaxed);
    }

    pub fn report(&self) -> MetricsReport {
        let acq = self.acquisition_hist.lock();
        let proc = self.processing_hist.lock();
        let dispatch = self.dispatch_hist.lock();
        let tick = self.tick_hist.lock();
        let jitter = self.jitter_hist.lock();
        let c = &self.counters;

        MetricsReport {
            acquisition_p50: Duration::from_nanos(acq.value_at_quantile(0.5)),
            acquisition_p99: Duration::from_nanos(acq.value_at_quantile(0.99)),
            processing_p50: Duration::from_nanos(proc.value_at_quantile(0.5)),
            processing_p99: Duration::from_nanos(proc.value_at_quantile(0.99)),
            dispatch_p50: Duration::from_nanos(dispatch.value_at_quantile(0.5)),
            dispatch_p99: Duration::from_nanos(dispatch.value_at_quantile(0.99)),
            tick_p50: Duration::from_nanos(tick.value_at_quantile(0.5)),
            tick_p99: Duration::from_nanos(tick.value_at_quantile(0.99)),
            jitter_p50: Duration::from_nanos(jitter.value_at_quantile(0.5)),
            jitter_p99: Duration::from_nanos(jitter.value_at_quantile(0.99)),
            ticks: c.ticks.load(Ordering::Relaxed),
            target_ticks: c.target_ticks.load(Ordering::Relaxed),
            lost_ticks: c.lost_ticks.load(Ordering::Relaxed),
            invalid_frames: c.invalid_frames.load(Ordering::Relaxed),
            sink_failures: c.sink_failures.load(Ordering::Relaxed),
            dropped_frames: c.dropped_frames.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// METRICS REPORT - Summary statistics
// ============================================================================

#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub acquisition_p50: Duration,
    pub acquisition_p99: Duration,
    pub processing_p50: Duration,
    pub processing_p99: Duration,
    pub dispatch_p50: Duration,
    pub dispatch_p99: Duration,
    pub tick_p50: Duration,
    pub tick_p99: Duration,
    pub jitter_p50: Duration,
    pub jitter_p99: Duration,
    pub ticks: u64,
    pub target_ticks: u64,
    pub lost_ticks: u64,
    pub invalid_frames: u64,
    pub sink_failures: u64,
    pub dropped_frames: u64,
}

impl MetricsReport {
    /// Share of completed ticks that saw the target, in percent.
    pub fn lock_ratio(&self) -> f64 {
        if self.ticks > 0 {
            self.target_ticks as f64 / self.ticks as f64 * 100.0
        } else {
            0.0
        }
    }
}
