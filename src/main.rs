use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use visual_servo_tracker::config::DEFAULT_CONFIG_PATH;
use visual_servo_tracker::ipc::OverlaySlot;
use visual_servo_tracker::metrics::chart::render_latency_chart;
use visual_servo_tracker::runtime::install_interrupt_handler;
use visual_servo_tracker::{
    init_logging, run_session, ImageSequence, LoggingSink, SessionSummary, SimulatedRig, TrackerConfig,
};

#[derive(Parser, Debug)]
#[command(name = "servo-tracker", about = "Keep a red target centered with a pan/tilt servo rig")]
struct Args {
    /// TOML config; defaults to config/tracker_config.toml when present
    #[arg(long)]
    config: Option<PathBuf>,
    /// Replay images from this directory instead of simulating the rig
    #[arg(long)]
    frames: Option<PathBuf>,
    /// Restart the image directory from the top when it runs out
    #[arg(long = "loop")]
    loop_frames: bool,
    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<u64>,
    /// Acquire frames on a separate thread
    #[arg(long)]
    pipelined: bool,
    /// Write a latency chart (PNG) when the session ends
    #[arg(long)]
    chart: Option<PathBuf>,
    /// Write the last frame with the target overlay drawn on it (PNG)
    #[arg(long)]
    snapshot: Option<PathBuf>,
    #[arg(long, default_value = "info")]
    log: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args.log);

    let mut cfg = match &args.config {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::load_or_default(DEFAULT_CONFIG_PATH)?,
    };
    if let Some(ticks) = args.ticks {
        cfg.runtime.max_ticks = Some(ticks);
    }
    if args.pipelined {
        cfg.runtime.pipelined = true;
    }
    if args.snapshot.is_some() {
        cfg.runtime.capture_overlay = true;
    }

    let stop = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(stop.clone())?;
    let overlay = OverlaySlot::new();

    info!(
        width = cfg.frame.width,
        height = cfg.frame.height,
        law = ?cfg.tracking.law,
        pipelined = cfg.runtime.pipelined,
        "starting tracker"
    );

    let summary = match &args.frames {
        Some(dir) => {
            let source = ImageSequence::open(dir, cfg.frame.width, cfg.frame.height, args.loop_frames)?;
            info!(dir = %dir.display(), frames = source.len(), "replaying images");
            let sink = LoggingSink::new(cfg.pan_channel(), cfg.tilt_channel());
            run_session(&cfg, source, sink, &stop, overlay.clone())?
        }
        None => {
            let (rig, camera, servos) = SimulatedRig::new(
                &cfg.simulation,
                &cfg.frame,
                cfg.pan.limits.center_angle,
                cfg.tilt.limits.center_angle,
            );
            info!(seed = cfg.simulation.seed, "simulating rig");
            let summary = run_session(&cfg, camera, servos, &stop, overlay.clone())?;
            let target = rig.snapshot();
            info!(
                pan_error_deg = target.target_pan - summary.final_angles.pan,
                tilt_error_deg = target.target_tilt - summary.final_angles.tilt,
                "pointing error at stop"
            );
            summary
        }
    };

    if let Some(path) = &args.chart {
        render_latency_chart(&summary.metrics, path)?;
        info!(path = %path.display(), "latency chart written");
    }
    if let Some(path) = &args.snapshot {
        match overlay.latest().and_then(|o| o.render_captured()) {
            Some(image) => {
                image.save(path)?;
                info!(path = %path.display(), "overlay snapshot written");
            }
            None => warn!("no frame captured, snapshot skipped"),
        }
    }

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &SessionSummary) {
    let m = &summary.metrics;
    println!("=== Session Results ===");
    println!("Stopped: {:?} after {} ticks", summary.stop_reason, summary.ticks);
    println!(
        "Target lock: {:.1}% ({} seen, {} lost)",
        m.lock_ratio(),
        m.target_ticks,
        m.lost_ticks
    );
    println!(
        "Final angles: pan {:.1}, tilt {:.1}",
        summary.final_angles.pan, summary.final_angles.tilt
    );
    println!(
        "Invalid frames: {}, sink failures: {}, dropped frames: {}",
        m.invalid_frames, m.sink_failures, m.dropped_frames
    );
    println!("Processing P50: {:?}, P99: {:?}", m.processing_p50, m.processing_p99);
    println!("Tick P50: {:?}, P99: {:?}", m.tick_p50, m.tick_p99);
}
