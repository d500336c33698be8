use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use image::{Rgb, RgbImage};
use visual_servo_tracker::config::ParkPolicy;
use visual_servo_tracker::*;

const WIDTH: u32 = 160;
const HEIGHT: u32 = 120;

fn small_config() -> TrackerConfig {
    let mut cfg = TrackerConfig::default();
    cfg.frame.width = WIDTH;
    cfg.frame.height = HEIGHT;
    cfg
}

/// Red 20x20 block in the upper-left quadrant.
fn off_center_frame(seq: u64) -> Frame {
    let mut image = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([90, 90, 90]));
    for y in 10..30 {
        for x in 10..30 {
            image.put_pixel(x, y, Rgb([200, 30, 30]));
        }
    }
    Frame::new(image, seq).expect("non-empty frame")
}

/// Rejects every command, counts releases.
struct BrokenServos {
    releases: Arc<AtomicUsize>,
}

impl ActuationSink for BrokenServos {
    fn command(&mut self, axis: Axis, angle_deg: f32) -> std::result::Result<(), ActuationError> {
        Err(ActuationError::Rejected {
            axis,
            angle: angle_deg,
            reason: "bus fault".to_string(),
        })
    }

    fn release(&mut self) -> std::result::Result<(), ActuationError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// BAD FRAMES
// ============================================================================

#[test]
fn test_invalid_frames_skip_tick_and_continue() {
    let sink = RecordingSink::new();
    let source = ScriptedSource::new([
        Err(FrameError::Empty { width: 0, height: 0 }),
        Ok(off_center_frame(1)),
        Err(FrameError::Timeout(500)),
        Err(FrameError::Decode("truncated jpeg".to_string())),
        Ok(off_center_frame(2)),
    ]);
    let mut control = ControlLoop::new(&small_config(), source, sink.clone()).expect("valid config");

    let summary = control.run(&AtomicBool::new(false)).expect("session runs");

    assert_eq!(summary.stop_reason, StopReason::SourceDisconnected);
    assert_eq!(summary.ticks, 2, "only good frames count as ticks");
    assert_eq!(summary.metrics.invalid_frames, 3);
    assert_eq!(summary.metrics.target_ticks, 2);
    // start, two ticks, park
    assert_eq!(sink.commands(Axis::Pan).len(), 4);
    assert_eq!(sink.released(), 1);
}

#[test]
fn test_wrong_size_frame_is_invalid_not_fatal() {
    let sink = RecordingSink::new();
    let wrong = Frame::new(RgbImage::new(64, 48), 1).expect("non-empty frame");
    let source = ScriptedSource::new([Ok(wrong), Ok(off_center_frame(2))]);
    let mut control = ControlLoop::new(&small_config(), source, sink.clone()).expect("valid config");

    control.start().expect("idle loop starts");
    let err = control.tick().expect_err("size mismatch must be reported");
    assert!(matches!(
        err,
        FrameError::SizeMismatch {
            width: WIDTH,
            height: HEIGHT,
            got_width: 64,
            got_height: 48,
        }
    ));
    assert!(!err.is_fatal());

    let report = control.tick().expect("next frame is fine");
    assert!(report.command.is_some());
    assert_eq!(control.metrics().report().invalid_frames, 1);
}

#[test]
fn test_lost_target_holds_angles() {
    let sink = RecordingSink::new();
    let empty = || Frame::new(RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([90, 90, 90])), 0);
    let source = ScriptedSource::new([Ok(off_center_frame(1)), empty(), empty(), empty()]);
    let mut cfg = small_config();
    cfg.runtime.park = ParkPolicy::Release;
    let mut control = ControlLoop::new(&cfg, source, sink.clone()).expect("valid config");

    let summary = control.run(&AtomicBool::new(false)).expect("session runs");

    assert_eq!(summary.ticks, 4);
    assert_eq!(summary.metrics.lost_ticks, 3);
    // center on start plus the single tick that saw the target
    assert_eq!(sink.commands(Axis::Pan).len(), 2);
    assert_eq!(summary.final_angles.pan, sink.last_angle(Axis::Pan).expect("commanded"));
}

// ============================================================================
// ACTUATION FAILURES
// ============================================================================

#[test]
fn test_failing_sink_is_counted_and_loop_continues() {
    let releases = Arc::new(AtomicUsize::new(0));
    let sink = BrokenServos {
        releases: releases.clone(),
    };
    let source = ScriptedSource::new([Ok(off_center_frame(1)), Ok(off_center_frame(2))]);
    let mut control = ControlLoop::new(&small_config(), source, sink).expect("valid config");

    let summary = control.run(&AtomicBool::new(false)).expect("sink failures are not fatal");

    assert_eq!(summary.ticks, 2);
    // two axes each for: start, tick 1, tick 2, park
    assert_eq!(summary.metrics.sink_failures, 8);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[test]
fn test_simulated_servos_go_offline_after_release() {
    let cfg = small_config();
    let (rig, _camera, mut servos) = SimulatedRig::new(&cfg.simulation, &cfg.frame, 90.0, 90.0);

    servos.command(Axis::Pan, 100.0).expect("servos online");
    servos.release().expect("release succeeds");
    assert!(matches!(
        servos.command(Axis::Pan, 110.0),
        Err(ActuationError::Offline(_))
    ));
    assert_eq!(rig.snapshot().pan, 100.0);
}

// ============================================================================
// SAFE PARK
// ============================================================================

#[test]
fn test_cancel_before_first_tick_still_parks() {
    let sink = RecordingSink::new();
    let source = ScriptedSource::new([Ok(off_center_frame(1))]);
    let mut control = ControlLoop::new(&small_config(), source, sink.clone()).expect("valid config");

    let summary = control.run(&AtomicBool::new(true)).expect("session runs");

    assert_eq!(summary.stop_reason, StopReason::Cancelled);
    assert_eq!(summary.ticks, 0);
    assert_eq!(
        sink.events(),
        vec![
            SinkEvent::Command { axis: Axis::Pan, angle: 90.0 },
            SinkEvent::Command { axis: Axis::Tilt, angle: 90.0 },
            SinkEvent::Command { axis: Axis::Pan, angle: 90.0 },
            SinkEvent::Command { axis: Axis::Tilt, angle: 90.0 },
            SinkEvent::Release,
        ]
    );
}

#[test]
fn test_tick_limit_stops_session() {
    let sink = RecordingSink::new();
    let source = ScriptedSource::new((1..=10).map(|seq| Ok(off_center_frame(seq))));
    let mut cfg = small_config();
    cfg.runtime.max_ticks = Some(3);
    let mut control = ControlLoop::new(&cfg, source, sink.clone()).expect("valid config");

    let summary = control.run(&AtomicBool::new(false)).expect("session runs");

    assert_eq!(summary.stop_reason, StopReason::TickLimit);
    assert_eq!(summary.ticks, 3);
    assert_eq!(sink.released(), 1);
}

#[test]
fn test_drop_mid_session_parks_once() {
    let sink = RecordingSink::new();
    {
        let source = ScriptedSource::new([Ok(off_center_frame(1)), Ok(off_center_frame(2))]);
        let mut control = ControlLoop::new(&small_config(), source, sink.clone()).expect("valid config");
        control.start().expect("idle loop starts");
        let report = control.tick().expect("good frame");
        let moved = report.command.expect("target visible");
        assert!(moved.pan < 90.0 && moved.tilt < 90.0, "target is up and left");
        assert_eq!(control.state(), LoopState::Running);
    }

    assert_eq!(sink.released(), 1);
    assert_eq!(sink.last_angle(Axis::Pan), Some(90.0));
    assert_eq!(sink.last_angle(Axis::Tilt), Some(90.0));
}

#[test]
fn test_park_is_idempotent() {
    let sink = RecordingSink::new();
    let mut control =
        ControlLoop::new(&small_config(), ScriptedSource::default(), sink.clone()).expect("valid config");
    control.start().expect("idle loop starts");

    control.park();
    control.park();
    assert_eq!(control.state(), LoopState::Stopped);
    drop(control);

    assert_eq!(sink.released(), 1);
}

#[test]
fn test_never_started_loop_sends_nothing() {
    let sink = RecordingSink::new();
    let control =
        ControlLoop::new(&small_config(), ScriptedSource::default(), sink.clone()).expect("valid config");
    drop(control);
    assert!(sink.events().is_empty());
}

#[test]
fn test_stopped_loop_cannot_restart() {
    let mut control = ControlLoop::new(&small_config(), ScriptedSource::default(), RecordingSink::new())
        .expect("valid config");
    control.run(&AtomicBool::new(false)).expect("session runs");

    assert!(matches!(control.start(), Err(TrackerError::NotIdle("stopped"))));
    assert!(matches!(
        control.run(&AtomicBool::new(false)),
        Err(TrackerError::NotIdle("stopped"))
    ));
}

// ============================================================================
// CONFIGURATION ERRORS
// ============================================================================

#[test]
fn test_bad_config_rejected_before_start() {
    let mut cfg = small_config();
    cfg.tilt.controller.integral_min = 5.0;
    cfg.tilt.controller.integral_max = -5.0;
    let sink = RecordingSink::new();

    let result = ControlLoop::new(&cfg, ScriptedSource::default(), sink.clone());
    assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    assert!(sink.events().is_empty(), "nothing moves on a bad config");

    let mut cfg = small_config();
    cfg.pan.limits.center_angle = 170.0;
    assert!(Tracker::new(&cfg).is_err(), "center outside limits");

    let mut cfg = small_config();
    cfg.segmenter.morph_kernel = 4;
    assert!(Tracker::new(&cfg).is_err(), "even kernel");
}

#[test]
fn test_config_file_errors() {
    let missing = TrackerConfig::load("/nonexistent/tracker.toml");
    assert!(matches!(missing, Err(ConfigError::Read { .. })));

    let defaults = TrackerConfig::load_or_default("/nonexistent/tracker.toml").expect("falls back");
    assert_eq!(defaults.frame.width, 640);

    assert!(matches!(
        TrackerConfig::from_toml_str("[tracking]\nbogus = 1\n"),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        TrackerConfig::from_toml_str("[pan.limits]\nangle_min = 120.0\nangle_max = 60.0\n"),
        Err(ConfigError::Invalid { .. })
    ));
}
