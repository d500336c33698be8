//! Controller-level properties of the per-axis PID and the actuator clamp

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use visual_servo_tracker::config::{ActuatorLimits, AxisDirection, ControllerConfig};
use visual_servo_tracker::control::{AxisActuator, MIN_DT};
use visual_servo_tracker::{clamp_angle, ErrorEstimator, PIDController, PidState};

fn gains(kp: f32, ki: f32, kd: f32) -> ControllerConfig {
    ControllerConfig {
        kp,
        ki,
        kd,
        output_min: -1000.0,
        output_max: 1000.0,
        integral_min: -15.0,
        integral_max: 15.0,
        derivative_filter_alpha: 1.0,
    }
}

// ============================================================================
// OUTPUT AND INTEGRAL BOUNDS
// ============================================================================

#[test]
fn test_output_never_leaves_bounds() {
    let mut pid = PIDController::new(ControllerConfig {
        kp: 0.5,
        ki: 0.2,
        kd: 0.05,
        ..ControllerConfig::default()
    })
    .expect("valid config");
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..5_000 {
        let error = rng.gen_range(-400.0..400.0);
        let measurement = rng.gen_range(0.0..640.0);
        let dt = rng.gen_range(0.0..0.2);
        let out = pid.update(error, measurement, dt);
        assert!((-6.0..=6.0).contains(&out), "output {out} escaped [-6, 6]");
    }
}

#[test]
fn test_integral_respects_bounds_for_any_tick_count() {
    let mut pid = PIDController::new(gains(0.0, 1.0, 0.0)).expect("valid config");

    for tick in 0..2_000 {
        pid.update(250.0, 100.0, 0.1);
        let integral = pid.state().integral;
        assert!(integral <= 15.0, "tick {tick}: integral {integral} above max");
    }
    assert_eq!(pid.state().integral, 15.0);

    for _ in 0..2_000 {
        pid.update(-250.0, 100.0, 0.1);
    }
    assert_eq!(pid.state().integral, -15.0);
}

#[test]
fn test_integral_settles_with_zero_error() {
    let mut pid = PIDController::new(gains(0.1, 0.5, 0.01)).expect("valid config");
    pid.update(20.0, 340.0, 0.1);
    let settled = pid.state().integral;

    for _ in 0..500 {
        pid.update(0.0, 340.0, 0.1);
    }
    assert_eq!(pid.state().integral, settled, "zero error must not move the integral");
    assert!(pid.state().filtered_derivative.abs() < 1e-3, "D decays with constant measurement");
}

// ============================================================================
// TERMS
// ============================================================================

#[test]
fn test_far_edge_error_saturates_at_max_step() {
    let mut unclamped = PIDController::new(gains(0.035, 0.0, 0.0)).expect("valid config");
    let raw = unclamped.update(-320.0, 0.0, 0.033);
    assert!((raw - 0.035 * -320.0).abs() < 1e-4, "got {raw}");

    let mut pid = PIDController::new(ControllerConfig::default()).expect("valid config");
    assert_eq!(pid.update(-320.0, 0.0, 0.033), -6.0);
}

#[test]
fn test_dead_band_zeroes_proportional_term() {
    let estimator = ErrorEstimator::new(12.0);
    let effective = estimator.apply_dead_band(5.0);
    assert_eq!(effective, 0.0);
    assert_eq!(estimator.apply_dead_band(-11.9), 0.0);
    assert_eq!(estimator.apply_dead_band(12.0), 12.0);

    let mut pid = PIDController::new(gains(0.035, 0.0, 0.0)).expect("valid config");
    let out = pid.update(effective, 325.0, 0.033);
    assert_eq!(pid.last_terms().p, 0.0);
    assert_eq!(out, 0.0);
}

#[test]
fn test_derivative_acts_on_measurement_not_error() {
    let mut pid = PIDController::new(gains(0.0, 0.0, 1.0)).expect("valid config");
    assert_eq!(pid.update(0.0, 300.0, 0.1), 0.0, "no previous measurement, no D");

    // Error jumps, measurement does not: no derivative kick.
    assert_eq!(pid.update(150.0, 300.0, 0.1), 0.0);

    // Measurement moves +10 px in 0.1 s.
    let out = pid.update(150.0, 310.0, 0.1);
    assert!((out - -100.0).abs() < 1e-3, "got {out}");
}

#[test]
fn test_derivative_low_pass() {
    let mut pid = PIDController::new(ControllerConfig {
        derivative_filter_alpha: 0.5,
        ..gains(0.0, 0.0, 1.0)
    })
    .expect("valid config");
    pid.update(0.0, 300.0, 0.1);
    let first = pid.update(0.0, 310.0, 0.1);
    assert!((first - -50.0).abs() < 1e-3, "half of -100, got {first}");
    let second = pid.update(0.0, 310.0, 0.1);
    assert!((second - -25.0).abs() < 1e-3, "decays by alpha, got {second}");
}

#[test]
fn test_dt_is_floored() {
    let mut pid = PIDController::new(gains(0.0, 1.0, 0.0)).expect("valid config");
    pid.update(10.0, 0.0, 0.0);
    assert!((pid.state().integral - 10.0 * MIN_DT).abs() < 1e-6);

    let mut pid = PIDController::new(gains(0.0, 0.0, 1.0)).expect("valid config");
    pid.update(0.0, 0.0, 0.0);
    let out = pid.update(0.0, 1.0, -5.0);
    assert!(out.is_finite());
    assert!((out - -1.0 / MIN_DT).abs() < 1e-2, "got {out}");
}

// ============================================================================
// STATE HANDLING
// ============================================================================

#[test]
fn test_reset_clears_state() {
    let mut pid = PIDController::new(gains(0.1, 0.1, 0.1)).expect("valid config");
    pid.update(40.0, 360.0, 0.1);
    pid.update(30.0, 350.0, 0.1);
    assert_ne!(pid.state(), PidState::default());

    pid.reset();
    assert_eq!(pid.state(), PidState::default());
    assert_eq!(pid.state().previous_measurement, None);
}

#[test]
fn test_non_finite_input_leaves_state_untouched() {
    let mut pid = PIDController::new(gains(0.1, 0.1, 0.1)).expect("valid config");
    pid.update(40.0, 360.0, 0.1);
    let before = pid.state();

    assert_eq!(pid.update(f32::NAN, 360.0, 0.1), 0.0);
    assert_eq!(pid.update(10.0, f32::INFINITY, 0.1), 0.0);
    assert_eq!(pid.state(), before);

    let out = pid.update(10.0, 350.0, f32::NAN);
    assert!(out.is_finite());
}

#[test]
fn test_invalid_gains_rejected() {
    assert!(PIDController::new(ControllerConfig {
        integral_min: 1.0,
        integral_max: -1.0,
        ..ControllerConfig::default()
    })
    .is_err());
    assert!(PIDController::new(ControllerConfig {
        derivative_filter_alpha: 1.5,
        ..ControllerConfig::default()
    })
    .is_err());
    assert!(PIDController::new(ControllerConfig {
        kp: f32::NAN,
        ..ControllerConfig::default()
    })
    .is_err());
}

// ============================================================================
// ACTUATOR CLAMP
// ============================================================================

#[test]
fn test_clamp_stops_at_angle_max() {
    let limits = ActuatorLimits {
        angle_min: 30.0,
        angle_max: 150.0,
        center_angle: 90.0,
    };
    assert_eq!(clamp_angle(148.0, 10.0, 1.0, &limits), 150.0);
    assert_eq!(clamp_angle(32.0, 10.0, -1.0, &limits), 30.0);
    assert_eq!(clamp_angle(90.0, 4.5, 1.0, &limits), 94.5);
}

#[test]
fn test_actuator_integrates_with_direction() {
    let limits = ActuatorLimits::default();
    let mut normal = AxisActuator::new(limits, AxisDirection::Normal).expect("valid limits");
    let mut inverted = AxisActuator::new(limits, AxisDirection::Inverted).expect("valid limits");
    assert_eq!(normal.current_angle(), 90.0);

    for _ in 0..3 {
        normal.apply(6.0);
        inverted.apply(6.0);
    }
    assert_eq!(normal.current_angle(), 108.0);
    assert_eq!(inverted.current_angle(), 72.0);

    for _ in 0..100 {
        normal.apply(6.0);
    }
    assert_eq!(normal.current_angle(), 150.0);
    assert_eq!(normal.apply(f32::NAN), 150.0);
    assert_eq!(normal.recenter(), 90.0);
}
