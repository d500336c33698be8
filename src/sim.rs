//! Simulated pan/tilt rig - a camera whose view follows the servo angles
//!
//! The target lives at a fixed (slowly wandering) pan/tilt direction. Each
//! frame places it at `center + (target - servo) * px_per_degree`, so the
//! loop closes through the same sink the hardware would use.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use image::{Rgb, RgbImage};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::actuation::{ActuationSink, Axis};
use crate::config::{FrameConfig, SimulationConfig};
use crate::error::{ActuationError, FrameError};
use crate::source::FrameSource;
use crate::vision::Frame;

const BACKGROUND: u8 = 90;
const TARGET: Rgb<u8> = Rgb([200, 30, 30]);

#[derive(Debug, Clone, Copy)]
pub struct RigState {
    pub pan: f32,
    pub tilt: f32,
    pub target_pan: f32,
    pub target_tilt: f32,
    pub released: bool,
}

/// Shared handle onto the simulated world.
#[derive(Clone)]
pub struct SimulatedRig {
    state: Arc<Mutex<RigState>>,
}

impl SimulatedRig {
    pub fn new(sim: &SimulationConfig, frame: &FrameConfig, pan: f32, tilt: f32) -> (Self, SimCamera, SimServos) {
        let state = Arc::new(Mutex::new(RigState {
            pan,
            tilt,
            target_pan: sim.target_pan_deg,
            target_tilt: sim.target_tilt_deg,
            released: false,
        }));
        let camera = SimCamera {
            state: state.clone(),
            rng: StdRng::seed_from_u64(sim.seed),
            sequence_counter: 0,
            width: frame.width,
            height: frame.height,
            px_per_degree: sim.px_per_degree,
            radius: sim.target_radius_px,
            wander_deg: sim.wander_deg,
            noise_amplitude: sim.noise_amplitude,
            frame_interval: Duration::from_millis(sim.frame_interval_ms),
        };
        let servos = SimServos { state: state.clone() };
        (Self { state }, camera, servos)
    }

    pub fn snapshot(&self) -> RigState {
        *self.state.lock()
    }

    /// Angular distance between where the camera points and the target.
    pub fn pointing_error(&self) -> (f32, f32) {
        let s = self.state.lock();
        (s.target_pan - s.pan, s.target_tilt - s.tilt)
    }

    pub fn inject_disturbance(&self, pan_delta: f32, tilt_delta: f32) {
        let mut s = self.state.lock();
        s.target_pan += pan_delta;
        s.target_tilt += tilt_delta;
    }
}

// ============================================================================
// SIM CAMERA
// ============================================================================

pub struct SimCamera {
    state: Arc<Mutex<RigState>>,
    rng: StdRng,
    sequence_counter: u64,
    width: u32,
    height: u32,
    px_per_degree: f32,
    radius: u32,
    wander_deg: f32,
    noise_amplitude: u8,
    frame_interval: Duration,
}

impl SimCamera {
    pub fn generate(&mut self) -> Result<Frame, FrameError> {
        self.sequence_counter += 1;

        let (cx, cy) = {
            let mut s = self.state.lock();
            if self.wander_deg > 0.0 {
                s.target_pan += self.rng.gen_range(-self.wander_deg..=self.wander_deg);
                s.target_tilt += self.rng.gen_range(-self.wander_deg..=self.wander_deg);
            }
            (
                self.width as f32 / 2.0 + (s.target_pan - s.pan) * self.px_per_degree,
                self.height as f32 / 2.0 + (s.target_tilt - s.tilt) * self.px_per_degree,
            )
        };

        let r2 = (self.radius as f32).powi(2);
        let amp = self.noise_amplitude as i16;
        let mut image = RgbImage::new(self.width, self.height);
        for (x, y, px) in image.enumerate_pixels_mut() {
            let noise = self.rng.gen_range(-amp..=amp);
            let (dx, dy) = (x as f32 - cx, y as f32 - cy);
            let base = if dx * dx + dy * dy <= r2 {
                TARGET
            } else {
                Rgb([BACKGROUND; 3])
            };
            *px = Rgb(base.0.map(|c| (c as i16 + noise).clamp(0, 255) as u8));
        }
        Frame::new(image, self.sequence_counter)
    }

    pub fn get_sequence(&self) -> u64 {
        self.sequence_counter
    }
}

impl FrameSource for SimCamera {
    fn next_frame(&mut self) -> Result<Frame, FrameError> {
        if !self.frame_interval.is_zero() {
            thread::sleep(self.frame_interval);
        }
        self.generate()
    }
}

// ============================================================================
// SIM SERVOS
// ============================================================================

pub struct SimServos {
    state: Arc<Mutex<RigState>>,
}

impl ActuationSink for SimServos {
    fn command(&mut self, axis: Axis, angle_deg: f32) -> Result<(), ActuationError> {
        let mut s = self.state.lock();
        if s.released {
            return Err(ActuationError::Offline("servos released".to_string()));
        }
        match axis {
            Axis::Pan => s.pan = angle_deg,
            Axis::Tilt => s.tilt = angle_deg,
        }
        Ok(())
    }

    fn release(&mut self) -> Result<(), ActuationError> {
        self.state.lock().released = true;
        Ok(())
    }
}
