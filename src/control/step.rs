/// Bang-bang law: a fixed step whenever the offset leaves the margin window.
#[derive(Debug, Clone, Copy)]
pub struct StepController {
    step_deg: f32,
    margin_px: f32,
}

impl StepController {
    pub fn new(step_deg: f32, margin_px: f32) -> Self {
        Self { step_deg, margin_px }
    }

    pub fn update(&self, error: f32) -> f32 {
        if error > self.margin_px {
            self.step_deg
        } else if error < -self.margin_px {
            -self.step_deg
        } else {
            0.0
        }
    }
}
