use crate::vision::Blob;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisError {
    /// Signed pixel offset from the frame center, dead-band applied.
    pub error: f32,
    /// Raw centroid coordinate along this axis, fed to the D term.
    pub measurement: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetError {
    pub pan: AxisError,
    pub tilt: AxisError,
}

/// Centroid offset from the optical center. Right and down are positive.
#[derive(Debug, Clone, Copy)]
pub struct ErrorEstimator {
    dead_band_px: f32,
}

impl ErrorEstimator {
    pub fn new(dead_band_px: f32) -> Self {
        Self { dead_band_px }
    }

    pub fn apply_dead_band(&self, err: f32) -> f32 {
        if err.abs() < self.dead_band_px {
            0.0
        } else {
            err
        }
    }

    /// `None` means "no update": no target, or one that must not drive the loop.
    pub fn estimate(&self, blob: Option<&Blob>, width: u32, height: u32) -> Option<TargetError> {
        let blob = blob.filter(|b| !b.is_degenerate())?;
        let (cx, cy) = blob.centroid;
        Some(TargetError {
            pan: AxisError {
                error: self.apply_dead_band(cx - width as f32 / 2.0),
                measurement: cx,
            },
            tilt: AxisError {
                error: self.apply_dead_band(cy - height as f32 / 2.0),
                measurement: cy,
            },
        })
    }
}
