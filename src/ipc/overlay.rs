use std::sync::Arc;

use image::{Rgb, RgbImage};
use parking_lot::RwLock;

use crate::tracker::AngleCommand;
use crate::vision::{Blob, Frame, Mask};

const MARKER: Rgb<u8> = Rgb([0, 255, 0]);
const CROSS_HALF: i64 = 10;

/// Observational snapshot of the latest tick. Nothing reads it back into
/// the control path.
#[derive(Debug, Clone)]
pub struct Overlay {
    pub tick: u64,
    pub blob: Option<Blob>,
    /// Present only when the runtime captures overlays.
    pub frame: Option<Frame>,
    pub mask: Option<Mask>,
    pub angles: AngleCommand,
}

impl Overlay {
    /// The captured frame with the blob drawn on it.
    pub fn render_captured(&self) -> Option<RgbImage> {
        self.frame.as_ref().map(|f| self.render(f))
    }

    /// Copy of `frame` with the blob's bounding box and centroid drawn on it.
    pub fn render(&self, frame: &Frame) -> RgbImage {
        let mut out = frame.image().clone();
        if let Some(blob) = &self.blob {
            let b = blob.bbox;
            if !b.is_empty() {
                let (x1, y1) = (b.x.saturating_add(b.width - 1), b.y.saturating_add(b.height - 1));
                for x in b.x..=x1 {
                    put(&mut out, x as i64, b.y as i64);
                    put(&mut out, x as i64, y1 as i64);
                }
                for y in b.y..=y1 {
                    put(&mut out, b.x as i64, y as i64);
                    put(&mut out, x1 as i64, y as i64);
                }
            }
            let (cx, cy) = (blob.centroid.0.round() as i64, blob.centroid.1.round() as i64);
            for d in -CROSS_HALF..=CROSS_HALF {
                put(&mut out, cx + d, cy);
                put(&mut out, cx, cy + d);
            }
        }
        out
    }
}

fn put(img: &mut RgbImage, x: i64, y: i64) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, MARKER);
    }
}

/// Latest overlay, shared between the control loop (writer) and any number
/// of observers.
#[derive(Clone, Default)]
pub struct OverlaySlot {
    latest: Arc<RwLock<Option<Overlay>>>,
}

impl OverlaySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, overlay: Overlay) {
        *self.latest.write() = Some(overlay);
    }

    pub fn latest(&self) -> Option<Overlay> {
        self.latest.read().clone()
    }
}
