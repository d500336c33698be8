//! Connected-component labeling and largest-blob selection.
//!
//! Labeling uses 8-connectivity. Labels start at 1 and are handed out in
//! raster order of each component's first pixel; 0 is background.

use super::frame::Mask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Inclusive on both edges. An empty box contains nothing.
    pub fn contains(&self, px: f32, py: f32) -> bool {
        !self.is_empty()
            && px >= self.x as f32
            && py >= self.y as f32
            && px <= self.x as f32 + (self.width - 1) as f32
            && py <= self.y as f32 + (self.height - 1) as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blob {
    pub centroid: (f32, f32),
    pub bbox: BoundingBox,
    pub area: u32,
    pub label: u32,
}

impl Blob {
    /// A blob that must not drive the actuators.
    pub fn is_degenerate(&self) -> bool {
        self.area == 0 || !self.centroid.0.is_finite() || !self.centroid.1.is_finite()
    }
}

struct Accumulator {
    area: u64,
    sum_x: u64,
    sum_y: u64,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl Accumulator {
    fn new(x: u32, y: u32) -> Self {
        Self {
            area: 0,
            sum_x: 0,
            sum_y: 0,
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn add(&mut self, x: u32, y: u32) {
        self.area += 1;
        self.sum_x += x as u64;
        self.sum_y += y as u64;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn into_blob(self, label: u32) -> Blob {
        let area = self.area as f64;
        Blob {
            centroid: ((self.sum_x as f64 / area) as f32, (self.sum_y as f64 / area) as f32),
            bbox: BoundingBox {
                x: self.min_x,
                y: self.min_y,
                width: self.max_x - self.min_x + 1,
                height: self.max_y - self.min_y + 1,
            },
            area: self.area as u32,
            label,
        }
    }
}

/// Every foreground component of `mask`; element `i` carries label `i + 1`.
pub fn label_components(mask: &Mask) -> Vec<Blob> {
    let (w, h) = (mask.width() as usize, mask.height() as usize);
    let pixels = mask.as_raw();
    let mut labels = vec![0u32; w * h];
    let mut blobs = Vec::new();
    let mut stack = Vec::new();

    for start in 0..w * h {
        if pixels[start] == 0 || labels[start] != 0 {
            continue;
        }
        let label = blobs.len() as u32 + 1;
        labels[start] = label;
        stack.push(start);
        let mut acc = Accumulator::new((start % w) as u32, (start / w) as u32);

        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % w, idx / w);
            acc.add(x as u32, y as u32);

            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    let n = ny * w + nx;
                    if pixels[n] != 0 && labels[n] == 0 {
                        labels[n] = label;
                        stack.push(n);
                    }
                }
            }
        }
        blobs.push(acc.into_blob(label));
    }
    blobs
}

/// The largest component, ties going to the lowest label. `None` when the
/// mask holds no foreground at all.
pub fn largest_blob(mask: &Mask) -> Option<Blob> {
    label_components(mask)
        .into_iter()
        .fold(None, |best: Option<Blob>, blob| match best {
            Some(b) if b.area >= blob.area => Some(b),
            _ => Some(blob),
        })
}
