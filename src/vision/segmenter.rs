//! Red-target segmentation.
//!
//! The steps run in a fixed order: Gaussian blur, RGB to HSV, two hue windows
//! OR-ed together, then opening followed by closing. Red sits at both ends of
//! the 0..=179 hue scale, hence the two windows.

use image::RgbImage;

use super::frame::{Frame, Mask, FOREGROUND};
use crate::config::SegmenterConfig;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    /// Half-degree hue, 0..=179.
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

/// 8-bit RGB to HSV with hue on the half-degree scale.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = (max - min) as f32;

    let s = if max == 0 {
        0
    } else {
        (255.0 * diff / max as f32).round() as u8
    };

    let h = if diff == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g as f32 - b as f32) / diff
    } else if max == g {
        120.0 + 60.0 * (b as f32 - r as f32) / diff
    } else {
        240.0 + 60.0 * (r as f32 - g as f32) / diff
    };
    let h = if h < 0.0 { h + 360.0 } else { h };
    let h = (h / 2.0).round() as u16 % 180;

    Hsv { h: h as u8, s, v: max }
}

pub struct Segmenter {
    cfg: SegmenterConfig,
    blur_weights: Vec<f32>,
}

impl Segmenter {
    pub fn new(cfg: SegmenterConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let blur_weights = gaussian_kernel(cfg.blur_kernel as usize);
        Ok(Self { cfg, blur_weights })
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.cfg
    }

    /// Whether a pixel with this color counts as target.
    pub fn classify(&self, hsv: Hsv) -> bool {
        hsv.s >= self.cfg.min_saturation
            && hsv.v >= self.cfg.min_value
            && (self.cfg.low_hue.contains(hsv.h) || self.cfg.high_hue.contains(hsv.h))
    }

    pub fn segment(&self, frame: &Frame) -> Mask {
        let blurred = gaussian_blur(frame.image(), &self.blur_weights);
        let (width, height) = blurred.dimensions();

        let mut low = vec![0u8; (width * height) as usize];
        let mut high = vec![0u8; (width * height) as usize];
        for (i, px) in blurred.pixels().enumerate() {
            let [r, g, b] = px.0;
            let hsv = rgb_to_hsv(r, g, b);
            if hsv.s < self.cfg.min_saturation || hsv.v < self.cfg.min_value {
                continue;
            }
            if self.cfg.low_hue.contains(hsv.h) {
                low[i] = FOREGROUND;
            }
            if self.cfg.high_hue.contains(hsv.h) {
                high[i] = FOREGROUND;
            }
        }
        let combined: Vec<u8> = low.iter().zip(&high).map(|(a, b)| a | b).collect();

        let k = self.cfg.morph_kernel as usize;
        let (w, h) = (width as usize, height as usize);
        let opened = dilate(&erode(&combined, w, h, k), w, h, k);
        let closed = erode(&dilate(&opened, w, h, k), w, h, k);

        Mask::from_raw_unchecked(width, height, closed)
    }
}

// ============================================================================
// BLUR
// ============================================================================

/// Normalized 1-D Gaussian of odd size `k`, sigma derived from `k`.
fn gaussian_kernel(k: usize) -> Vec<f32> {
    let sigma = 0.3 * ((k as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (k / 2) as isize;
    let raw: Vec<f32> = (-half..=half)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = raw.iter().sum();
    raw.into_iter().map(|w| w / sum).collect()
}

/// Reflect-101 border: `dcb|abcd|cba`.
fn reflect101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let n = n as isize;
    let mut i = i;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - 2 - i;
        } else {
            return i as usize;
        }
    }
}

fn gaussian_blur(src: &RgbImage, weights: &[f32]) -> RgbImage {
    let (width, height) = src.dimensions();
    let (w, h) = (width as usize, height as usize);
    let half = (weights.len() / 2) as isize;
    let raw = src.as_raw();

    let mut horizontal = vec![0f32; w * h * 3];
    for y in 0..h {
        for x in 0..w {
            for c in 0..3 {
                let mut acc = 0.0;
                for (j, wt) in weights.iter().enumerate() {
                    let sx = reflect101(x as isize + j as isize - half, w);
                    acc += wt * raw[(y * w + sx) * 3 + c] as f32;
                }
                horizontal[(y * w + x) * 3 + c] = acc;
            }
        }
    }

    let mut out = vec![0u8; w * h * 3];
    for y in 0..h {
        for x in 0..w {
            for c in 0..3 {
                let mut acc = 0.0;
                for (j, wt) in weights.iter().enumerate() {
                    let sy = reflect101(y as isize + j as isize - half, h);
                    acc += wt * horizontal[(sy * w + x) * 3 + c];
                }
                out[(y * w + x) * 3 + c] = acc.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    RgbImage::from_raw(width, height, out).unwrap_or_else(|| src.clone())
}

// ============================================================================
// MORPHOLOGY - square structuring element, out-of-image neighbours ignored
// ============================================================================

fn erode(src: &[u8], w: usize, h: usize, k: usize) -> Vec<u8> {
    morph(src, w, h, k, true)
}

fn dilate(src: &[u8], w: usize, h: usize, k: usize) -> Vec<u8> {
    morph(src, w, h, k, false)
}

/// Erosion keeps a pixel when its whole window is set, dilation when any is.
fn morph(src: &[u8], w: usize, h: usize, k: usize, erode: bool) -> Vec<u8> {
    let half = k / 2;
    let mut out = vec![0u8; w * h];
    for y in 0..h {
        let (y0, y1) = (y.saturating_sub(half), (y + half).min(h - 1));
        for x in 0..w {
            let (x0, x1) = (x.saturating_sub(half), (x + half).min(w - 1));
            let mut window = (y0..=y1).flat_map(|yy| (x0..=x1).map(move |xx| src[yy * w + xx]));
            let keep = if erode {
                window.all(|p| p != 0)
            } else {
                window.any(|p| p != 0)
            };
            if keep {
                out[y * w + x] = FOREGROUND;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let k = gaussian_kernel(5);
        assert_eq!(k.len(), 5);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert_eq!(k[0], k[4]);
        assert!(k[2] > k[1] && k[1] > k[0]);
    }

    #[test]
    fn reflect101_mirrors_without_repeating_edge() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(-2, 5), 2);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(6, 5), 2);
        assert_eq!(reflect101(3, 1), 0);
    }

    #[test]
    fn opening_removes_isolated_pixel() {
        let (w, h) = (7, 7);
        let mut src = vec![0u8; w * h];
        src[3 * w + 3] = FOREGROUND;
        let opened = dilate(&erode(&src, w, h, 3), w, h, 3);
        assert!(opened.iter().all(|&p| p == 0));
    }

    #[test]
    fn closing_fills_single_hole() {
        let (w, h) = (7, 7);
        let mut src = vec![FOREGROUND; w * h];
        src[3 * w + 3] = 0;
        let closed = erode(&dilate(&src, w, h, 3), w, h, 3);
        assert_eq!(closed[3 * w + 3], FOREGROUND);
    }

    #[test]
    fn greys_have_zero_saturation() {
        assert_eq!(rgb_to_hsv(90, 90, 90), Hsv { h: 0, s: 0, v: 90 });
        assert_eq!(rgb_to_hsv(0, 0, 0), Hsv { h: 0, s: 0, v: 0 });
    }
}
