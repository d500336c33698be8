use std::time::Instant;

use image::{GrayImage, Luma, RgbImage};

use crate::error::FrameError;

// ============================================================================
// FRAME - One RGB image from the source
// ============================================================================

#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
    sequence_id: u64,
    captured_at: Instant,
}

impl Frame {
    pub fn new(image: RgbImage, sequence_id: u64) -> Result<Self, FrameError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(FrameError::Empty { width, height });
        }
        Ok(Self {
            image,
            sequence_id,
            captured_at: Instant::now(),
        })
    }

    /// Build a frame from packed RGB8 bytes, row-major.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>, sequence_id: u64) -> Result<Self, FrameError> {
        let len = data.len();
        let image = RgbImage::from_raw(width, height, data)
            .ok_or(FrameError::BadBuffer { width, height, len })?;
        Self::new(image, sequence_id)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn sequence_id(&self) -> u64 {
        self.sequence_id
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Same sequence id and capture time, new pixels.
    pub fn with_image(&self, image: RgbImage) -> Result<Self, FrameError> {
        let mut frame = Self::new(image, self.sequence_id)?;
        frame.captured_at = self.captured_at;
        Ok(frame)
    }
}

// ============================================================================
// MASK - Binary {0, 255} image, same size as the frame it came from
// ============================================================================

pub const FOREGROUND: u8 = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    image: GrayImage,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        self.image.put_pixel(x, y, Luma([if on { FOREGROUND } else { 0 }]));
    }

    /// Fill the inclusive-exclusive rectangle `[x0, x1) x [y0, y1)`.
    pub fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0..y1.min(self.height()) {
            for x in x0..x1.min(self.width()) {
                self.set(x, y, true);
            }
        }
    }

    pub fn count(&self) -> usize {
        self.image.pixels().filter(|p| p.0[0] != 0).count()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }

    pub(crate) fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub(crate) fn from_raw_unchecked(width: u32, height: u32, data: Vec<u8>) -> Self {
        // Callers only ever pass buffers of exactly width * height bytes.
        let image = GrayImage::from_raw(width, height, data)
            .unwrap_or_else(|| GrayImage::new(width, height));
        Self { image }
    }
}
