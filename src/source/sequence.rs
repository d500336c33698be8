use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use tracing::warn;

use super::FrameSource;
use crate::error::FrameError;
use crate::vision::Frame;

const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Replays still images from a directory in file-name order, resized to the
/// tracker's frame size. Disconnects after the last file unless looping.
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    index: usize,
    width: u32,
    height: u32,
    looping: bool,
    sequence_id: u64,
}

impl ImageSequence {
    pub fn open(dir: impl AsRef<Path>, width: u32, height: u32, looping: bool) -> std::io::Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();
        if paths.is_empty() {
            warn!(dir = %dir.as_ref().display(), "no images found");
        }
        Ok(Self {
            paths,
            index: 0,
            width,
            height,
            looping,
            sequence_id: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Frame, FrameError> {
        if self.index >= self.paths.len() {
            if !self.looping || self.paths.is_empty() {
                return Err(FrameError::Disconnected);
            }
            self.index = 0;
        }
        let path = &self.paths[self.index];
        self.index += 1;
        self.sequence_id += 1;

        let image = image::open(path)
            .map_err(|e| FrameError::Decode(format!("{}: {e}", path.display())))?
            .to_rgb8();
        let image = if image.dimensions() == (self.width, self.height) {
            image
        } else {
            imageops::resize(&image, self.width, self.height, FilterType::Triangle)
        };
        Frame::new(image, self.sequence_id)
    }
}
