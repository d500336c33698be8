//! Frame sources - everything that hands RGB frames to the control loop

pub mod sequence;

use std::collections::VecDeque;

use image::imageops;

use crate::config::Orientation;
use crate::error::FrameError;
use crate::vision::Frame;

pub use sequence::ImageSequence;

/// Produces frames of a fixed size. May block; that blocking is the only
/// suspension point of a tick.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Frame, FrameError>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn next_frame(&mut self) -> Result<Frame, FrameError> {
        (**self).next_frame()
    }
}

// ============================================================================
// ORIENTED SOURCE - fixed flip/rotation for the camera mounting
// ============================================================================

pub struct OrientedSource<S> {
    inner: S,
    orientation: Orientation,
}

impl<S: FrameSource> OrientedSource<S> {
    pub fn new(inner: S, orientation: Orientation) -> Self {
        Self { inner, orientation }
    }
}

pub fn orient(frame: Frame, orientation: Orientation) -> Result<Frame, FrameError> {
    let image = match orientation {
        Orientation::Upright => return Ok(frame),
        Orientation::FlipVertical => imageops::flip_vertical(frame.image()),
        Orientation::FlipHorizontal => imageops::flip_horizontal(frame.image()),
        Orientation::Rotate180 => imageops::rotate180(frame.image()),
    };
    frame.with_image(image)
}

impl<S: FrameSource> FrameSource for OrientedSource<S> {
    fn next_frame(&mut self) -> Result<Frame, FrameError> {
        let frame = self.inner.next_frame()?;
        orient(frame, self.orientation)
    }
}

// ============================================================================
// SCRIPTED SOURCE - replays a fixed list of outcomes, then disconnects
// ============================================================================

#[derive(Default)]
pub struct ScriptedSource {
    script: VecDeque<Result<Frame, FrameError>>,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = Result<Frame, FrameError>>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Frame, FrameError> {
        self.script.pop_front().unwrap_or(Err(FrameError::Disconnected))
    }
}
