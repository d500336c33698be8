//! Vision module - frame/mask types, color segmentation and blob selection

pub mod blob;
pub mod frame;
pub mod segmenter;

pub use blob::{largest_blob, label_components, Blob, BoundingBox};
pub use frame::{Frame, Mask};
pub use segmenter::{rgb_to_hsv, Hsv, Segmenter};
