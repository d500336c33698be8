//! IPC module - frame hand-off between threads and the shared overlay slot

pub mod mailbox;
pub mod overlay;

pub use mailbox::{latest_frame_mailbox, FramePublisher, MailboxSource};
pub use overlay::{Overlay, OverlaySlot};
