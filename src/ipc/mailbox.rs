use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::error::FrameError;
use crate::source::FrameSource;
use crate::vision::Frame;

/// Depth-1 channel with overwrite-on-full: the consumer only ever sees the
/// newest frame, stale ones are dropped instead of queued.
///
/// Dropping the publisher disconnects the consumer once the last frame has
/// been taken.
pub fn latest_frame_mailbox(timeout: Duration) -> (FramePublisher, MailboxSource) {
    let (tx, rx) = bounded(1);
    let dropped = Arc::new(AtomicU64::new(0));
    let publisher = FramePublisher {
        tx,
        evict: rx.clone(),
        dropped: dropped.clone(),
    };
    let source = MailboxSource { rx, timeout, dropped };
    (publisher, source)
}

pub struct FramePublisher {
    tx: Sender<Frame>,
    evict: Receiver<Frame>,
    dropped: Arc<AtomicU64>,
}

impl FramePublisher {
    /// Publish `frame`, evicting an unread one.
    pub fn publish(&self, frame: Frame) {
        let mut frame = frame;
        loop {
            match self.tx.try_send(frame) {
                Ok(()) => return,
                Err(TrySendError::Full(back)) => {
                    if self.evict.try_recv().is_ok() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    frame = back;
                }
                // Unreachable while `evict` keeps a receiver alive.
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer end of the mailbox, usable wherever a [`FrameSource`] is.
pub struct MailboxSource {
    rx: Receiver<Frame>,
    timeout: Duration,
    dropped: Arc<AtomicU64>,
}

impl MailboxSource {
    /// Frames overwritten before the consumer got to them.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl FrameSource for MailboxSource {
    fn next_frame(&mut self) -> Result<Frame, FrameError> {
        match self.rx.recv_timeout(self.timeout) {
            Ok(frame) => Ok(frame),
            Err(RecvTimeoutError::Timeout) => Err(FrameError::Timeout(self.timeout.as_millis() as u64)),
            Err(RecvTimeoutError::Disconnected) => Err(FrameError::Disconnected),
        }
    }
}
