//! FIFO hand-off of frames from the transport thread to the dispatch loop.

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::channel::{self, Receiver, Sender, TryRecvError, TrySendError};
use thiserror::Error;
use tracing::warn;

use super::DISPATCH_TARGET;
use crate::transport::Frame;

/// Errors returned when a frame cannot be queued.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// A bounded queue is at capacity.
    #[error("command queue is full ({capacity} frames)")]
    Full {
        /// Configured capacity.
        capacity: usize,
    },
    /// The consuming side has gone away.
    #[error("command queue is closed")]
    Closed,
}

/// Thread-safe FIFO of pending frames.
///
/// Push and pop are each a single channel operation, so a pop never observes
/// a half-inserted frame and an empty queue is reported without blocking.
#[derive(Debug)]
pub struct CommandQueue {
    sender: Sender<Frame>,
    receiver: Receiver<Frame>,
    capacity: Option<usize>,
    warn_threshold: usize,
    warned: AtomicBool,
}

impl CommandQueue {
    /// Creates a queue; `None` capacity means unbounded.
    #[must_use]
    pub fn new(capacity: Option<usize>, warn_threshold: usize) -> Self {
        let (sender, receiver) = match capacity {
            Some(capacity) => channel::bounded(capacity),
            None => channel::unbounded(),
        };
        Self {
            sender,
            receiver,
            capacity,
            warn_threshold,
            warned: AtomicBool::new(false),
        }
    }

    /// Appends `frame`.
    pub fn push(&self, frame: Frame) -> Result<(), QueueError> {
        match self.sender.try_send(frame) {
            Ok(()) => {
                self.check_depth();
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(QueueError::Full {
                capacity: self.capacity.unwrap_or_default(),
            }),
            Err(TrySendError::Disconnected(_)) => Err(QueueError::Closed),
        }
    }

    /// Removes the oldest frame, or returns `None` immediately when empty.
    pub fn pop(&self) -> Option<Frame> {
        match self.receiver.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => {
                self.warned.store(false, Ordering::SeqCst);
                None
            }
        }
    }

    /// Frames currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether no frames are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    fn check_depth(&self) {
        let depth = self.len();
        if depth > self.warn_threshold && !self.warned.swap(true, Ordering::SeqCst) {
            warn!(
                target: DISPATCH_TARGET,
                depth,
                threshold = self.warn_threshold,
                "command queue backlog exceeds threshold"
            );
        }
    }
}
