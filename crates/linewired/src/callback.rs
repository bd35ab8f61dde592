//! Frame delivery seam between the transport driver and its consumer.
//!
//! The driver hands every extracted frame to exactly one registered
//! [`FrameHandler`] together with a monotonically increasing invocation id.
//! Closures of the right shape implement the trait directly, so registering a
//! queue push is a one-liner.

use std::sync::{Arc, PoisonError, RwLock};

use crate::transport::Frame;

/// Sequence number assigned to each handler invocation.
pub type InvocationId = u64;

/// Consumer of frames extracted by the transport driver.
pub trait FrameHandler: Send + Sync + 'static {
    /// Receives one frame. Returns `false` when the frame was not accepted.
    fn on_frame(&self, invocation: InvocationId, frame: Frame) -> bool;
}

impl<F> FrameHandler for F
where
    F: Fn(InvocationId, Frame) -> bool + Send + Sync + 'static,
{
    fn on_frame(&self, invocation: InvocationId, frame: Frame) -> bool {
        self(invocation, frame)
    }
}

/// Shared slot holding the currently registered handler.
///
/// Registration replaces any earlier handler; the transport thread clones the
/// `Arc` out before invoking it so the lock is never held across a callback.
#[derive(Default)]
pub struct HandlerSlot {
    handler: RwLock<Option<Arc<dyn FrameHandler>>>,
}

impl HandlerSlot {
    /// Installs `handler`, returning `true` when it replaced an earlier one.
    pub fn replace(&self, handler: Arc<dyn FrameHandler>) -> bool {
        let mut slot = self
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        slot.replace(handler).is_some()
    }

    /// Returns the registered handler, if any.
    #[must_use]
    pub fn current(&self) -> Option<Arc<dyn FrameHandler>> {
        self.handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Delivers `frame` to the registered handler.
    ///
    /// Returns `None` when no handler is registered.
    pub fn invoke(&self, invocation: InvocationId, frame: Frame) -> Option<bool> {
        self.current().map(|handler| handler.on_frame(invocation, frame))
    }
}

impl std::fmt::Debug for HandlerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerSlot")
            .field("registered", &self.current().is_some())
            .finish()
    }
}
