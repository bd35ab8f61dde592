//! Command engine: request decoding, method routing and response encoding.
//!
//! Frames arrive from the transport driver on its own thread and are pushed
//! onto a [`CommandQueue`]. The dispatch loop pops one frame per pass, decodes
//! it as a JSON object, resolves a handler from the [`MethodTable`] and writes
//! exactly one newline-terminated [`Response`] back to the connected client.
//! Failures never escape the loop; they become error responses carrying an
//! [`ErrorCode`].

mod builtins;
mod dispatcher;
#[cfg(test)]
mod dispatcher_tests;
mod engine;
mod errors;
mod handler;
mod queue;
mod request;
mod response;
mod router;
mod snapshot;

pub use self::dispatcher::Dispatcher;
pub use self::engine::CommandEngine;
pub use self::errors::{DispatchError, EngineError, ErrorCode, HandlerError};
pub use self::handler::{HandlerResult, LogSink, MethodHandler};
pub use self::queue::{CommandQueue, QueueError};
pub use self::request::{MISSING_ID, Params, Request};
pub use self::response::{Response, ResponseId};
pub use self::router::MethodTable;
pub use self::snapshot::{ResultPublisher, SnapshotCell};

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
