//! The consume, decode, route and respond cycle.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::handler::{LogSink, MethodHandler};
use super::queue::CommandQueue;
use super::request::Request;
use super::response::{Response, ResponseId};
use super::router::MethodTable;
use crate::transport::{Frame, ResponseSink};

/// Pops frames, routes them and writes one response per frame.
pub struct Dispatcher {
    queue: Arc<CommandQueue>,
    methods: RwLock<MethodTable>,
    running: Arc<AtomicBool>,
    sink: Arc<dyn ResponseSink>,
}

impl Dispatcher {
    /// Creates a dispatcher over `queue` that answers through `sink`.
    ///
    /// Frames are only processed while `running` is set.
    pub fn new(
        queue: Arc<CommandQueue>,
        sink: Arc<dyn ResponseSink>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            queue,
            methods: RwLock::new(MethodTable::default()),
            running,
            sink,
        }
    }

    /// Registers `handler` under `name`, replacing any handler of that name.
    pub fn register(&self, name: impl Into<String>, handler: Arc<dyn MethodHandler>) {
        self.methods
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(name, handler);
    }

    /// Processes at most one queued frame.
    ///
    /// Returns `false` without touching the queue when not running, and
    /// `false` when the queue is empty.
    pub fn do_work(&self) -> bool {
        if !self.running.load(Ordering::SeqCst) {
            return false;
        }
        let Some(frame) = self.queue.pop() else {
            return false;
        };
        let response = self.process(&frame);
        self.respond(&response);
        true
    }

    /// Builds the response for one frame.
    pub fn process(&self, frame: &Frame) -> Response {
        let request = match Request::decode(frame.as_bytes()) {
            Ok(request) => request,
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    error = %error,
                    bytes = frame.len(),
                    "could not decode request"
                );
                return Response::failure(ResponseId::Unknown, error.error_code())
                    .with_log(error.to_string());
            }
        };

        let mut log = LogSink::default();
        for note in request.notes() {
            log.push(note.clone());
        }
        let mut response = match self.route(&request, &mut log) {
            Ok(response) => response,
            Err(error) => {
                debug!(
                    target: DISPATCH_TARGET,
                    id = request.id(),
                    error = %error,
                    "request failed"
                );
                log.push(error.to_string());
                Response::failure(ResponseId::Number(request.id()), error.error_code())
            }
        };
        response.set_id(ResponseId::Number(request.id()));
        response.extend_log(log.into_lines());
        response
    }

    fn route(&self, request: &Request, log: &mut LogSink) -> Result<Response, DispatchError> {
        let method = request.method().ok_or(DispatchError::MissingMethod)?;
        let (name, handler) = {
            let methods = self.methods.read().unwrap_or_else(PoisonError::into_inner);
            let (name, handler) = methods
                .resolve(method)
                .ok_or_else(|| DispatchError::handler_not_found(method))?;
            (name.to_owned(), handler)
        };
        debug!(
            target: DISPATCH_TARGET,
            id = request.id(),
            method,
            handler = %name,
            "dispatching request"
        );
        match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(request, log))) {
            Ok(Ok(Some(response))) => Ok(response),
            Ok(Ok(None)) => Err(DispatchError::handler_not_found(method)),
            Ok(Err(error)) => Err(DispatchError::handler_failed(name, error.message())),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(
                    target: DISPATCH_TARGET,
                    handler = %name,
                    panic = %message,
                    "method handler panicked"
                );
                Err(DispatchError::handler_failed(name, message))
            }
        }
    }

    fn respond(&self, response: &Response) {
        let line = match response.encode_line() {
            Ok(line) => line,
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    error = %error,
                    "failed to serialize response"
                );
                return;
            }
        };
        if let Err(error) = self.sink.send(&line) {
            warn!(
                target: DISPATCH_TARGET,
                error = %error,
                "failed to write response"
            );
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("queued", &self.queue.len())
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_owned();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    String::from("handler panicked")
}
