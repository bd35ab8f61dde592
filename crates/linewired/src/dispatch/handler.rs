//! Method handler registration surface.

use tracing::debug;

use super::DISPATCH_TARGET;
use super::errors::HandlerError;
use super::request::Request;
use super::response::Response;

/// Outcome of a handler call. `Ok(None)` means the handler has no opinion
/// about the request and is reported as "handler not found".
pub type HandlerResult = Result<Option<Response>, HandlerError>;

/// Handles requests routed to a registered method name.
pub trait MethodHandler: Send + Sync + 'static {
    /// Handles one request. Lines pushed to `log` are returned to the client
    /// in `log_msgs`.
    fn handle(&self, request: &Request, log: &mut LogSink) -> HandlerResult;
}

impl<F> MethodHandler for F
where
    F: Fn(&Request, &mut LogSink) -> HandlerResult + Send + Sync + 'static,
{
    fn handle(&self, request: &Request, log: &mut LogSink) -> HandlerResult {
        self(request, log)
    }
}

/// Collects log lines produced while handling one request.
#[derive(Debug, Default)]
pub struct LogSink {
    lines: Vec<String>,
}

impl LogSink {
    /// Records a line for the response and mirrors it to the tracing log.
    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        debug!(target: DISPATCH_TARGET, line = %line, "handler log");
        self.lines.push(line);
    }

    /// Lines recorded so far.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Whether no lines were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Consumes the sink, returning its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}
