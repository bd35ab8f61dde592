//! Error types for request dispatch and engine lifecycle failures.
//!
//! Dispatch failures never escape the dispatch loop: each one is converted
//! into an error response carrying the stable wire code from [`ErrorCode`].
//! Engine failures are process-level and surface to the caller of `init`,
//! `start` or `stop`.

use std::io;

use thiserror::Error;

use linewire_config::EngineConfigError;

use crate::transport::{ConnectError, TransportError};

/// Stable error codes reported in `result.error_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The handler failed or panicked.
    HandlerFailed,
    /// The request carried no `method` string.
    MissingMethod,
    /// The frame was not a JSON object.
    DecodeFailure,
    /// No handler accepted the method.
    HandlerNotFound,
}

impl ErrorCode {
    /// Numeric wire value.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::HandlerFailed => -991,
            Self::MissingMethod => -992,
            Self::DecodeFailure => -993,
            Self::HandlerNotFound => -994,
        }
    }

    /// Short human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::HandlerFailed => "error in method handler",
            Self::MissingMethod => "no method listed in request",
            Self::DecodeFailure => "invalid request; could not parse",
            Self::HandlerNotFound => "no handler for method",
        }
    }
}

/// Errors surfaced while decoding and routing a single request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The frame could not be decoded as a JSON object.
    #[error("malformed request: {message}")]
    Malformed {
        /// Description of the decode failure.
        message: String,
        /// Underlying JSON error, when there is one.
        #[source]
        source: Option<serde_json::Error>,
    },
    /// The request has no string `method`.
    #[error("no method listed in request")]
    MissingMethod,
    /// No registered handler accepted the method.
    #[error("no handler for method '{method}'")]
    HandlerNotFound {
        /// Requested method.
        method: String,
    },
    /// The handler reported a failure or panicked.
    #[error("handler '{handler}' failed: {message}")]
    HandlerFailed {
        /// Name the handler was registered under.
        handler: String,
        /// Failure description.
        message: String,
    },
}

impl DispatchError {
    /// Wire code reported for this failure.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Malformed { .. } => ErrorCode::DecodeFailure,
            Self::MissingMethod => ErrorCode::MissingMethod,
            Self::HandlerNotFound { .. } => ErrorCode::HandlerNotFound,
            Self::HandlerFailed { .. } => ErrorCode::HandlerFailed,
        }
    }

    /// Creates a malformed-request error from a serde error.
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::Malformed {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed-request error with a custom message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a handler-not-found error.
    pub fn handler_not_found(method: impl Into<String>) -> Self {
        Self::HandlerNotFound {
            method: method.into(),
        }
    }

    /// Creates a handler-failed error.
    pub fn handler_failed(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HandlerFailed {
            handler: handler.into(),
            message: message.into(),
        }
    }
}

/// Failure reported by a method handler.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Creates a handler error with the given description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Failure description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors surfaced by the command engine lifecycle.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine configuration was rejected.
    #[error("invalid engine configuration: {source}")]
    Config {
        /// Underlying validation error.
        #[from]
        source: EngineConfigError,
    },
    /// The server endpoint could not be opened.
    #[error("failed to open command endpoint: {source}")]
    Connect {
        /// Underlying socket error.
        #[source]
        source: ConnectError,
    },
    /// The transport driver failed.
    #[error("transport driver failed: {source}")]
    Transport {
        /// Underlying driver error.
        #[source]
        source: TransportError,
    },
    /// The dispatch thread could not be spawned.
    #[error("failed to spawn dispatch thread: {source}")]
    Spawn {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The dispatch thread panicked.
    #[error("dispatch thread panicked")]
    ThreadPanic,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorCode::HandlerFailed, -991)]
    #[case(ErrorCode::MissingMethod, -992)]
    #[case(ErrorCode::DecodeFailure, -993)]
    #[case(ErrorCode::HandlerNotFound, -994)]
    fn wire_codes_are_stable(#[case] code: ErrorCode, #[case] expected: i64) {
        assert_eq!(code.code(), expected);
    }

    #[test]
    fn dispatch_errors_map_to_codes() {
        assert_eq!(
            DispatchError::malformed("x").error_code(),
            ErrorCode::DecodeFailure
        );
        assert_eq!(
            DispatchError::handler_not_found("x").error_code(),
            ErrorCode::HandlerNotFound
        );
        assert_eq!(
            DispatchError::handler_failed("x", "boom").error_code(),
            ErrorCode::HandlerFailed
        );
    }
}
