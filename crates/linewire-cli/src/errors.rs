//! Error types for the CLI runtime.

use std::io;

use thiserror::Error;

use linewired::transport::{ConnectError, ReadError, WriteError};

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to connect to server: {0}")]
    Connect(#[source] ConnectError),
    #[error("failed to serialise request: {0}")]
    SerialiseRequest(#[source] serde_json::Error),
    #[error("failed to send request: {0}")]
    SendRequest(#[source] WriteError),
    #[error("failed to read response: {0}")]
    ReadResponse(#[source] ReadError),
    #[error("response exceeds {limit} bytes")]
    ResponseTooLong { limit: usize },
    #[error("no response within {timeout_ms} ms")]
    NoResponse { timeout_ms: u128 },
    #[error("failed to parse server response: {0}")]
    ParseResponse(#[source] serde_json::Error),
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] io::Error),
}
