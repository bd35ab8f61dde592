//! Tuning knobs for the transport driver and command queue.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::defaults::{
    DEFAULT_BUFFER_WARN_THRESHOLD, DEFAULT_QUEUE_WARN_THRESHOLD, DEFAULT_READ_BLOCK_SIZE,
    DEFAULT_RECEIVE_TIMEOUT_MS,
};

/// How the transport driver pulls bytes off the socket.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ReadMode {
    /// Byte-at-a-time reads that stop at a line terminator.
    Line,
    /// Opportunistic reads of whatever the socket has buffered.
    #[default]
    Block,
}

/// Errors encountered while parsing a [`ReadMode`] from text.
pub type ReadModeParseError = strum::ParseError;

/// Transport settings carried by the engine configuration.
///
/// Every field has a default, so an absent `transport` object (or any absent
/// key within it) falls back to the values below.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Read strategy used while connected.
    pub read_mode: ReadMode,
    /// Idle window for a single receive, in milliseconds.
    pub receive_timeout_ms: u64,
    /// Scratch buffer size for block reads (and line length cap).
    pub read_block_size: usize,
    /// Whether a remote hang-up ends the current read immediately.
    pub stop_on_disconnect: bool,
    /// Maximum queued frames; `None` leaves the queue unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_capacity: Option<usize>,
    /// Queue depth that triggers a backlog warning.
    pub queue_warn_threshold: usize,
    /// Pending partial-line size that triggers a buffer warning.
    pub buffer_warn_threshold: usize,
}

impl TransportSettings {
    /// Receive timeout as a [`Duration`].
    #[must_use]
    pub const fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            read_mode: ReadMode::default(),
            receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT_MS,
            read_block_size: DEFAULT_READ_BLOCK_SIZE,
            stop_on_disconnect: true,
            queue_capacity: None,
            queue_warn_threshold: DEFAULT_QUEUE_WARN_THRESHOLD,
            buffer_warn_threshold: DEFAULT_BUFFER_WARN_THRESHOLD,
        }
    }
}
