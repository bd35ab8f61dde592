//! Built-in defaults shared by the daemon, the client and the engine
//! configuration.

use crate::logging::LogFormat;
use crate::transport::ReadMode;

/// Address the daemon listens on when nothing else is configured.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Port the daemon listens on and the client connects to by default.
pub const DEFAULT_PORT: u16 = 12070;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Idle window for a single receive before the driver yields.
pub const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 1000;

/// Size of the scratch buffer used for block reads.
pub const DEFAULT_READ_BLOCK_SIZE: usize = 32_768;

/// Queue depth above which the engine logs a backlog warning.
pub const DEFAULT_QUEUE_WARN_THRESHOLD: usize = 1024;

/// Pending partial-line size above which the driver logs a warning.
pub const DEFAULT_BUFFER_WARN_THRESHOLD: usize = 1024 * 1024;

/// Default log filter expression used by the binaries.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Owned listen address used where allocation is required.
#[must_use]
pub fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

/// Default socket read strategy.
#[must_use]
pub fn default_read_mode() -> ReadMode {
    ReadMode::Block
}
