//! Shared configuration for the linewire daemon and client.
//!
//! [`Config`] is the layered process configuration resolved by
//! [`ortho_config`]: built-in defaults, then a TOML file selected with
//! `--config-path`, then `LINEWIRE_*` environment variables, then CLI flags.
//! [`EngineConfig`] is the JSON document handed to the command engine; the
//! daemon derives one from its [`Config`], while embedders may build one by
//! hand or decode it from JSON.

mod defaults;
mod engine;
mod logging;
mod transport;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_BUFFER_WARN_THRESHOLD, DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_PORT,
    DEFAULT_QUEUE_WARN_THRESHOLD, DEFAULT_READ_BLOCK_SIZE, DEFAULT_RECEIVE_TIMEOUT_MS,
    default_host, default_log_filter, default_log_filter_string, default_log_format,
    default_read_mode,
};
pub use engine::{EngineConfig, EngineConfigError, EngineSettings};
pub use logging::LogFormat;
pub use transport::{ReadMode, ReadModeParseError, TransportSettings};

/// Process configuration for the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "LINEWIRE")]
pub struct Config {
    /// Address the server endpoint binds to.
    #[ortho_config(default = default_host())]
    pub host: String,
    /// Port the server endpoint binds to.
    #[ortho_config(default = DEFAULT_PORT)]
    pub port: u16,
    /// Whether a `quit` request stops the daemon.
    #[ortho_config(default = true)]
    pub exit_on_quit: bool,
    /// Socket read strategy.
    #[ortho_config(default = default_read_mode())]
    pub read_mode: ReadMode,
    /// Idle window for a single receive, in milliseconds.
    #[ortho_config(default = DEFAULT_RECEIVE_TIMEOUT_MS)]
    pub receive_timeout_ms: u64,
    /// Scratch buffer size for block reads.
    #[ortho_config(default = DEFAULT_READ_BLOCK_SIZE)]
    pub read_block_size: usize,
    /// Whether a remote hang-up ends the current read immediately.
    #[ortho_config(default = true)]
    pub stop_on_disconnect: bool,
    /// Maximum queued frames; unbounded when unset.
    pub queue_capacity: Option<usize>,
    /// Queue depth that triggers a backlog warning.
    #[ortho_config(default = DEFAULT_QUEUE_WARN_THRESHOLD)]
    pub queue_warn_threshold: usize,
    /// Pending partial-line size that triggers a buffer warning.
    #[ortho_config(default = DEFAULT_BUFFER_WARN_THRESHOLD)]
    pub buffer_warn_threshold: usize,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        let transport = TransportSettings::default();
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
            exit_on_quit: true,
            read_mode: transport.read_mode,
            receive_timeout_ms: transport.receive_timeout_ms,
            read_block_size: transport.read_block_size,
            stop_on_disconnect: transport.stop_on_disconnect,
            queue_capacity: transport.queue_capacity,
            queue_warn_threshold: transport.queue_warn_threshold,
            buffer_warn_threshold: transport.buffer_warn_threshold,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Filter expression handed to the tracing subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format for the tracing subscriber.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Transport settings assembled from the flat process options.
    #[must_use]
    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            read_mode: self.read_mode,
            receive_timeout_ms: self.receive_timeout_ms,
            read_block_size: self.read_block_size,
            stop_on_disconnect: self.stop_on_disconnect,
            queue_capacity: self.queue_capacity,
            queue_warn_threshold: self.queue_warn_threshold,
            buffer_warn_threshold: self.buffer_warn_threshold,
        }
    }

    /// Engine configuration equivalent to this process configuration.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            ip_address: Some(self.host.clone()),
            port: Some(i64::from(self.port)),
            exit_on_quit: Some(self.exit_on_quit),
            transport: self.transport_settings(),
        }
    }
}
