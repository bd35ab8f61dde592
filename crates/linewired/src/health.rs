//! Structured health reporting for server lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use linewire_config::Config;

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the engine accepts connections.
    fn engine_started(&self, address: Option<SocketAddr>);

    /// Invoked when the engine is about to stop.
    fn engine_stopping(&self, reason: StopReason);
}

/// Why the server is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A termination signal arrived.
    Signal,
    /// A client sent `quit`.
    Quit,
}

impl StopReason {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Signal => "signal",
            Self::Quit => "quit",
        }
    }
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn engine_started(&self, address: Option<SocketAddr>) {
        (**self).engine_started(address);
    }

    fn engine_stopping(&self, reason: StopReason) {
        (**self).engine_stopping(reason);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting server bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            host = %config.host,
            port = config.port,
            read_mode = %config.read_mode,
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "server bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "server bootstrap failed"
        );
    }

    fn engine_started(&self, address: Option<SocketAddr>) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "engine_started",
            address = ?address,
            "command engine accepting connections"
        );
    }

    fn engine_stopping(&self, reason: StopReason) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "engine_stopping",
            reason = reason.as_str(),
            "command engine stopping"
        );
    }
}
