//! Single-client JSON command server over TCP.
//!
//! The server listens on one TCP port and talks to at most one client at a
//! time. Requests are newline-delimited JSON objects of the form
//! `{"id": 1, "method": "status", "params": {...}}`; every request receives
//! exactly one newline-terminated response
//! `{"id": 1, "result": {"success": true, ...}, "log_msgs": [...]}`.
//!
//! The crate is layered bottom-up:
//!
//! - [`transport::Endpoint`] owns the sockets and tracks the
//!   [`transport::ConnectionState`] machine.
//! - [`transport::TransportDriver`] runs a background loop that keeps the
//!   endpoint connected and splits the byte stream into frames.
//! - [`FrameHandler`] is the seam between the driver and its consumer.
//! - [`dispatch::CommandEngine`] queues frames, routes each request to a
//!   [`dispatch::MethodHandler`] and writes the response.
//!
//! The `linewired` binary wraps the engine with layered configuration,
//! structured telemetry and signal-driven shutdown.

mod bootstrap;
mod callback;
pub mod dispatch;
mod health;
mod process;
mod telemetry;
pub mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Server, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use callback::{FrameHandler, HandlerSlot, InvocationId};
pub use dispatch::{CommandEngine, EngineError, MethodHandler, Request, Response};
pub use health::{HealthReporter, StopReason, StructuredHealthReporter};
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_server};
pub use telemetry::{TelemetryError, TelemetryHandle};

/// Build description reported by the `getBuildStats` method, one fact per
/// line.
#[must_use]
pub fn build_stats() -> String {
    format!(
        "{name} {version}\nrevision: {revision}\nbuilt: {date}\n\
         profile: {profile}\ntarget: {target}",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        revision = env!("LINEWIRED_GIT_REVISION"),
        date = env!("LINEWIRED_BUILD_DATE"),
        profile = env!("LINEWIRED_BUILD_PROFILE"),
        target = env!("LINEWIRED_BUILD_TARGET"),
    )
}

#[cfg(test)]
mod tests;
