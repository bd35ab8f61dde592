//! Supervises server launch sequencing and shutdown.

use std::sync::Arc;
use std::thread;

use tracing::info;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StopReason, StructuredHealthReporter};

use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use super::{PROCESS_TARGET, SUPERVISE_INTERVAL};

/// Runs the server using the production collaborators until a termination
/// signal arrives or a client sends `quit`.
pub fn run_server() -> Result<(), LaunchError> {
    let shutdown = SystemShutdownSignal::install()?;
    let reporter = Arc::new(StructuredHealthReporter::new());
    run_server_with(&SystemConfigLoader, reporter, &shutdown).map(|_| ())
}

/// Runs the server with injected collaborators.
pub(crate) fn run_server_with<S>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    shutdown: &S,
) -> Result<StopReason, LaunchError>
where
    S: ShutdownSignal,
{
    let server = bootstrap_with(loader, reporter)?;
    info!(
        target: PROCESS_TARGET,
        pid = std::process::id(),
        "starting server runtime"
    );
    server.start()?;
    let reason = loop {
        if shutdown.requested() {
            break StopReason::Signal;
        }
        if !server.engine().is_running() {
            break StopReason::Quit;
        }
        thread::sleep(SUPERVISE_INTERVAL);
    };
    server.stop(reason)?;
    info!(
        target: PROCESS_TARGET,
        ?reason,
        "shutdown sequence completed"
    );
    Ok(reason)
}
