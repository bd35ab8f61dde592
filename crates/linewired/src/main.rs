//! Entry point for the linewire command server.

use std::process::ExitCode;

#[expect(
    clippy::print_stderr,
    reason = "startup failures are reported before or without telemetry"
)]
fn main() -> ExitCode {
    match linewired::run_server() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("linewired: {error}");
            ExitCode::FAILURE
        }
    }
}
