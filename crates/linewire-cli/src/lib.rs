//! Command-line client for the linewire command server.
//!
//! The client connects through a client-mode
//! [`Endpoint`](linewired::transport::Endpoint), sends newline-delimited JSON
//! requests and writes each response to stdout as one line. The runtime takes
//! its IO streams as parameters so tests can capture output.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;
use serde_json::Value;

mod cli;
mod errors;
mod session;

use cli::{Cli, CliCommand};
use errors::AppError;
use session::Session;

const QUIT_METHOD: &str = "quit";
const STATUS_METHOD: &str = "status";
const QUERY_METHOD: &str = "query";

/// Runs the client with the given arguments and IO streams.
///
/// Exits non-zero when the server cannot be reached, a response does not
/// arrive in time, or any response carries `result.error_code`.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => return report_usage(&error, stdout, stderr),
    };
    match execute(&cli, stdout) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            let _ = writeln!(stderr, "linewire: {error}");
            ExitCode::FAILURE
        }
    }
}

fn report_usage<W: Write, E: Write>(
    error: &clap::Error,
    stdout: &mut W,
    stderr: &mut E,
) -> ExitCode {
    let rendered = error.render().to_string();
    if error.use_stderr() {
        let _ = stderr.write_all(rendered.as_bytes());
        ExitCode::from(2)
    } else {
        let _ = stdout.write_all(rendered.as_bytes());
        ExitCode::SUCCESS
    }
}

/// Returns `Ok(false)` when a response reported an error code.
fn execute<W: Write>(cli: &Cli, stdout: &mut W) -> Result<bool, AppError> {
    let timeout = Duration::from_millis(cli.timeout_ms);
    let session = Session::connect(&cli.host, cli.port, timeout)?;
    match &cli.command {
        CliCommand::Send { method, id, params } => {
            let response = session.call(*id, method, params)?;
            emit(stdout, &response)
        }
        CliCommand::Quit { id } => {
            let response = session.call(*id, QUIT_METHOD, &[])?;
            emit(stdout, &response)
        }
        CliCommand::Probe {
            count,
            interval_ms,
            skip_query,
        } => {
            let interval = Duration::from_millis(*interval_ms);
            let mut clean = true;
            let mut next_id = 1_i64;
            for round in 0..*count {
                if round > 0 {
                    thread::sleep(interval);
                }
                let response = session.call(next_id, STATUS_METHOD, &[])?;
                clean &= emit(stdout, &response)?;
                next_id += 1;
            }
            if !skip_query {
                if *count > 0 {
                    thread::sleep(interval);
                }
                let response = session.call(next_id, QUERY_METHOD, &[])?;
                clean &= emit(stdout, &response)?;
            }
            Ok(clean)
        }
    }
}

fn emit<W: Write>(stdout: &mut W, response: &Value) -> Result<bool, AppError> {
    writeln!(stdout, "{response}").map_err(AppError::WriteOutput)?;
    Ok(response.pointer("/result/error_code").is_none())
}

#[cfg(test)]
mod tests;
