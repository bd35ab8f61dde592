//! CLI entrypoint for the linewire command client.
//!
//! The binary delegates to [`linewire_cli::run`], which parses arguments,
//! connects to the server and streams each response to stdout as one JSON
//! line.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    linewire_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
