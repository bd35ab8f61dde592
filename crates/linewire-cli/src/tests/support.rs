//! In-process server and invocation helpers.

use std::ffi::OsString;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;

use linewire_config::EngineConfig;
use linewired::CommandEngine;

/// Captured result of one client invocation.
pub struct Invocation {
    pub exit: ExitCode,
    pub stdout: String,
    pub stderr: String,
}

impl Invocation {
    pub fn responses(&self) -> Vec<Value> {
        self.stdout
            .lines()
            .map(|line| serde_json::from_str(line).expect("stdout line is JSON"))
            .collect()
    }
}

/// Starts an engine on an ephemeral loopback port.
pub fn start_engine() -> CommandEngine {
    let mut config = EngineConfig::new("127.0.0.1", 0);
    config.transport.receive_timeout_ms = 50;
    let engine = CommandEngine::init(&config).expect("init engine");
    engine.start().expect("start engine");
    engine
}

/// Runs the client against `port` with `args` appended after the global
/// flags.
pub fn invoke(port: u16, args: &[&str]) -> Invocation {
    let mut argv: Vec<OsString> = vec![
        OsString::from("linewire"),
        OsString::from("--port"),
        OsString::from(port.to_string()),
        OsString::from("--timeout-ms"),
        OsString::from("2000"),
    ];
    argv.extend(args.iter().map(OsString::from));
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit = crate::run(argv, &mut stdout, &mut stderr);
    Invocation {
        exit,
        stdout: String::from_utf8(stdout).expect("stdout is UTF-8"),
        stderr: String::from_utf8(stderr).expect("stderr is UTF-8"),
    }
}

/// Polls `condition` until it holds or two seconds pass.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
