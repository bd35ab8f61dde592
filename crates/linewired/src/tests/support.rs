//! Shared test doubles: configuration loaders, a recording health reporter
//! and a line-oriented TCP client.

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoError};
use serde_json::Value;

use linewire_config::{Config, LogFormat};

use crate::bootstrap::{BootstrapError, ConfigLoader};
use crate::health::{HealthReporter, StopReason};

const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Loader producing a loopback configuration on an ephemeral port.
#[derive(Debug, Default, Clone, Copy)]
pub struct TestConfigLoader;

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(loopback_config())
    }
}

/// Loader that intentionally fails by passing an invalid CLI argument.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("linewired"),
            OsString::from("--port"),
            OsString::from("not-a-port"),
        ];
        Config::load_from_iter(args)
    }
}

/// Loopback configuration used by every server-level test.
pub fn loopback_config() -> Config {
    Config {
        host: String::from("127.0.0.1"),
        port: 0,
        receive_timeout_ms: 50,
        log_format: LogFormat::Compact,
        log_filter: String::from("warn"),
        ..Config::default()
    }
}

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    EngineStarted(Option<SocketAddr>),
    EngineStopping(StopReason),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Address reported when the engine started, if it has.
    #[must_use]
    pub fn started_address(&self) -> Option<SocketAddr> {
        self.events().into_iter().find_map(|event| match event {
            HealthEvent::EngineStarted(address) => address,
            _ => None,
        })
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn engine_started(&self, address: Option<SocketAddr>) {
        self.record(HealthEvent::EngineStarted(address));
    }

    fn engine_stopping(&self, reason: StopReason) {
        self.record(HealthEvent::EngineStopping(reason));
    }
}

/// Blocking newline-delimited JSON client.
pub struct LineClient {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl LineClient {
    pub fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).expect("connect to server");
        stream
            .set_read_timeout(Some(READ_TIMEOUT))
            .expect("set read timeout");
        let writer = stream.try_clone().expect("clone stream");
        Self {
            reader: BufReader::new(stream),
            writer,
        }
    }

    pub fn send_line(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).expect("write request");
        self.writer.write_all(b"\n").expect("write newline");
        self.writer.flush().expect("flush");
    }

    pub fn receive(&mut self) -> Value {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).expect("read response");
        assert!(read > 0, "server closed the connection without responding");
        serde_json::from_str(line.trim_end()).expect("response is JSON")
    }

    pub fn call(&mut self, line: &str) -> Value {
        self.send_line(line);
        self.receive()
    }
}
