//! JSON configuration consumed by the command engine.
//!
//! The engine accepts a JSON object with the keys `ipAddress`, `port` and
//! `exit_on_quit`, plus an optional `transport` object. Unknown keys are
//! ignored so callers may share one document between several consumers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::transport::TransportSettings;

/// Unvalidated engine configuration as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Address the server endpoint binds to.
    #[serde(rename = "ipAddress", default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Port the server endpoint binds to; `0` asks the OS for a free port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    /// Whether a `quit` request stops the engine. Defaults to `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_on_quit: Option<bool>,
    /// Transport tuning.
    #[serde(default)]
    pub transport: TransportSettings,
}

/// Validated engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Address the server endpoint binds to.
    pub address: String,
    /// Port the server endpoint binds to.
    pub port: u16,
    /// Whether a `quit` request stops the engine.
    pub exit_on_quit: bool,
    /// Transport tuning.
    pub transport: TransportSettings,
}

/// Errors raised while reading or validating an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum EngineConfigError {
    /// The configuration document could not be decoded.
    #[error("malformed engine configuration: {source}")]
    Malformed {
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
    /// `ipAddress` was absent or empty.
    #[error("engine configuration is missing 'ipAddress'")]
    MissingAddress,
    /// `port` was absent.
    #[error("engine configuration is missing 'port'")]
    MissingPort,
    /// `port` does not fit a TCP port number.
    #[error("engine port {port} is outside 0..=65535")]
    PortOutOfRange {
        /// Value supplied by the caller.
        port: i64,
    },
    /// A transport setting was rejected.
    #[error("invalid transport setting '{field}': {reason}")]
    InvalidTransport {
        /// Offending field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

impl EngineConfig {
    /// Builds a configuration with the mandatory keys filled in.
    #[must_use]
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            ip_address: Some(address.into()),
            port: Some(i64::from(port)),
            ..Self::default()
        }
    }

    /// Decodes the configuration from a JSON value.
    pub fn from_json(value: &Value) -> Result<Self, EngineConfigError> {
        Self::deserialize(value).map_err(|source| EngineConfigError::Malformed { source })
    }

    /// Decodes the configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, EngineConfigError> {
        serde_json::from_str(text).map_err(|source| EngineConfigError::Malformed { source })
    }

    /// Checks mandatory keys and value ranges.
    pub fn validate(&self) -> Result<EngineSettings, EngineConfigError> {
        let address = self
            .ip_address
            .as_deref()
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .ok_or(EngineConfigError::MissingAddress)?;
        let raw_port = self.port.ok_or(EngineConfigError::MissingPort)?;
        let port = u16::try_from(raw_port)
            .map_err(|_| EngineConfigError::PortOutOfRange { port: raw_port })?;
        validate_transport(&self.transport)?;
        Ok(EngineSettings {
            address: address.to_owned(),
            port,
            exit_on_quit: self.exit_on_quit.unwrap_or(true),
            transport: self.transport.clone(),
        })
    }
}

fn validate_transport(settings: &TransportSettings) -> Result<(), EngineConfigError> {
    if settings.read_block_size == 0 {
        return Err(EngineConfigError::InvalidTransport {
            field: "read_block_size",
            reason: "must be greater than zero",
        });
    }
    if settings.receive_timeout_ms == 0 {
        return Err(EngineConfigError::InvalidTransport {
            field: "receive_timeout_ms",
            reason: "must be greater than zero",
        });
    }
    if settings.queue_capacity == Some(0) {
        return Err(EngineConfigError::InvalidTransport {
            field: "queue_capacity",
            reason: "must be greater than zero when set",
        });
    }
    Ok(())
}
