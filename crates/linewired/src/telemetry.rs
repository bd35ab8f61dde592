//! Process-wide `tracing` setup for the daemon.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::{EnvFilter, ParseError};
use tracing_subscriber::fmt::{self, time::UtcTime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

use linewire_config::{Config, LogFormat};

static INSTALLED: OnceCell<LogFormat> = OnceCell::new();

/// Proof that the global subscriber is in place.
///
/// Only the first [`initialise`] call installs anything; its format wins for
/// the rest of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Output format of the installed subscriber.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured filter directives did not parse.
    #[error("invalid log filter '{directives}': {source}")]
    Filter {
        /// Directives as configured.
        directives: String,
        /// Parser error.
        #[source]
        source: ParseError,
    },
    /// Another global subscriber was already installed.
    #[error("failed to install telemetry subscriber: {source}")]
    Install {
        /// Installation error.
        #[source]
        source: TryInitError,
    },
}

/// Installs the stderr subscriber on first use.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED
        .get_or_try_init(|| install(config))
        .map(|format| TelemetryHandle { format: *format })
}

fn install(config: &Config) -> Result<LogFormat, TelemetryError> {
    let filter = parse_filter(config.log_filter())?;
    let format = config.log_format();
    let output = if format.is_structured() {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_thread_names(true)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .compact()
            .with_ansi(io::stderr().is_terminal())
            .with_thread_names(true)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(io::stderr)
            .boxed()
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .map_err(|source| TelemetryError::Install { source })?;
    Ok(format)
}

fn parse_filter(directives: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directives).map_err(|source| TelemetryError::Filter {
        directives: directives.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_an_unparsable_filter() {
        let error = parse_filter("linewired=shouting").expect_err("filter should not parse");
        assert!(matches!(
            error,
            TelemetryError::Filter { ref directives, .. } if directives == "linewired=shouting"
        ));
    }

    #[test]
    fn accepts_target_directives() {
        assert!(parse_filter("info,linewired::transport=debug").is_ok());
    }
}
