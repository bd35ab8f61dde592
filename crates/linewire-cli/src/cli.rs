//! CLI argument definitions for the linewire client.

use clap::{Parser, Subcommand};
use serde_json::Value;

use linewire_config::DEFAULT_PORT;

/// Command-line interface for the linewire command client.
#[derive(Parser, Debug)]
#[command(name = "linewire", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Server host name or address.
    #[arg(long, default_value = "127.0.0.1")]
    pub(crate) host: String,
    /// Server port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub(crate) port: u16,
    /// Milliseconds to wait for the connection and for each response.
    #[arg(long = "timeout-ms", default_value_t = 2000)]
    pub(crate) timeout_ms: u64,
    /// What to send.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Client actions.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Sends one request and prints the response.
    Send {
        /// Method name.
        method: String,
        /// Correlation id echoed by the server.
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        id: i64,
        /// Request parameter; repeat for several.
        #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, Value)>,
    },
    /// Asks the server to stop.
    Quit {
        /// Correlation id echoed by the server.
        #[arg(long, default_value_t = 1)]
        id: i64,
    },
    /// Sends a burst of `status` requests followed by a `query`.
    Probe {
        /// Number of `status` requests.
        #[arg(long, default_value_t = 3)]
        count: u32,
        /// Pause between requests in milliseconds.
        #[arg(long = "interval-ms", default_value_t = 100)]
        interval_ms: u64,
        /// Skip the trailing `query`.
        #[arg(long)]
        skip_query: bool,
    },
}

/// Parses `KEY=VALUE`. Numbers and booleans keep their JSON type; anything
/// else is sent as a string.
pub(crate) fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(format!("expected KEY=VALUE, got '{raw}'"));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("parameter name is empty in '{raw}'"));
    }
    let parsed = match serde_json::from_str::<Value>(value) {
        Ok(scalar @ (Value::Number(_) | Value::Bool(_))) => scalar,
        _ => Value::String(value.to_owned()),
    };
    Ok((key.to_owned(), parsed))
}
