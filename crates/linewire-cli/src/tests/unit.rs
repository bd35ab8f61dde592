//! Unit tests for argument parsing and error reporting.

use std::net::TcpListener;
use std::process::ExitCode;

use rstest::rstest;
use serde_json::{Value, json};

use crate::cli::parse_param;
use crate::session::request_line;

use super::support::invoke;

#[rstest]
#[case("radius=2.5", "radius", json!(2.5))]
#[case("count=3", "count", json!(3))]
#[case("dry=false", "dry", json!(false))]
#[case("label=probe", "label", json!("probe"))]
#[case("label=\"quoted\"", "label", json!("\"quoted\""))]
#[case("empty=", "empty", json!(""))]
#[case("expr=a=b", "expr", json!("a=b"))]
fn params_keep_scalar_types(#[case] raw: &str, #[case] key: &str, #[case] value: Value) {
    assert_eq!(parse_param(raw), Ok((key.to_owned(), value)));
}

#[rstest]
#[case("no-separator")]
#[case("=value")]
fn malformed_params_are_rejected(#[case] raw: &str) {
    assert!(parse_param(raw).is_err());
}

#[test]
fn request_lines_are_newline_terminated_objects() {
    let line = request_line(7, "status", &[(String::from("a"), json!(1))]).expect("serialise");
    assert_eq!(line.last(), Some(&b'\n'));
    let value: Value = serde_json::from_slice(&line).expect("request is JSON");
    assert_eq!(value, json!({"id": 7, "method": "status", "params": {"a": 1}}));
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    let outcome = invoke(1, &[]);
    assert_eq!(outcome.exit, ExitCode::from(2));
    assert!(outcome.stdout.is_empty());
    assert!(!outcome.stderr.is_empty());
}

#[test]
fn help_goes_to_stdout() {
    let outcome = invoke(1, &["--help"]);
    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert!(outcome.stdout.contains("linewire"));
}

#[test]
fn unreachable_server_fails() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe listener");
        listener.local_addr().expect("probe address").port()
    };
    let outcome = invoke(port, &["send", "status"]);
    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert!(outcome.stderr.contains("failed to connect"));
}
