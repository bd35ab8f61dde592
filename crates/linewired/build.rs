//! Build script: capture build metadata reported by the `getBuildStats` method.
#![expect(
    clippy::print_stdout,
    reason = "build scripts talk to cargo through stdout"
)]

use std::env;
use std::process::Command;

use time::{OffsetDateTime, format_description::well_known::Iso8601};

const FALLBACK_DATE: &str = "1970-01-01";
const UNKNOWN: &str = "unknown";

fn build_date() -> String {
    let Ok(raw) = env::var("SOURCE_DATE_EPOCH") else {
        return FALLBACK_DATE.into();
    };

    let Ok(ts) = raw.parse::<i64>() else {
        println!(
            "cargo:warning=Invalid SOURCE_DATE_EPOCH '{raw}'; expected integer seconds since \
             Unix epoch; falling back to {FALLBACK_DATE}"
        );
        return FALLBACK_DATE.into();
    };

    let Ok(dt) = OffsetDateTime::from_unix_timestamp(ts) else {
        println!(
            "cargo:warning=Invalid SOURCE_DATE_EPOCH '{raw}'; not a valid Unix timestamp; \
             falling back to {FALLBACK_DATE}"
        );
        return FALLBACK_DATE.into();
    };

    dt.format(&Iso8601::DATE)
        .unwrap_or_else(|_| FALLBACK_DATE.into())
}

fn git_revision() -> String {
    let output = Command::new("git")
        .args(["rev-parse", "--short=12", "HEAD"])
        .output();
    match output {
        Ok(output) if output.status.success() => {
            let revision = String::from_utf8_lossy(&output.stdout).trim().to_owned();
            if revision.is_empty() {
                UNKNOWN.into()
            } else {
                revision
            }
        }
        _ => UNKNOWN.into(),
    }
}

fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rerun-if-env-changed=PROFILE");
    println!("cargo:rerun-if-env-changed=TARGET");

    let profile = env::var("PROFILE").unwrap_or_else(|_| UNKNOWN.into());
    let target = env::var("TARGET").unwrap_or_else(|_| UNKNOWN.into());

    println!("cargo:rustc-env=LINEWIRED_BUILD_DATE={}", build_date());
    println!("cargo:rustc-env=LINEWIRED_GIT_REVISION={}", git_revision());
    println!("cargo:rustc-env=LINEWIRED_BUILD_PROFILE={profile}");
    println!("cargo:rustc-env=LINEWIRED_BUILD_TARGET={target}");
}
