//! Shared helpers for `quartet` binary tests.

use assert_cmd::cargo::cargo_bin_cmd;
use std::time::Duration;

pub const TIMEOUT_BASIC: Duration = Duration::from_secs(10);

const QUARTET_VARS: &[&str] = &[
    "QUARTET_DEBUG",
    "QUARTET_MODE",
    "QUARTET_MAX_WORKERS",
    "QUARTET_MAX_LOG_CHARS",
    "QUARTET_SIMULATE_CRASH",
    "QUARTET_LOG",
];

/// `quartet` with an empty home and project directory.
///
/// Returns (command, _guard); keep the guard alive for the test's duration.
pub fn quartet_cmd() -> (assert_cmd::Command, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let mut cmd: assert_cmd::Command = cargo_bin_cmd!("quartet");
    cmd.timeout(TIMEOUT_BASIC);
    for var in QUARTET_VARS {
        cmd.env_remove(var);
    }
    cmd.env("HOME", tmp.path());
    cmd.args(["-C", tmp.path().to_str().expect("valid utf8")]);
    (cmd, tmp)
}

/// Parses the one-shot JSON document printed on stdout.
pub fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).expect("stdout is one JSON document")
}
