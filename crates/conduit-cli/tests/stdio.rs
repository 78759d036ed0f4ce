//! `conduit call`/`notify` driving `conduit serve` as the child process.

use serde_json::{json, Value};
use std::io::Write;
use std::process::{Command, Output};

const BIN: &str = env!("CARGO_BIN_EXE_conduit");

fn conduit(args: &[&str]) -> Output {
    Command::new(BIN)
        .args(args)
        .env_remove("CONDUIT_CONFIG")
        .output()
        .expect("conduit runs")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn call_ping_against_serve() {
    let output = conduit(&["call", "ping", "--", BIN, "serve"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "\"pong\"");
}

#[test]
fn call_echo_prints_result_json() {
    let output = conduit(&["call", "echo", r#"{"a":[1,2]}"#, "--", BIN, "serve"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result, json!({"a": [1, 2]}));
}

#[test]
fn error_reply_fails_with_code_and_message() {
    let output = conduit(&["call", "missing", "--", BIN, "serve"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(stderr(&output).contains("error -32601: Method not found"));
}

#[test]
fn notify_prints_nothing() {
    let output = conduit(&["notify", "ping", "[]", "--", BIN, "serve"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(output.stdout.is_empty());
}

#[test]
fn scalar_params_rejected_before_spawning() {
    let output = conduit(&["call", "m", "42", "--", "/nonexistent/conduit-server"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("params must be a JSON object or array"));
}

#[test]
fn unreadable_config_is_reported() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[dispatcher]\nbatch_concurrency = \"many\"").unwrap();
    let path = file.path().to_str().unwrap();

    let output = conduit(&["-C", path, "call", "ping", "--", BIN, "serve"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to load configuration"));
}
