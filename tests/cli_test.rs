//! CLI integration tests
//!
//! These run the salsa binary with an isolated context directory and check
//! exit codes and output. None of them needs a reachable backend.

use salsa::intents::{Context, ContextStore, FeedLayout};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const SALSA_VARS: &[&str] = &[
    "SALSA_URL",
    "SALSA_USERNAME",
    "SALSA_TOKEN",
    "SALSA_PASSWORD",
    "SALSA_REQUEST_TIMEOUT",
    "SALSA_LOG_LEVEL",
    "SALSA_LOG_JSON",
    "SALSA_DIRCOPY_PLUGIN",
    "SALSA_HOME_ROOT",
    "SALSA_FEEDS_DIR",
    "SALSA_DEFAULT_USER",
];

fn salsa(context_dir: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_salsa"));
    for var in SALSA_VARS {
        command.env_remove(var);
    }
    command
        .env("SALSA_CONTEXT_DIR", context_dir)
        .args(args)
        .output()
        .expect("Failed to run salsa")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn connected_dir() -> TempDir {
    let temp = TempDir::new().unwrap();
    let context = Context::new(
        "http://localhost:8000/api/v1/",
        "alice",
        "secret-token",
        &FeedLayout::default(),
    );
    ContextStore::new(temp.path()).save(&context).unwrap();
    temp
}

#[test]
fn test_cli_help() {
    let temp = TempDir::new().unwrap();
    let output = salsa(temp.path(), &["--help"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("run"));
    assert!(text.contains("feeds"));
    assert!(text.contains("connect"));
}

#[test]
fn test_cli_version() {
    let temp = TempDir::new().unwrap();
    let output = salsa(temp.path(), &["--version"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_command() {
    let temp = TempDir::new().unwrap();
    let output = salsa(temp.path(), &["launch"]);
    assert!(!output.status.success());
}

#[test]
fn test_context_requires_connect() {
    let temp = TempDir::new().unwrap();
    let output = salsa(temp.path(), &["context"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("salsa connect"));
}

#[test]
fn test_run_requires_connect() {
    let temp = TempDir::new().unwrap();
    let output = salsa(temp.path(), &["run", "pl-foo", "--param", "size=3"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Not connected"));
}

#[test]
fn test_config_json_hides_token() {
    let temp = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_salsa"))
        .env("SALSA_CONTEXT_DIR", temp.path())
        .env("SALSA_TOKEN", "very-secret")
        .env_remove("SALSA_URL")
        .args(["config", "--format", "json"])
        .output()
        .expect("Failed to run salsa");

    assert!(output.status.success());
    let text = stdout(&output);
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["token_set"], "true");
    assert!(!text.contains("very-secret"));
}

#[test]
fn test_invalid_url_fails_validation() {
    let temp = TempDir::new().unwrap();
    let output = salsa(temp.path(), &["config", "--url", "ftp://cube/api/v1/"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_cd_updates_stored_context() {
    let temp = connected_dir();

    let output = salsa(
        temp.path(),
        &["cd", "feeds/feed_12/pl-dircopy_40/data", "--format", "json"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(parsed["cwd"], "/home/alice/feeds/feed_12/pl-dircopy_40/data");
    assert_eq!(parsed["feed_id"], 12);
    assert!(!stdout(&output).contains("secret-token"));

    let stored = ContextStore::new(temp.path()).require().unwrap();
    assert_eq!(stored.cwd, "/home/alice/feeds/feed_12/pl-dircopy_40/data");
}

#[test]
fn test_logout_removes_context() {
    let temp = connected_dir();

    let first = salsa(temp.path(), &["logout"]);
    assert!(first.status.success());
    assert!(stdout(&first).contains("Logged out"));

    let second = salsa(temp.path(), &["logout"]);
    assert!(second.status.success());
    assert!(stdout(&second).contains("Not connected"));
}

#[test]
fn test_context_yaml() {
    let temp = connected_dir();
    let output = salsa(temp.path(), &["context", "-f", "yaml"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("username: alice"));
    assert!(text.contains("cwd: /home/alice"));
}
