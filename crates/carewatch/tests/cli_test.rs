//! Integration tests for the `carewatch` CLI binary.
//!
//! Argument parsing, help output, shell completions and error handling run
//! without a backend; alarm workflows run against a wiremock server.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `carewatch` binary with env isolation.
///
/// Clears all `CAREWATCH_*` env vars and points config directories at a
/// fresh temp dir so tests never touch the user's real configuration.
fn carewatch_cmd(home: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("carewatch");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("CAREWATCH_PROFILE")
        .env_remove("CAREWATCH_SERVER")
        .env_remove("CAREWATCH_TOKEN")
        .env_remove("CAREWATCH_EMAIL")
        .env_remove("CAREWATCH_PASSWORD")
        .env_remove("CAREWATCH_OUTPUT")
        .env_remove("CAREWATCH_INSECURE")
        .env_remove("CAREWATCH_TIMEOUT");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn event(id: &str, handling: bool) -> serde_json::Value {
    json!({
        "id": id,
        "patientName": "Jenny Wilson",
        "type": "HR",
        "value": 89,
        "triggeredAt": "2024-11-07T20:24:00Z",
        "isHandling": handling,
        "handlingByName": if handling { json!("Bob") } else { json!(null) },
        "isResolved": false,
    })
}

async fn backend_with(events: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/alert-events"))
        .and(query_param("status", "unresolved"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(events))
        .mount(&server)
        .await;
    server
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = TempDir::new().unwrap();
    let output = carewatch_cmd(&home).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    carewatch_cmd(&home).arg("--help").assert().success().stdout(
        predicate::str::contains("alarms")
            .and(predicate::str::contains("config"))
            .and(predicate::str::contains("completions")),
    );
}

#[test]
fn test_alarms_subcommands_exist() {
    let home = TempDir::new().unwrap();
    carewatch_cmd(&home)
        .args(["alarms", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("list")
                .and(predicate::str::contains("claim"))
                .and(predicate::str::contains("release"))
                .and(predicate::str::contains("resolve"))
                .and(predicate::str::contains("watch")),
        );
}

#[test]
fn test_completions_zsh() {
    let home = TempDir::new().unwrap();
    carewatch_cmd(&home)
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_invalid_output_format() {
    let home = TempDir::new().unwrap();
    let output = carewatch_cmd(&home)
        .args(["--output", "invalid", "alarms", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_under_config_home() {
    let home = TempDir::new().unwrap();
    carewatch_cmd(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_no_config() {
    let home = TempDir::new().unwrap();
    carewatch_cmd(&home)
        .args(["config", "show"])
        .assert()
        .success();
}

#[test]
fn test_use_unknown_profile() {
    let home = TempDir::new().unwrap();
    let output = carewatch_cmd(&home)
        .args(["config", "use", "night-shift"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("night-shift"));
}

#[test]
fn test_malformed_config_is_reported_and_left_untouched() {
    let home = TempDir::new().unwrap();
    let config_dir = home.path().join(".config").join("carewatch");
    std::fs::create_dir_all(&config_dir).unwrap();
    let broken = "[profiles.ward\nserver = \"https://care.example.org\"\n";
    std::fs::write(config_dir.join("config.toml"), broken).unwrap();

    let output = carewatch_cmd(&home)
        .args(["config", "use", "ward"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Configuration error"));
    assert_eq!(
        std::fs::read_to_string(config_dir.join("config.toml")).unwrap(),
        broken
    );

    let output = carewatch_cmd(&home)
        .args(["config", "init"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Configuration error"));
    assert_eq!(
        std::fs::read_to_string(config_dir.join("config.toml")).unwrap(),
        broken
    );

    let output = carewatch_cmd(&home).args(["alarms", "list"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("Configuration error"), "{text}");
    assert!(!text.contains("config init"), "{text}");
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_alarms_list_without_backend() {
    let home = TempDir::new().unwrap();
    let output = carewatch_cmd(&home).args(["alarms", "list"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(
        combined_output(&output).contains("config init"),
        "Expected a hint to run config init"
    );
}

#[test]
fn test_explicit_profile_must_exist() {
    let home = TempDir::new().unwrap();
    let output = carewatch_cmd(&home)
        .args(["--profile", "ward-b", "alarms", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_resolve_requires_reason_or_note() {
    let home = TempDir::new().unwrap();
    let output = carewatch_cmd(&home)
        .args(["--server", "http://127.0.0.1:9", "alarms", "resolve", "a1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--reason"));
}

#[test]
fn test_reasons_plain() {
    let home = TempDir::new().unwrap();
    carewatch_cmd(&home)
        .args(["-o", "plain", "alarms", "reasons"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to report").and(predicate::str::contains("LOW HR")));
}

// ── Alarm workflows against a mock backend ──────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_alarms_list_json() {
    let server = backend_with(json!([event("a1", false), event("a2", true)])).await;
    let home = TempDir::new().unwrap();

    let output = carewatch_cmd(&home)
        .args(["--server", &server.uri(), "--token", "test-token", "-o", "json"])
        .args(["alarms", "list"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let alarms: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(alarms.as_array().unwrap().len(), 2);
    assert_eq!(alarms[0]["id"], "a1");
    assert_eq!(alarms[0]["status"], "active");
    assert_eq!(alarms[0]["value"], "89");
    assert_eq!(alarms[1]["status"], "in-progress");
    assert_eq!(alarms[1]["handledBy"], "Bob");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_alarms_list_active_only_plain() {
    let server = backend_with(json!([event("a1", false), event("a2", true)])).await;
    let home = TempDir::new().unwrap();

    carewatch_cmd(&home)
        .args(["--server", &server.uri(), "--token", "test-token", "-o", "plain"])
        .args(["alarms", "list", "--active"])
        .assert()
        .success()
        .stdout(predicate::str::diff("a1\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_claim_without_backend_support_warns() {
    let server = backend_with(json!([event("a1", false)])).await;
    Mock::given(method("POST"))
        .and(path("/api/v2/alert-events/a1/in-progress"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    let home = TempDir::new().unwrap();

    carewatch_cmd(&home)
        .args(["--server", &server.uri(), "--token", "test-token", "-o", "json"])
        .args(["alarms", "claim", "a1"])
        .assert()
        .success()
        .stderr(predicate::str::contains("this device only"))
        .stdout(predicate::str::contains("in-progress"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_claim_with_expired_token() {
    let server = backend_with(json!([event("a1", false)])).await;
    Mock::given(method("POST"))
        .and(path("/api/v2/alert-events/a1/in-progress"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let home = TempDir::new().unwrap();

    let output = carewatch_cmd(&home)
        .args(["--server", &server.uri(), "--token", "test-token"])
        .args(["alarms", "claim", "a1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("Please log in again"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_resolve_prints_journal_entry() {
    let server = backend_with(json!([event("a1", false)])).await;
    Mock::given(method("POST"))
        .and(path("/api/v2/alert-events/a1/resolve"))
        .and(body_partial_json(json!({
            "resolution_options": ["Pain"],
            "resolution_notes": "Fine"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    let home = TempDir::new().unwrap();

    let output = carewatch_cmd(&home)
        .args(["--server", &server.uri(), "--token", "test-token", "-o", "json"])
        .args(["alarms", "resolve", "a1", "--reason", "Pain", "--note", "Fine"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let entry: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(entry["alarmId"], "a1");
    assert_eq!(entry["selectedOptions"], json!(["Pain"]));
    assert_eq!(entry["freeTextNotes"], "Fine");
    assert_eq!(entry["patientName"], "Jenny Wilson");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_profile_from_config_file() {
    let server = backend_with(json!([event("a1", false)])).await;
    let home = TempDir::new().unwrap();
    let config_dir = home.path().join(".config").join("carewatch");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        format!(
            "default_profile = \"ward\"\n\n[profiles.ward]\nserver = \"{}\"\ntoken_env = \"WARD_TOKEN\"\n",
            server.uri()
        ),
    )
    .unwrap();

    carewatch_cmd(&home)
        .env("WARD_TOKEN", "test-token")
        .args(["-o", "plain", "alarms", "list"])
        .assert()
        .success()
        .stdout(predicate::str::diff("a1\n"));
}
