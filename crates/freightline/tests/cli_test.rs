//! Integration tests for the `freightline` CLI binary.
//!
//! Argument parsing, config handling and error exits run without any
//! backend; the notification commands talk to a wiremock server.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `freightline` binary with env isolation.
///
/// Clears all `FREIGHTLINE_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn freightline_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("freightline");
    cmd.env("HOME", "/tmp/freightline-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/freightline-cli-test-nonexistent")
        .env_remove("FREIGHTLINE_PROFILE")
        .env_remove("FREIGHTLINE_API_URL")
        .env_remove("FREIGHTLINE_TOKEN")
        .env_remove("FREIGHTLINE_USER")
        .env_remove("FREIGHTLINE_OUTPUT")
        .env_remove("FREIGHTLINE_INSECURE")
        .env_remove("FREIGHTLINE_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn body(id: i64, title: &str, is_read: bool) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "message": "Booking status changed",
        "type": "booking",
        "isRead": is_read,
        "createdAt": "2026-03-01T09:00:00Z"
    })
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run(args: Vec<String>) -> std::process::Output {
    tokio::task::spawn_blocking(move || freightline_cmd().args(args).output().unwrap())
        .await
        .unwrap()
}

fn backend_args(server: &MockServer, rest: &[&str]) -> Vec<String> {
    let mut args = vec![
        "--api-url".to_owned(),
        format!("{}/api", server.uri()),
        "--token".to_owned(),
        "cli-token".to_owned(),
        "--user".to_owned(),
        "7".to_owned(),
    ];
    args.extend(rest.iter().map(|s| (*s).to_owned()));
    args
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = freightline_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(
        text.contains("Usage"),
        "Expected 'Usage' in output:\n{text}"
    );
}

#[test]
fn test_help_flag() {
    freightline_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("notifications").and(predicate::str::contains("config")),
    );
}

#[test]
fn test_version_flag() {
    freightline_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("freightline"));
}

#[test]
fn test_notifications_help_lists_subcommands() {
    freightline_cmd()
        .args(["notifications", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("list")
                .and(predicate::str::contains("read"))
                .and(predicate::str::contains("watch")),
        );
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path() {
    freightline_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_without_file_prints_defaults() {
    freightline_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]"));
}

// ── Error handling ──────────────────────────────────────────────────

#[test]
fn test_list_without_config_is_usage_error() {
    let output = freightline_cmd()
        .args(["notifications", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(
        text.contains("No backend configured"),
        "Expected config error in output:\n{text}"
    );
}

#[test]
fn test_list_without_token_is_auth_error() {
    let output = freightline_cmd()
        .args(["--api-url", "http://127.0.0.1:9/api", "notifications", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_unknown_profile_is_usage_error() {
    let output = freightline_cmd()
        .args(["--profile", "nope", "notifications", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Profile 'nope' not found"));
}

#[test]
fn test_invalid_output_format() {
    freightline_cmd()
        .args(["--output", "xml", "config", "show"])
        .assert()
        .failure()
        .code(2);
}

// ── Against a mock backend ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_list_prints_json_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/notifications"))
        .and(header("authorization", "Bearer cli-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            body(2, "Quote accepted", false),
            body(1, "Shipment delivered", true),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let output = run(backend_args(&server, &["-o", "json", "notifications", "list"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let items = parsed.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["title"], "Quote accepted");
    assert_eq!(items[1]["title"], "Shipment delivered");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_unread_filters_read_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            body(2, "Quote accepted", false),
            body(1, "Shipment delivered", true),
        ])))
        .mount(&server)
        .await;

    let output = run(backend_args(
        &server,
        &["-o", "plain", "notifications", "list", "--unread"],
    ))
    .await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "2");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_read_marks_notification() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([body(
            5,
            "Invoice ready",
            false
        )])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/notifications/5/read"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body(5, "Invoice ready", true)))
        .expect(1)
        .mount(&server)
        .await;

    let output = run(backend_args(&server, &["-o", "json", "notifications", "read", "5"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["is_read"], true);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_read_matches_string_ids() {
    let server = MockServer::start().await;
    let mut item = body(0, "Quote received", false);
    item["id"] = json!("5");
    Mock::given(method("GET"))
        .and(path("/api/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([item.clone()])))
        .mount(&server)
        .await;
    item["isRead"] = json!(true);
    Mock::given(method("PUT"))
        .and(path("/api/notifications/5/read"))
        .respond_with(ResponseTemplate::new(200).set_body_json(item))
        .expect(1)
        .mount(&server)
        .await;

    let output = run(backend_args(&server, &["-o", "json", "notifications", "read", "5"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["id"], "5");
    assert_eq!(parsed["is_read"], true);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_read_unknown_id_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let output = run(backend_args(&server, &["notifications", "read", "99"])).await;
    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_token_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/notifications"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let output = run(backend_args(&server, &["notifications", "list"])).await;
    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
}
