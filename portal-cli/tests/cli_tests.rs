//! Integration tests for the `portal` binary.

use std::{net::TcpListener, time::Duration};

use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::tempdir;

/// A local URL nothing listens on.
fn unreachable_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

#[test]
fn test_help_lists_commands() {
    let mut cmd = cargo_bin_cmd!("portal");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicates::str::contains(
            "Browse activities and manage student registrations",
        ))
        .stdout(predicates::str::contains("signup"))
        .stdout(predicates::str::contains("unregister"))
        .stdout(predicates::str::contains("shell"))
        .stdout(predicates::str::contains("--server"));
}

#[test]
fn test_signup_requires_email() {
    let mut cmd = cargo_bin_cmd!("portal");
    cmd.args(["signup", "--activity", "Chess Club"])
        .timeout(Duration::from_secs(5));

    cmd.assert()
        .failure()
        .stderr(predicates::str::contains(
            "the following required arguments were not provided",
        ))
        .stderr(predicates::str::contains("--email <EMAIL>"));
}

#[test]
fn test_rejects_non_http_server() {
    let dir = tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("portal");
    cmd.args(["status", "--server", "ftp://school.example.edu"])
        .env("PORTAL_SESSION_FILE", dir.path().join("session.cookies"))
        .timeout(Duration::from_secs(5));

    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("ftp://school.example.edu"));
}

#[test]
fn test_activities_reports_unreachable_backend() {
    let dir = tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("portal");
    cmd.args(["activities", "--server", &unreachable_server()])
        .env("PORTAL_SESSION_FILE", dir.path().join("session.cookies"))
        .env("RUST_LOG", "off")
        .timeout(Duration::from_secs(10));

    cmd.assert().failure().stderr(predicates::str::contains(
        "Failed to load activities. Please try again later.",
    ));
}

#[test]
fn test_signup_without_session_is_refused() {
    let dir = tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("portal");
    cmd.args([
        "signup",
        "--activity",
        "Chess Club",
        "--email",
        "a@b.com",
        "--server",
        &unreachable_server(),
    ])
    .env("PORTAL_SESSION_FILE", dir.path().join("session.cookies"))
    .env("RUST_LOG", "off")
    .timeout(Duration::from_secs(10));

    cmd.assert().failure().stderr(predicates::str::contains(
        "Please log in as a teacher to manage registrations.",
    ));
    assert!(!dir.path().join("session.cookies").exists());
}

#[test]
fn test_config_generates_file() {
    let dir = tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("portal");
    cmd.args(["config", "--format", "toml"]).current_dir(dir.path());

    cmd.assert()
        .success()
        .stdout(predicates::str::contains("generated successfully"));

    let written = std::fs::read_to_string(dir.path().join("portal.toml")).unwrap();
    assert!(written.contains("base_url = \"http://localhost:8000/\""));
    assert!(written.contains("auth_confirmation_ms = 3000"));
}

#[test]
fn test_config_rejects_unknown_format() {
    let dir = tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("portal");
    cmd.args(["config", "--format", "ini"]).current_dir(dir.path());

    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("Unsupported format"));
}

#[test]
fn test_completion_script() {
    let mut cmd = cargo_bin_cmd!("portal");
    cmd.args(["completion", "--shell", "bash"]);

    cmd.assert()
        .success()
        .stdout(predicates::str::contains("portal"));
}
