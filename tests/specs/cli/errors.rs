//! Specs: error surfaces print stable reason codes with remediation hints.

use crate::prelude::*;
use tempfile::tempdir;

#[test]
fn unknown_subcommand_is_a_usage_error() {
    let output = cli().args(&["frobnicate"]).output();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn check_on_uninitialized_root_reports_layout_missing() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("never-initialized");
    let stderr = cli()
        .args(&["check", "--root", root.to_str().unwrap()])
        .fails_with(1);
    assert!(stderr.contains("E_CHECK_LAYOUT_MISSING"));
    assert!(stderr.contains("hint:"));
}

#[test]
fn status_on_uninitialized_root_reports_no_run() {
    let dir = tempdir().unwrap();
    let stdout = cli()
        .args(&["status", "--root", dir.path().to_str().unwrap()])
        .passes();
    assert!(stdout.contains("no run"));
}

#[test]
fn corrupt_pipeline_state_fails_check() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_str().unwrap().to_string();
    cli().args(&["init", "--root", &root]).passes();
    std::fs::write(dir.path().join("state/pipeline_state.json"), "{broken").unwrap();

    let stderr = cli().args(&["check", "--root", &root]).fails_with(1);
    assert!(stderr.contains("E_CHECK_STATE_INVALID"));
}

#[test]
fn corrupt_heartbeat_fails_check() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_str().unwrap().to_string();
    cli().args(&["init", "--root", &root]).passes();
    std::fs::write(dir.path().join("state/heartbeat_status.json"), "nope").unwrap();

    let stderr = cli().args(&["check", "--root", &root]).fails_with(1);
    assert!(stderr.contains("E_CHECK_HEARTBEAT_INVALID"));
}

#[test]
fn takeover_without_a_run_fails() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_str().unwrap().to_string();
    cli().args(&["init", "--root", &root]).passes();

    let stderr = cli()
        .args(&[
            "takeover",
            "--root",
            &root,
            "--task-id",
            "T1",
            "--run-id",
            "R1",
            "--successor-thread-id",
            "thread-x",
        ])
        .fails_with(1);
    assert!(stderr.contains("E_TAKEOVER_FAILED"));
}
