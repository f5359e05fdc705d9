//! Specs: scenario 5 — handoff round-trip across context rotation.

use crate::prelude::*;
use tempfile::tempdir;

#[test]
fn handoff_round_trip_resumes_without_reexecuting_accepted_steps() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_str().unwrap().to_string();
    let executor = stub_executor(dir.path());

    cli().args(&["init", "--root", &root]).passes();
    // Interrupt after the first dispatch so S1 is still open
    cli()
        .args(&[
            "run",
            "--root",
            &root,
            "--task-id",
            "T1",
            "--run-id",
            "R1",
            "--goal",
            "demo",
            "--simulate-interruption",
        ])
        .executor(&executor)
        .fails_with(130);

    // Pre-compact: capture the package
    let stdout = cli()
        .args(&["handoff", "--root", &root, "--create"])
        .passes();
    let created: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(created["package_hash"].as_str().unwrap().len() == 64);
    let package_path = created["path"].as_str().unwrap().to_string();
    assert!(std::path::Path::new(&package_path).exists());

    // Session-start in a "fresh process": apply and resume to completion
    let stdout = cli()
        .args(&["handoff", "--root", &root, "--apply"])
        .executor(&executor)
        .passes();
    // The resume plan lists exactly the non-accepted steps
    assert!(stdout.contains("\"S1\""));
    assert!(stdout.contains("done: T1/R1"));

    assert_subsequence(
        &event_types(dir.path()),
        &["HANDOFF_CREATED", "HANDOFF_APPLIED", "RUN_DONE"],
    );

    // Exactly two dispatches total: the interrupted create and one resume
    let dispatches = event_types(dir.path())
        .iter()
        .filter(|t| *t == "DISPATCH_COMPLETED")
        .count();
    assert_eq!(dispatches, 2);
}

#[test]
fn handoff_apply_on_completed_run_is_a_noop() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_str().unwrap().to_string();
    let executor = stub_executor(dir.path());

    cli().args(&["init", "--root", &root]).passes();
    cli()
        .args(&[
            "run", "--root", &root, "--task-id", "T1", "--run-id", "R1", "--goal", "demo",
        ])
        .executor(&executor)
        .passes();

    cli().args(&["handoff", "--root", &root, "--create"]).passes();
    let stdout = cli()
        .args(&["handoff", "--root", &root, "--apply"])
        .executor(&executor)
        .passes();
    // Empty resume plan; no step re-executes
    let dispatches = event_types(dir.path())
        .iter()
        .filter(|t| *t == "DISPATCH_COMPLETED")
        .count();
    assert_eq!(dispatches, 1);
    assert!(stdout.contains("done: T1/R1"));
}

#[test]
fn tampered_package_is_rejected() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_str().unwrap().to_string();
    let executor = stub_executor(dir.path());

    cli().args(&["init", "--root", &root]).passes();
    cli()
        .args(&[
            "run", "--root", &root, "--task-id", "T1", "--run-id", "R1", "--goal", "demo",
        ])
        .executor(&executor)
        .passes();
    let stdout = cli().args(&["handoff", "--root", &root, "--create"]).passes();
    let created: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let path = created["path"].as_str().unwrap();

    // Flip a field without resealing
    let mut package: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    package["next_action"] = serde_json::json!("dispatch S99");
    std::fs::write(path, serde_json::to_string(&package).unwrap()).unwrap();

    let stderr = cli()
        .args(&["handoff", "--root", &root, "--apply", "--path", path])
        .fails_with(1);
    assert!(stderr.contains("E_HANDOFF_FAILED"));
}

#[test]
fn handoff_requires_exactly_one_mode() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_str().unwrap().to_string();
    cli().args(&["init", "--root", &root]).passes();

    let stderr = cli().args(&["handoff", "--root", &root]).fails_with(1);
    assert!(stderr.contains("E_HANDOFF_FAILED"));
}
