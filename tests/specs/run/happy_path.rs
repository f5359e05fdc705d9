//! Specs: scenario 1 — one trivial step runs to DONE with the canonical
//! event sequence and intact evidence.

use crate::prelude::*;
use tempfile::tempdir;

#[test]
fn single_step_run_reaches_done() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_str().unwrap().to_string();
    let executor = stub_executor(dir.path());

    cli().args(&["init", "--root", &root]).passes();
    let stdout = cli()
        .args(&[
            "run", "--root", &root, "--task-id", "T1", "--run-id", "R1", "--goal", "demo",
        ])
        .executor(&executor)
        .passes();
    assert!(stdout.contains("done: T1/R1"));

    assert_subsequence(
        &event_types(dir.path()),
        &[
            "STEP_STARTED",
            "DISPATCH_COMPLETED",
            "ACCEPTANCE_PASSED",
            "STEP_COMPLETED",
            "RUN_DONE",
        ],
    );

    // Evidence trio at the declared output paths
    for artifact in ["report.md", "verification.log", "audit-summary.md"] {
        assert!(
            dir.path().join("steps/S1").join(artifact).is_file(),
            "missing evidence {artifact}"
        );
    }

    // Dispatch artifacts: request/output/error per call
    let state: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("state/pipeline_state.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(state["status"], "DONE");
    assert_eq!(state["steps"][0]["state"], "ACCEPTED");
    assert_eq!(state["schema_version"], "1.0.0");
}

#[test]
fn status_reports_done_run() {
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

    let stdout = cli()
        .args(&[
            "status", "--root", &root, "--task-id", "T1", "--run-id", "R1", "--json",
        ])
        .passes();
    let view: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(view["state"]["status"], "DONE");
    assert_eq!(view["leases"][0]["status"], "RELEASED");
    assert!(view["heartbeat"].is_object());
}

#[test]
fn rerunning_a_done_run_is_a_noop() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_str().unwrap().to_string();
    let executor = stub_executor(dir.path());

    cli().args(&["init", "--root", &root]).passes();
    for _ in 0..2 {
        cli()
            .args(&[
                "run", "--root", &root, "--task-id", "T1", "--run-id", "R1", "--goal", "demo",
            ])
            .executor(&executor)
            .passes();
    }

    let dispatches = event_types(dir.path())
        .iter()
        .filter(|t| *t == "DISPATCH_COMPLETED")
        .count();
    assert_eq!(dispatches, 1);
}

#[test]
fn failing_executor_fails_the_run() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_str().unwrap().to_string();
    // Executor that writes nothing and exits fatally
    let executor = dir.path().join("broken.sh");
    std::fs::write(&executor, "#!/bin/sh\nexit 3\n").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&executor, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    cli().args(&["init", "--root", &root]).passes();
    let stderr = cli()
        .args(&[
            "run", "--root", &root, "--task-id", "T1", "--run-id", "R1", "--goal", "demo",
        ])
        .executor(&executor)
        .fails_with(1);
    assert!(stderr.contains("E_RUN_FAILED"));

    assert_subsequence(&event_types(dir.path()), &["STEP_FAILED", "RUN_FAILED"]);
}
