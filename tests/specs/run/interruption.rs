//! Specs: scenario 2 — forced interruption keeps the lease ACTIVE, takeover
//! adopts it, and the run resumes to completion.

use crate::prelude::*;
use tempfile::tempdir;

fn interrupted_root() -> (tempfile::TempDir, String, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let root = dir.path().to_str().unwrap().to_string();
    let executor = stub_executor(dir.path());

    cli().args(&["init", "--root", &root]).passes();
    let stderr = cli()
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
    assert!(stderr.contains("E_RUN_INTERRUPTED"));
    (dir, root, executor)
}

#[test]
fn interruption_retains_an_active_lease() {
    let (dir, root, _executor) = interrupted_root();

    let stdout = cli()
        .args(&["status", "--root", &root, "--json"])
        .passes();
    let view: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(view["leases"][0]["status"], "ACTIVE");
    assert_eq!(view["state"]["steps"][0]["state"], "RUNNING");
    drop(dir);
}

#[test]
fn takeover_adopts_the_interrupted_step() {
    let (dir, root, executor) = interrupted_root();

    let stdout = cli()
        .args(&[
            "takeover",
            "--root",
            &root,
            "--task-id",
            "T1",
            "--run-id",
            "R1",
            "--successor-thread-id",
            "thread-recover",
        ])
        .passes();
    let result: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(result["adopted_step_ids"], serde_json::json!(["S1"]));
    assert_eq!(result["failed_step_ids"], serde_json::json!([]));

    // Succession is recorded in the pipeline state
    let status = cli()
        .args(&["status", "--root", &root, "--json"])
        .passes();
    let view: serde_json::Value = serde_json::from_str(&status).unwrap();
    assert!(view["state"]["succession"]["last_takeover_at"].is_string());
    assert_eq!(
        view["state"]["succession"]["successor"]["thread_id"],
        "thread-recover"
    );

    // The journal shows the acceptance
    assert_subsequence(
        &event_types(dir.path()),
        &["LEASE_ADOPTED", "SUCCESSION_ACCEPTED"],
    );

    // And the successor resumes the run to completion
    cli()
        .args(&[
            "run", "--root", &root, "--task-id", "T1", "--run-id", "R1", "--goal", "demo",
        ])
        .executor(&executor)
        .passes();
    assert_subsequence(&event_types(dir.path()), &["RUN_DONE"]);
}

#[test]
fn takeover_for_the_wrong_run_is_rejected() {
    let (_dir, root, _executor) = interrupted_root();

    let stderr = cli()
        .args(&[
            "takeover",
            "--root",
            &root,
            "--task-id",
            "T1",
            "--run-id",
            "R9",
            "--successor-thread-id",
            "thread-recover",
        ])
        .fails_with(1);
    assert!(stderr.contains("E_TAKEOVER_FAILED"));
}
