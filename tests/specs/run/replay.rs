//! Specs: `replay` iterates events and snapshots with limits.

use crate::prelude::*;
use tempfile::tempdir;

fn done_root() -> (tempfile::TempDir, String) {
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
    (dir, root)
}

#[test]
fn replay_events_as_json_lines() {
    let (_dir, root) = done_root();
    let stdout = cli()
        .args(&["replay", "--root", &root, "--source", "events", "--json"])
        .passes();

    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert!(!events.is_empty());
    // Strictly increasing, never rewritten ids
    for pair in events.windows(2) {
        assert!(pair[1]["event_id"].as_u64() > pair[0]["event_id"].as_u64());
    }
    assert_eq!(events[0]["event_type"], "RUN_STARTED");
    assert_eq!(events.last().unwrap()["event_type"], "CHECKPOINT_PERSISTED");
}

#[test]
fn replay_respects_limit() {
    let (_dir, root) = done_root();
    let stdout = cli()
        .args(&[
            "replay", "--root", &root, "--source", "events", "--limit", "3", "--json",
        ])
        .passes();
    assert_eq!(stdout.lines().count(), 3);
}

#[test]
fn replay_snapshots_shows_one_per_node_boundary() {
    let (_dir, root) = done_root();
    let stdout = cli()
        .args(&["replay", "--root", &root, "--source", "snapshots", "--json"])
        .passes();

    let snapshots: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert!(snapshots.len() >= 4);
    assert_eq!(snapshots.last().unwrap()["state"]["status"], "DONE");
}

#[test]
fn replay_text_summaries_are_one_line_per_event() {
    let (_dir, root) = done_root();
    let stdout = cli()
        .args(&["replay", "--root", &root, "--source", "events", "--limit", "2"])
        .passes();
    assert_eq!(stdout.lines().count(), 2);
    assert!(stdout.contains("task=T1"));
}
