//! Specs: `init` builds the frozen layout and is idempotent.

use crate::prelude::*;
use tempfile::tempdir;

#[test]
fn init_creates_the_frozen_layout() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_str().unwrap().to_string();
    cli().args(&["init", "--root", &root]).passes();

    for path in [
        "state/events.jsonl",
        "state/process_leases.json",
        "state/heartbeat_status.json",
        "state/snapshots.jsonl",
    ] {
        assert!(dir.path().join(path).is_file(), "missing {path}");
    }
    for path in ["artifacts/dispatch", "checkpoints", "handoff"] {
        assert!(dir.path().join(path).is_dir(), "missing {path}/");
    }

    cli().args(&["check", "--root", &root]).passes();
}

#[test]
fn init_is_idempotent() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_str().unwrap().to_string();
    cli().args(&["init", "--root", &root]).passes();

    // Seed a lease file, then re-init: existing content is left alone
    std::fs::write(
        dir.path().join("state/process_leases.json"),
        "[{\"sentinel\": true}]",
    )
    .unwrap();
    cli().args(&["init", "--root", &root]).passes();

    let content = std::fs::read_to_string(dir.path().join("state/process_leases.json")).unwrap();
    assert!(content.contains("sentinel"));
}

#[test]
fn init_fails_on_path_type_conflict() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_str().unwrap().to_string();
    // A file where the state directory should be
    std::fs::write(dir.path().join("state"), "not a directory").unwrap();

    let stderr = cli().args(&["init", "--root", &root]).fails_with(1);
    assert!(stderr.contains("E_INIT_FAILED"));
}
