// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{FsBackend, RootLayout};
use daokit_core::test_support::pipeline_state;
use daokit_core::{EventType, RunId, TaskId};
use tempfile::{tempdir, TempDir};

fn ledger() -> (Ledger, TempDir) {
    let dir = tempdir().unwrap();
    let backend = FsBackend::new(RootLayout::new(dir.path()));
    (Ledger::open(Box::new(backend)).unwrap(), dir)
}

fn draft(event_type: EventType) -> EventDraft {
    EventDraft::new(event_type, TaskId::new("T1"), RunId::new("R1"))
}

#[test]
fn event_ids_start_at_one_and_increase() {
    let (mut ledger, _dir) = ledger();
    let now = chrono::Utc::now();

    let a = ledger.append(draft(EventType::RunStarted), now).unwrap().unwrap();
    let b = ledger.append(draft(EventType::StepStarted), now).unwrap().unwrap();
    assert_eq!(a.event_id, 1);
    assert_eq!(b.event_id, 2);
    assert_eq!(ledger.next_event_id(), 3);
}

#[test]
fn ids_continue_after_reopen() {
    let dir = tempdir().unwrap();
    let now = chrono::Utc::now();

    {
        let backend = FsBackend::new(RootLayout::new(dir.path()));
        let mut ledger = Ledger::open(Box::new(backend)).unwrap();
        ledger.append(draft(EventType::RunStarted), now).unwrap();
        ledger.append(draft(EventType::StepStarted), now).unwrap();
    }

    let backend = FsBackend::new(RootLayout::new(dir.path()));
    let mut ledger = Ledger::open(Box::new(backend)).unwrap();
    let next = ledger.append(draft(EventType::StepCompleted), now).unwrap().unwrap();
    assert_eq!(next.event_id, 3);

    let ids: Vec<u64> = ledger.events().unwrap().iter().map(|e| e.event_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn dedup_key_suppresses_second_append() {
    let (mut ledger, _dir) = ledger();
    let now = chrono::Utc::now();
    let key = "T1|2026-01-01T00:00:00Z|NO_OUTPUT_20M";

    let first = ledger
        .append(draft(EventType::HeartbeatStale).dedup_key(key), now)
        .unwrap();
    assert!(first.is_some());

    let second = ledger
        .append(draft(EventType::HeartbeatStale).dedup_key(key), now)
        .unwrap();
    assert!(second.is_none());
    assert_eq!(ledger.events().unwrap().len(), 1);
}

#[test]
fn dedup_survives_reopen() {
    let dir = tempdir().unwrap();
    let now = chrono::Utc::now();
    let key = "T1|beat|NO_OUTPUT_20M";

    {
        let backend = FsBackend::new(RootLayout::new(dir.path()));
        let mut ledger = Ledger::open(Box::new(backend)).unwrap();
        ledger
            .append(draft(EventType::HeartbeatStale).dedup_key(key), now)
            .unwrap();
    }

    let backend = FsBackend::new(RootLayout::new(dir.path()));
    let mut ledger = Ledger::open(Box::new(backend)).unwrap();
    assert!(ledger
        .append(draft(EventType::HeartbeatStale).dedup_key(key), now)
        .unwrap()
        .is_none());
}

#[test]
fn commit_state_pairs_snapshot_with_event() {
    let (mut ledger, _dir) = ledger();
    let now = chrono::Utc::now();
    let state = pipeline_state(&["S1"]);

    let record = ledger
        .commit_state(&state, draft(EventType::LifecycleTransition), now)
        .unwrap();

    let snapshots = ledger.snapshots().unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].seq, record.event_id);
    assert_eq!(snapshots[0].state, state);
    assert_eq!(ledger.require_state().unwrap(), state);
}

#[test]
fn orphan_snapshot_is_hidden_from_readers() {
    let dir = tempdir().unwrap();
    let mut backend = FsBackend::new(RootLayout::new(dir.path()));

    // Simulate a crash between snapshot append and event append: a snapshot
    // entry exists whose announcing event never landed.
    use crate::backend::{SnapshotEntry, StateBackend};
    backend
        .append_snapshot(&SnapshotEntry {
            seq: 1,
            state: pipeline_state(&["S1"]),
        })
        .unwrap();

    let ledger = Ledger::open(Box::new(backend)).unwrap();
    assert!(ledger.snapshots().unwrap().is_empty());
}

#[test]
fn require_state_fails_on_empty_ledger() {
    let (ledger, _dir) = ledger();
    assert!(matches!(ledger.require_state(), Err(LedgerError::NoState)));
}
