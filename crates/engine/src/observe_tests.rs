// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::heartbeat::{HeartbeatConfig, HeartbeatService};
use crate::lease::{LeaseConfig, LeaseRegistry, SuccessionTrigger, SuccessorId};
use daokit_core::test_support::pipeline_state;
use daokit_core::{
    CountingTokenGen, EventDraft, FakeClock, RunKey, StepState, ThreadId,
};
use daokit_storage::{FsBackend, Ledger, RootLayout};
use std::time::Duration;
use tempfile::{tempdir, TempDir};

fn setup(clock: &FakeClock) -> (Ledger, TempDir) {
    let dir = tempdir().unwrap();
    let backend = FsBackend::new(RootLayout::new(dir.path()));
    let mut ledger = Ledger::open(Box::new(backend)).unwrap();

    let mut state = pipeline_state(&["S1"]);
    state.set_step_state(&StepId::new("S1"), StepState::Running);
    state.updated_at = clock.now();
    ledger
        .commit_state(
            &state,
            EventDraft::new(
                EventType::RunStarted,
                state.task_id.clone(),
                state.run_id.clone(),
            ),
            clock.now(),
        )
        .unwrap();
    (ledger, dir)
}

#[test]
fn heartbeat_freshness_reports_silence_and_thresholds() {
    let clock = FakeClock::new();
    let (mut ledger, dir) = setup(&clock);
    let service = HeartbeatService::new(HeartbeatConfig::default(), clock.clone());
    service.beat(&mut ledger).unwrap();

    clock.advance(Duration::from_secs(42));
    service
        .tick(&mut ledger, &dir.path().join("artifacts"))
        .unwrap();

    let diagnostic = heartbeat_freshness(&ledger, &clock).unwrap().unwrap();
    assert_eq!(diagnostic.status, HeartbeatState::Running);
    assert_eq!(diagnostic.silence_seconds, Some(42));
    assert_eq!(diagnostic.warning_after_seconds, 900);
    assert_eq!(diagnostic.stale_after_seconds, 1200);
}

#[test]
fn lease_snapshot_reflects_current_table() {
    let clock = FakeClock::new();
    let (mut ledger, _dir) = setup(&clock);
    let registry = LeaseRegistry::new(
        LeaseConfig::default(),
        clock.clone(),
        CountingTokenGen::new("token"),
    );
    registry
        .register(
            &mut ledger,
            "dispatch",
            &RunKey::new("T1", "R1"),
            &StepId::new("S1"),
            &SuccessorId {
                thread_id: ThreadId::new("thread-1"),
                pid: 7,
            },
        )
        .unwrap();

    let LeaseTransitionDiagnostic::Snapshot { leases } = lease_snapshot(&ledger).unwrap() else {
        panic!("expected snapshot variant");
    };
    assert_eq!(leases.len(), 1);
    assert_eq!(leases[0].step_id, StepId::new("S1"));
    assert_eq!(leases[0].status, LeaseStatus::Active);
}

#[test]
fn takeover_diagnostic_computes_latency() {
    let clock = FakeClock::new();
    let (mut ledger, _dir) = setup(&clock);
    let registry = LeaseRegistry::new(
        LeaseConfig::default(),
        clock.clone(),
        CountingTokenGen::new("token"),
    );
    let key = RunKey::new("T1", "R1");
    registry
        .register(
            &mut ledger,
            "dispatch",
            &key,
            &StepId::new("S1"),
            &SuccessorId {
                thread_id: ThreadId::new("thread-1"),
                pid: 7,
            },
        )
        .unwrap();
    // The staleness was observed 90 seconds before the takeover executes
    let decided_at = clock.now();
    clock.advance(Duration::from_secs(90));
    registry
        .batch_takeover_run(
            &mut ledger,
            &key,
            &SuccessorId {
                thread_id: ThreadId::new("thread-recover"),
                pid: 8,
            },
            &SuccessionTrigger::heartbeat_stale(decided_at),
        )
        .unwrap();

    let diagnostics = takeovers(&ledger).unwrap();
    assert_eq!(diagnostics.len(), 1);
    let d = &diagnostics[0];
    assert_eq!(d.adopted_step_ids, vec![StepId::new("S1")]);
    assert!(d.failed_step_ids.is_empty());
    assert_eq!(d.trigger_reason, "HEARTBEAT_STALE");
    assert_eq!(d.decision_at, Some(decided_at));
    assert_eq!(d.decision_latency_seconds, Some(90));
}

#[test]
fn negative_latency_is_rejected_to_null() {
    let event = daokit_core::EventRecord::from_draft(
        EventDraft::new(
            EventType::SuccessionAccepted,
            daokit_core::TaskId::new("T1"),
            daokit_core::RunId::new("R1"),
        )
        .payload(serde_json::json!({
            "takeover_at": "2026-01-01T00:00:00Z",
            "decision_at": "2026-01-01T01:00:00Z",
        })),
        1,
        chrono::Utc::now(),
    );
    let d = takeover_from_event(&event);
    assert!(d.decision_latency_seconds.is_none());
}

#[test]
fn timeline_is_filtered_and_ordered() {
    let clock = FakeClock::new();
    let (mut ledger, dir) = setup(&clock);

    // Produce a stale heartbeat event and a takeover
    let service = HeartbeatService::new(HeartbeatConfig::default(), clock.clone());
    service.beat(&mut ledger).unwrap();
    clock.advance(Duration::from_secs(2000));
    service
        .tick(&mut ledger, &dir.path().join("artifacts"))
        .unwrap();

    let registry = LeaseRegistry::new(
        LeaseConfig::default(),
        clock.clone(),
        CountingTokenGen::new("token"),
    );
    registry
        .batch_takeover_run(
            &mut ledger,
            &RunKey::new("T1", "R1"),
            &SuccessorId {
                thread_id: ThreadId::new("thread-recover"),
                pid: 8,
            },
            &SuccessionTrigger::heartbeat_stale(clock.now()),
        )
        .unwrap();

    let view = operator_timeline(&ledger).unwrap();
    assert!(!view.entries.is_empty());
    // RUN_STARTED is not a timeline event type
    assert!(view
        .entries
        .iter()
        .all(|e| e.event_type != EventType::RunStarted));
    // Strictly ordered by (occurred_at, event_id)
    for pair in view.entries.windows(2) {
        assert!(
            (pair[0].occurred_at, pair[0].event_id) <= (pair[1].occurred_at, pair[1].event_id)
        );
    }
    assert!(view
        .entries
        .iter()
        .any(|e| e.event_type == EventType::HeartbeatStale));
    assert!(view
        .entries
        .iter()
        .any(|e| e.event_type == EventType::SuccessionAccepted));
}
