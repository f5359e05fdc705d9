// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use daokit_core::test_support::pipeline_state;
use daokit_core::{CountingTokenGen, EventType, FakeClock};
use daokit_storage::{FsBackend, Ledger, RootLayout};
use std::time::Duration as StdDuration;
use tempfile::{tempdir, TempDir};

fn registry(clock: &FakeClock) -> LeaseRegistry<FakeClock, CountingTokenGen> {
    LeaseRegistry::new(
        LeaseConfig { ttl_seconds: 600 },
        clock.clone(),
        CountingTokenGen::new("token"),
    )
}

fn ledger_with_running(clock: &FakeClock, running: &[&str]) -> (Ledger, TempDir) {
    let dir = tempdir().unwrap();
    let backend = FsBackend::new(RootLayout::new(dir.path()));
    let mut ledger = Ledger::open(Box::new(backend)).unwrap();

    let mut state = pipeline_state(&["S1", "S2"]);
    for id in running {
        state.set_step_state(&daokit_core::StepId::new(*id), daokit_core::StepState::Running);
    }
    state.updated_at = clock.now();
    ledger
        .commit_state(
            &state,
            EventDraft::new(EventType::RunStarted, state.task_id.clone(), state.run_id.clone()),
            clock.now(),
        )
        .unwrap();
    (ledger, dir)
}

fn key() -> RunKey {
    RunKey::new("T1", "R1")
}

fn holder(thread: &str) -> SuccessorId {
    SuccessorId {
        thread_id: ThreadId::new(thread),
        pid: 100,
    }
}

#[test]
fn register_creates_active_lease_with_ttl() {
    let clock = FakeClock::new();
    let (mut ledger, _dir) = ledger_with_running(&clock, &[]);
    let registry = registry(&clock);

    let lease = registry
        .register(&mut ledger, "dispatch", &key(), &StepId::new("S1"), &holder("thread-1"))
        .unwrap();
    assert_eq!(lease.status, LeaseStatus::Active);
    assert_eq!(lease.lease_token, "token-1");
    assert_eq!((lease.expires_at - clock.now()).num_seconds(), 600);
}

#[test]
fn second_active_lease_for_same_step_is_rejected() {
    let clock = FakeClock::new();
    let (mut ledger, _dir) = ledger_with_running(&clock, &[]);
    let registry = registry(&clock);

    registry
        .register(&mut ledger, "dispatch", &key(), &StepId::new("S1"), &holder("thread-1"))
        .unwrap();
    let err = registry
        .register(&mut ledger, "dispatch", &key(), &StepId::new("S1"), &holder("thread-2"))
        .unwrap_err();
    assert!(matches!(err, LeaseOpError::AlreadyHeld { .. }));

    // A different step is fine
    assert!(registry
        .register(&mut ledger, "dispatch", &key(), &StepId::new("S2"), &holder("thread-2"))
        .is_ok());
}

#[test]
fn expired_lease_is_superseded_on_register() {
    let clock = FakeClock::new();
    let (mut ledger, _dir) = ledger_with_running(&clock, &[]);
    let registry = registry(&clock);

    registry
        .register(&mut ledger, "dispatch", &key(), &StepId::new("S1"), &holder("thread-1"))
        .unwrap();
    clock.advance(StdDuration::from_secs(601));

    let lease = registry
        .register(&mut ledger, "dispatch", &key(), &StepId::new("S1"), &holder("thread-2"))
        .unwrap();
    assert_eq!(lease.thread_id, ThreadId::new("thread-2"));
    // Only one lease remains for the pair
    assert_eq!(ledger.leases().unwrap().len(), 1);
}

#[test]
fn renew_extends_expiry_release_ends_it() {
    let clock = FakeClock::new();
    let (mut ledger, _dir) = ledger_with_running(&clock, &[]);
    let registry = registry(&clock);
    let step = StepId::new("S1");

    let lease = registry
        .register(&mut ledger, "dispatch", &key(), &step, &holder("thread-1"))
        .unwrap();

    clock.advance(StdDuration::from_secs(300));
    let renewed = registry
        .renew(&mut ledger, &key(), &step, &lease.lease_token)
        .unwrap();
    assert_eq!((renewed.expires_at - clock.now()).num_seconds(), 600);

    let released = registry
        .release(&mut ledger, &key(), &step, &lease.lease_token)
        .unwrap();
    assert_eq!(released.status, LeaseStatus::Released);
}

#[test]
fn wrong_token_is_ownership_mismatch() {
    let clock = FakeClock::new();
    let (mut ledger, _dir) = ledger_with_running(&clock, &[]);
    let registry = registry(&clock);
    let step = StepId::new("S1");

    registry
        .register(&mut ledger, "dispatch", &key(), &step, &holder("thread-1"))
        .unwrap();
    let err = registry
        .renew(&mut ledger, &key(), &step, "stolen-token")
        .unwrap_err();
    assert_eq!(err.reason_code(), "LEASE_OWNERSHIP_MISMATCH");
}

#[test]
fn mismatched_run_is_rejected() {
    let clock = FakeClock::new();
    let (mut ledger, _dir) = ledger_with_running(&clock, &[]);
    let registry = registry(&clock);
    let step = StepId::new("S1");

    let lease = registry
        .register(&mut ledger, "dispatch", &key(), &step, &holder("thread-1"))
        .unwrap();
    let other_run = RunKey::new("T1", "R2");
    let err = registry
        .renew(&mut ledger, &other_run, &step, &lease.lease_token)
        .unwrap_err();
    assert_eq!(err.reason_code(), "NO_ACTIVE_LEASE");
}

#[test]
fn operations_on_expired_lease_fail_with_lease_expired() {
    let clock = FakeClock::new();
    let (mut ledger, _dir) = ledger_with_running(&clock, &[]);
    let registry = registry(&clock);
    let step = StepId::new("S1");

    let lease = registry
        .register(&mut ledger, "dispatch", &key(), &step, &holder("thread-1"))
        .unwrap();
    clock.advance(StdDuration::from_secs(601));

    let err = registry
        .renew(&mut ledger, &key(), &step, &lease.lease_token)
        .unwrap_err();
    assert_eq!(err.reason_code(), "LEASE_EXPIRED");

    // The table now shows the lease as EXPIRED
    assert_eq!(ledger.leases().unwrap()[0].status, LeaseStatus::Expired);
}

#[test]
fn single_takeover_transfers_identity() {
    let clock = FakeClock::new();
    let (mut ledger, _dir) = ledger_with_running(&clock, &[]);
    let registry = registry(&clock);
    let step = StepId::new("S1");

    registry
        .register(&mut ledger, "dispatch", &key(), &step, &holder("thread-1"))
        .unwrap();
    let adopted = registry
        .takeover(&mut ledger, &key(), &step, &holder("thread-recover"))
        .unwrap();
    assert_eq!(adopted.thread_id, ThreadId::new("thread-recover"));

    let takeovers = ledger
        .events()
        .unwrap()
        .iter()
        .filter(|e| e.event_type == EventType::LeaseTakeover)
        .count();
    assert_eq!(takeovers, 1);
}

#[test]
fn batch_takeover_adopts_active_and_fails_uncovered_running_steps() {
    let clock = FakeClock::new();
    // S1 and S2 both RUNNING; only S1 has an adoptable lease
    let (mut ledger, _dir) = ledger_with_running(&clock, &["S1", "S2"]);
    let registry = registry(&clock);

    registry
        .register(&mut ledger, "dispatch", &key(), &StepId::new("S1"), &holder("thread-1"))
        .unwrap();

    let result = registry
        .batch_takeover_run(
            &mut ledger,
            &key(),
            &holder("thread-recover"),
            &SuccessionTrigger::operator(clock.now()),
        )
        .unwrap();
    assert_eq!(result.adopted_step_ids, vec![StepId::new("S1")]);
    assert_eq!(result.failed_step_ids, vec![StepId::new("S2")]);

    let state = ledger.require_state().unwrap();
    assert_eq!(state.succession.last_takeover_at, Some(result.takeover_at));
    assert_eq!(
        state.succession.successor.as_ref().map(|s| s.thread_id.as_str()),
        Some("thread-recover")
    );
    assert_eq!(
        state.role_lifecycle.get("step:S2").map(|s| s.as_str()),
        Some("failed_non_adopted_lease")
    );
    assert_eq!(
        state.step_state(&StepId::new("S2")),
        Some(daokit_core::StepState::Failed)
    );

    let events = ledger.events().unwrap();
    let types: Vec<EventType> = events.iter().map(|e| e.event_type).collect();
    assert!(types.contains(&EventType::LeaseAdopted));
    assert!(types.contains(&EventType::LeaseNotAdopted));
    assert!(types.contains(&EventType::StepFailed));
    assert!(types.contains(&EventType::SuccessionAccepted));

    // The acceptance records what prompted it and when it was decided
    let accepted = events
        .iter()
        .find(|e| e.event_type == EventType::SuccessionAccepted)
        .unwrap();
    assert_eq!(accepted.payload["trigger_reason"], "OPERATOR_TAKEOVER");
    assert!(accepted.payload["decision_at"].is_string());
}

#[test]
fn batch_takeover_skips_expired_leases() {
    let clock = FakeClock::new();
    let (mut ledger, _dir) = ledger_with_running(&clock, &["S1"]);
    let registry = registry(&clock);

    registry
        .register(&mut ledger, "dispatch", &key(), &StepId::new("S1"), &holder("thread-1"))
        .unwrap();
    clock.advance(StdDuration::from_secs(601));

    let result = registry
        .batch_takeover_run(
            &mut ledger,
            &key(),
            &holder("thread-recover"),
            &SuccessionTrigger::lease_expired(clock.now()),
        )
        .unwrap();
    assert!(result.adopted_step_ids.is_empty());
    assert_eq!(result.failed_step_ids, vec![StepId::new("S1")]);
}

#[test]
fn second_takeover_finds_nothing_left_to_adopt() {
    let clock = FakeClock::new();
    let (mut ledger, _dir) = ledger_with_running(&clock, &["S1"]);
    let registry = registry(&clock);

    registry
        .register(&mut ledger, "dispatch", &key(), &StepId::new("S1"), &holder("thread-1"))
        .unwrap();

    let first = registry
        .batch_takeover_run(
            &mut ledger,
            &key(),
            &holder("thread-a"),
            &SuccessionTrigger::operator(clock.now()),
        )
        .unwrap();
    assert_eq!(first.adopted_step_ids, vec![StepId::new("S1")]);

    // The second candidate linearises behind the first: the lease now belongs
    // to thread-a and is still adoptable, transferring onward.
    let second = registry
        .batch_takeover_run(
            &mut ledger,
            &key(),
            &holder("thread-b"),
            &SuccessionTrigger::operator(clock.now()),
        )
        .unwrap();
    assert_eq!(second.adopted_step_ids, vec![StepId::new("S1")]);
    let leases = ledger.leases().unwrap();
    assert_eq!(leases[0].thread_id, ThreadId::new("thread-b"));
}
