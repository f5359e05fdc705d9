// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{pipeline_state, step_contract};
use yare::parameterized;

#[test]
fn new_state_is_planning_with_pending_steps() {
    let state = pipeline_state(&["S1", "S2"]);
    assert_eq!(state.schema_version, crate::SCHEMA_VERSION);
    assert_eq!(state.status, PipelineStatus::Planning);
    assert_eq!(state.steps.len(), 2);
    assert!(state
        .steps
        .iter()
        .all(|e| e.state == StepState::Pending));
    assert!(state.current_step.is_none());
}

#[test]
fn step_state_lookup_and_update() {
    let mut state = pipeline_state(&["S1", "S2"]);
    assert_eq!(state.step_state(&StepId::new("S1")), Some(StepState::Pending));

    state.set_step_state(&StepId::new("S1"), StepState::Accepted);
    assert_eq!(
        state.step_state(&StepId::new("S1")),
        Some(StepState::Accepted)
    );
    // Unknown step is a no-op
    state.set_step_state(&StepId::new("S9"), StepState::Failed);
    assert_eq!(state.step_state(&StepId::new("S9")), None);
}

#[parameterized(
    pending = { StepState::Pending, true },
    running = { StepState::Running, true },
    failed = { StepState::Failed, true },
    accepted = { StepState::Accepted, false },
)]
fn resumable_excludes_only_accepted(state: StepState, resumable: bool) {
    assert_eq!(state.is_resumable(), resumable);
}

#[test]
fn resumable_steps_skip_accepted() {
    let mut state = pipeline_state(&["S1", "S2", "S3"]);
    state.set_step_state(&StepId::new("S1"), StepState::Accepted);
    state.set_step_state(&StepId::new("S2"), StepState::Running);
    assert_eq!(
        state.resumable_steps(),
        vec![StepId::new("S2"), StepId::new("S3")]
    );
    assert_eq!(state.running_steps(), vec![StepId::new("S2")]);
    assert!(!state.all_accepted());
}

#[test]
fn status_serializes_screaming_snake() {
    let json = serde_json::to_string(&PipelineStatus::Draining).unwrap();
    assert_eq!(json, "\"DRAINING\"");
    let back: PipelineStatus = serde_json::from_str("\"BLOCKED\"").unwrap();
    assert_eq!(back, PipelineStatus::Blocked);
}

#[test]
fn serde_round_trip_with_role_lifecycle_and_succession() {
    let mut state = pipeline_state(&["S1"]);
    state
        .role_lifecycle
        .insert("step:S1".to_string(), "failed_non_adopted_lease".to_string());
    state.succession.successor = Some(SuccessorIdentity {
        thread_id: "thread-recover".to_string(),
        pid: 4242,
    });
    let json = serde_json::to_string(&state).unwrap();
    let back: PipelineState = serde_json::from_str(&json).unwrap();
    assert_eq!(state, back);
}

#[test]
fn new_state_records_step_order_from_contracts() {
    let steps = vec![step_contract("B"), step_contract("A")];
    let state = PipelineState::new(
        TaskId::new("T1"),
        RunId::new("R1"),
        "demo",
        &steps,
        chrono::Utc::now(),
    );
    let ids: Vec<&str> = state.steps.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["B", "A"]);
}
