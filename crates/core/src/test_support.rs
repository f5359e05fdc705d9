// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders shared by this crate's tests and, behind the
//! `test-support` feature, by other crates' tests.

use crate::lease::{ProcessLease, ThreadId};
use crate::run::{RunId, TaskId};
use crate::state::PipelineState;
use crate::step::{ExpectedOutput, StepContract, StepId};
use chrono::{DateTime, Utc};

/// A minimal valid step contract carrying the evidence trio.
pub fn step_contract(id: &str) -> StepContract {
    StepContract {
        id: StepId::new(id),
        title: format!("step {id}"),
        category: "build".to_string(),
        goal: format!("goal for {id}"),
        actions: vec!["execute".to_string()],
        acceptance_criteria: vec!["expected outputs are present".to_string()],
        expected_outputs: vec![
            ExpectedOutput::new("report", format!("steps/{id}/report.md")),
            ExpectedOutput::new("verification.log", format!("steps/{id}/verification.log")),
            ExpectedOutput::new("audit-summary", format!("steps/{id}/audit-summary.md")),
        ],
        dependencies: Vec::new(),
        allowed_scope: None,
        retrieval_policy: None,
        require_evidence: true,
    }
}

/// A fresh pipeline state for task T1 / run R1 over the given step ids.
pub fn pipeline_state(step_ids: &[&str]) -> PipelineState {
    let steps: Vec<StepContract> = step_ids.iter().map(|id| step_contract(id)).collect();
    PipelineState::new(
        TaskId::new("T1"),
        RunId::new("R1"),
        "demo goal",
        &steps,
        Utc::now(),
    )
}

/// An ACTIVE dispatch-lane lease for T1/R1 on the given step.
pub fn lease(step_id: &str, expires_at: DateTime<Utc>) -> ProcessLease {
    ProcessLease::new(
        "dispatch",
        TaskId::new("T1"),
        RunId::new("R1"),
        StepId::new(step_id),
        ThreadId::new("thread-1"),
        1234,
        "token-1",
        expires_at,
    )
}

#[cfg(any(test, feature = "test-support"))]
pub mod strategies {
    //! Proptest strategies for contract-level properties.

    use proptest::prelude::*;

    /// Step-id-shaped strings: short, ASCII, non-empty.
    pub fn arb_step_id() -> impl Strategy<Value = String> {
        "[A-Z][A-Z0-9]{0,7}".prop_map(|s| s)
    }

    /// Goal-shaped free text.
    pub fn arb_goal() -> impl Strategy<Value = String> {
        "[a-z ]{1,40}".prop_map(|s| s)
    }
}
