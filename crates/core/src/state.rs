// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline state snapshot: the mutable head of a run's ledger.

use crate::run::{RunId, TaskId};
use crate::step::{StepContract, StepId};
use crate::SCHEMA_VERSION;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Overall lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStatus {
    Planning,
    Analysis,
    Freeze,
    Execute,
    Accept,
    Done,
    Draining,
    Blocked,
}

impl PipelineStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStatus::Done)
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStatus::Planning => "PLANNING",
            PipelineStatus::Analysis => "ANALYSIS",
            PipelineStatus::Freeze => "FREEZE",
            PipelineStatus::Execute => "EXECUTE",
            PipelineStatus::Accept => "ACCEPT",
            PipelineStatus::Done => "DONE",
            PipelineStatus::Draining => "DRAINING",
            PipelineStatus::Blocked => "BLOCKED",
        };
        write!(f, "{s}")
    }
}

/// Lifecycle state of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepState {
    Pending,
    Running,
    Accepted,
    Failed,
}

impl StepState {
    /// Whether resume may re-dispatch this step. Accepted steps never replay.
    pub fn is_resumable(&self) -> bool {
        !matches!(self, StepState::Accepted)
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepState::Pending => "PENDING",
            StepState::Running => "RUNNING",
            StepState::Accepted => "ACCEPTED",
            StepState::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

/// Per-step entry in the ordered step list of the pipeline snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEntry {
    pub id: StepId,
    pub state: StepState,
}

/// Identity of a successor controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessorIdentity {
    pub thread_id: String,
    pub pid: u32,
}

/// Succession sub-record: the only place takeover history lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Succession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_takeover_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successor: Option<SuccessorIdentity>,
}

/// Snapshot of a run's pipeline state.
///
/// Top-level shape is closed; extensibility lives inside `role_lifecycle`
/// and the `succession` sub-record. Mutated only by the lifecycle runtime's
/// transition and acceptance paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub schema_version: String,
    pub task_id: TaskId,
    pub run_id: RunId,
    pub goal: String,
    pub status: PipelineStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<StepId>,
    pub steps: Vec<StepEntry>,
    /// Free-form lifecycle subkeys, e.g. `step:<id> -> failed_non_adopted_lease`.
    #[serde(default)]
    pub role_lifecycle: BTreeMap<String, String>,
    #[serde(default)]
    pub succession: Succession,
    pub updated_at: DateTime<Utc>,
}

impl PipelineState {
    pub fn new(
        task_id: TaskId,
        run_id: RunId,
        goal: impl Into<String>,
        steps: &[StepContract],
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            task_id,
            run_id,
            goal: goal.into(),
            status: PipelineStatus::Planning,
            current_step: None,
            steps: steps
                .iter()
                .map(|s| StepEntry {
                    id: s.id.clone(),
                    state: StepState::Pending,
                })
                .collect(),
            role_lifecycle: BTreeMap::new(),
            succession: Succession::default(),
            updated_at: now,
        }
    }

    pub fn step_state(&self, id: &StepId) -> Option<StepState> {
        self.steps.iter().find(|e| &e.id == id).map(|e| e.state)
    }

    pub fn set_step_state(&mut self, id: &StepId, state: StepState) {
        if let Some(entry) = self.steps.iter_mut().find(|e| &e.id == id) {
            entry.state = state;
        }
    }

    /// Steps a resume is allowed to pick up: PENDING, RUNNING, or FAILED.
    pub fn resumable_steps(&self) -> Vec<StepId> {
        self.steps
            .iter()
            .filter(|e| e.state.is_resumable())
            .map(|e| e.id.clone())
            .collect()
    }

    /// Steps currently marked RUNNING (lease holders at interruption time).
    pub fn running_steps(&self) -> Vec<StepId> {
        self.steps
            .iter()
            .filter(|e| e.state == StepState::Running)
            .map(|e| e.id.clone())
            .collect()
    }

    pub fn all_accepted(&self) -> bool {
        self.steps.iter().all(|e| e.state == StepState::Accepted)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
