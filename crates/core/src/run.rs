// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run identity: every ledger record correlates to one `(task_id, run_id)`.

use crate::step::StepId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifier of the task a run belongs to.
    #[derive(Default)]
    pub struct TaskId;
}

crate::define_id! {
    /// Identifier of one execution attempt of a task.
    #[derive(Default)]
    pub struct RunId;
}

/// Correlation key shared by events, leases, and artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunKey {
    pub task_id: TaskId,
    pub run_id: RunId,
}

impl RunKey {
    pub fn new(task_id: impl Into<TaskId>, run_id: impl Into<RunId>) -> Self {
        Self {
            task_id: task_id.into(),
            run_id: run_id.into(),
        }
    }

    /// Correlation triple for an event touching a specific step.
    pub fn with_step(&self, step_id: impl Into<StepId>) -> (TaskId, RunId, Option<StepId>) {
        (self.task_id.clone(), self.run_id.clone(), Some(step_id.into()))
    }
}

impl std::fmt::Display for RunKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.task_id, self.run_id)
    }
}
