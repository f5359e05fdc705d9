// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process lease: time-bounded ownership of a `(run, step)` by an executor.

use crate::run::{RunId, TaskId};
use crate::step::StepId;
use crate::SCHEMA_VERSION;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Identity of the logical executor thread holding a lease.
    #[derive(Default)]
    pub struct ThreadId;
}

/// Lease lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaseStatus {
    Active,
    Released,
    Expired,
}

impl fmt::Display for LeaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LeaseStatus::Active => "ACTIVE",
            LeaseStatus::Released => "RELEASED",
            LeaseStatus::Expired => "EXPIRED",
        };
        write!(f, "{s}")
    }
}

/// A persisted lease record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessLease {
    pub schema_version: String,
    /// Logical lane of the holder, e.g. `controller` or `dispatch`.
    pub lane: String,
    pub step_id: StepId,
    pub task_id: TaskId,
    pub run_id: RunId,
    pub thread_id: ThreadId,
    pub pid: u32,
    pub lease_token: String,
    pub expires_at: DateTime<Utc>,
    pub status: LeaseStatus,
}

impl ProcessLease {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lane: impl Into<String>,
        task_id: TaskId,
        run_id: RunId,
        step_id: StepId,
        thread_id: ThreadId,
        pid: u32,
        lease_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            lane: lane.into(),
            step_id,
            task_id,
            run_id,
            thread_id,
            pid,
            lease_token: lease_token.into(),
            expires_at,
            status: LeaseStatus::Active,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// A lease is transferable only while ACTIVE and unexpired.
    pub fn is_transferable(&self, now: DateTime<Utc>) -> bool {
        self.status == LeaseStatus::Active && !self.is_expired(now)
    }

    pub fn matches(&self, task_id: &TaskId, run_id: &RunId, step_id: &StepId) -> bool {
        &self.task_id == task_id && &self.run_id == run_id && &self.step_id == step_id
    }
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
