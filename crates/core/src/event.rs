// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only event journal records.
//!
//! The event type set is closed for the `1.0.0` contract family; new detail
//! goes into the open `payload` object, never into new top-level fields.

use crate::run::{RunId, TaskId};
use crate::step::StepId;
use crate::SCHEMA_VERSION;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed enum of journal event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    LifecycleTransition,
    RunStarted,
    RunDone,
    RunFailed,
    StepStarted,
    StepCompleted,
    StepFailed,
    DispatchCompleted,
    HeartbeatWarning,
    HeartbeatStale,
    LeaseTakeover,
    LeaseAdopted,
    LeaseNotAdopted,
    SuccessionAccepted,
    ReworkEmitted,
    HumanInput,
    AcceptancePassed,
    AcceptanceFailed,
    CheckpointPersisted,
    HandoffCreated,
    HandoffApplied,
}

impl EventType {
    pub fn name(&self) -> &'static str {
        match self {
            EventType::LifecycleTransition => "LIFECYCLE_TRANSITION",
            EventType::RunStarted => "RUN_STARTED",
            EventType::RunDone => "RUN_DONE",
            EventType::RunFailed => "RUN_FAILED",
            EventType::StepStarted => "STEP_STARTED",
            EventType::StepCompleted => "STEP_COMPLETED",
            EventType::StepFailed => "STEP_FAILED",
            EventType::DispatchCompleted => "DISPATCH_COMPLETED",
            EventType::HeartbeatWarning => "HEARTBEAT_WARNING",
            EventType::HeartbeatStale => "HEARTBEAT_STALE",
            EventType::LeaseTakeover => "LEASE_TAKEOVER",
            EventType::LeaseAdopted => "LEASE_ADOPTED",
            EventType::LeaseNotAdopted => "LEASE_NOT_ADOPTED",
            EventType::SuccessionAccepted => "SUCCESSION_ACCEPTED",
            EventType::ReworkEmitted => "REWORK_EMITTED",
            EventType::HumanInput => "HUMAN_INPUT",
            EventType::AcceptancePassed => "ACCEPTANCE_PASSED",
            EventType::AcceptanceFailed => "ACCEPTANCE_FAILED",
            EventType::CheckpointPersisted => "CHECKPOINT_PERSISTED",
            EventType::HandoffCreated => "HANDOFF_CREATED",
            EventType::HandoffApplied => "HANDOFF_APPLIED",
        }
    }

    /// Default severity for events of this type.
    pub fn default_severity(&self) -> Severity {
        match self {
            EventType::HeartbeatWarning => Severity::Warning,
            EventType::HeartbeatStale
            | EventType::StepFailed
            | EventType::RunFailed
            | EventType::AcceptanceFailed
            | EventType::LeaseNotAdopted => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Event severity as surfaced to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

/// An event as proposed by a subsystem, before the ledger assigns its
/// `event_id` and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub event_type: EventType,
    pub severity: Severity,
    pub task_id: TaskId,
    pub run_id: RunId,
    pub step_id: Option<StepId>,
    pub dedup_key: Option<String>,
    pub payload: serde_json::Value,
}

impl EventDraft {
    pub fn new(event_type: EventType, task_id: TaskId, run_id: RunId) -> Self {
        Self {
            severity: event_type.default_severity(),
            event_type,
            task_id,
            run_id,
            step_id: None,
            dedup_key: None,
            payload: serde_json::Value::Null,
        }
    }

    pub fn step(mut self, step_id: impl Into<StepId>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn dedup_key(mut self, key: impl Into<String>) -> Self {
        self.dedup_key = Some(key.into());
        self
    }

    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// A persisted journal entry. Never rewritten once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub schema_version: String,
    pub event_id: u64,
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub severity: Severity,
    pub task_id: TaskId,
    pub run_id: RunId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<StepId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup_key: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

impl EventRecord {
    /// Materialise a draft into a journal record.
    pub fn from_draft(draft: EventDraft, event_id: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            event_id,
            timestamp,
            event_type: draft.event_type,
            severity: draft.severity,
            task_id: draft.task_id,
            run_id: draft.run_id,
            step_id: draft.step_id,
            dedup_key: draft.dedup_key,
            payload: draft.payload,
        }
    }

    pub fn log_summary(&self) -> String {
        let t = self.event_type.name();
        match &self.step_id {
            Some(step) => format!(
                "#{} {} task={} run={} step={}",
                self.event_id, t, self.task_id, self.run_id, step
            ),
            None => format!(
                "#{} {} task={} run={}",
                self.event_id, t, self.task_id, self.run_id
            ),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
