// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator diagnostics derived from the ledger. Read-only.

use daokit_core::{
    Clock, EventRecord, EventType, HeartbeatState, LeaseStatus, ProcessLease, Severity, StepId,
};
use daokit_storage::{Ledger, LedgerError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current heartbeat freshness as an operator sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatFreshnessDiagnostic {
    pub status: HeartbeatState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    /// Seconds since the last observed activity, if any was ever observed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silence_seconds: Option<u64>,
    pub warning_after_seconds: u64,
    pub stale_after_seconds: u64,
}

/// Lease state, either as a point-in-time snapshot or sourced from the
/// journal's lease events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LeaseTransitionDiagnostic {
    Snapshot {
        leases: Vec<LeaseSnapshotEntry>,
    },
    EventSourced {
        step_id: Option<StepId>,
        from_status: LeaseStatus,
        to_status: LeaseStatus,
        transitioned_at: DateTime<Utc>,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseSnapshotEntry {
    pub step_id: StepId,
    pub lane: String,
    pub thread_id: String,
    pub status: LeaseStatus,
    pub expires_at: DateTime<Utc>,
}

/// One succession acceptance, with the decision latency derived from its
/// event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeoverDiagnostic {
    pub trigger_reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_at: Option<DateTime<Utc>>,
    pub takeover_at: DateTime<Utc>,
    /// `takeover_at - decision_at`; negative values are rejected to null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_latency_seconds: Option<u64>,
    pub adopted_step_ids: Vec<StepId>,
    pub failed_step_ids: Vec<StepId>,
}

/// One row of the merged operator timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub occurred_at: DateTime<Utc>,
    pub event_id: u64,
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<StepId>,
    pub severity: Severity,
    pub task_id: String,
    pub run_id: String,
}

/// Deterministically ordered heartbeat/lease/takeover history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorTimelineView {
    pub entries: Vec<TimelineEntry>,
}

/// Build the heartbeat freshness diagnostic from the persisted record.
pub fn heartbeat_freshness<C: Clock>(
    ledger: &Ledger,
    clock: &C,
) -> Result<Option<HeartbeatFreshnessDiagnostic>, LedgerError> {
    let Some(record) = ledger.heartbeat()? else {
        return Ok(None);
    };
    let silence_seconds = record
        .last_heartbeat_at
        .map(|last| (clock.now() - last).num_seconds().max(0) as u64);
    Ok(Some(HeartbeatFreshnessDiagnostic {
        status: record.status,
        reason_code: record.reason_code,
        silence_seconds,
        warning_after_seconds: record.warning_after_seconds,
        stale_after_seconds: record.stale_after_seconds,
    }))
}

/// Snapshot form of the lease diagnostic.
pub fn lease_snapshot(ledger: &Ledger) -> Result<LeaseTransitionDiagnostic, LedgerError> {
    let leases = ledger.leases()?;
    Ok(LeaseTransitionDiagnostic::Snapshot {
        leases: leases.iter().map(snapshot_entry).collect(),
    })
}

fn snapshot_entry(lease: &ProcessLease) -> LeaseSnapshotEntry {
    LeaseSnapshotEntry {
        step_id: lease.step_id.clone(),
        lane: lease.lane.clone(),
        thread_id: lease.thread_id.to_string(),
        status: lease.status,
        expires_at: lease.expires_at,
    }
}

/// All succession acceptances recorded in the journal, oldest first.
pub fn takeovers(ledger: &Ledger) -> Result<Vec<TakeoverDiagnostic>, LedgerError> {
    let mut diagnostics = Vec::new();
    for event in ledger.events()? {
        if event.event_type != EventType::SuccessionAccepted {
            continue;
        }
        diagnostics.push(takeover_from_event(&event));
    }
    Ok(diagnostics)
}

fn takeover_from_event(event: &EventRecord) -> TakeoverDiagnostic {
    let payload = &event.payload;
    let takeover_at = payload
        .get("takeover_at")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(event.timestamp);
    let decision_at = payload
        .get("decision_at")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc));

    // Negative latency means clocks disagreed; report nothing rather than
    // a nonsense number.
    let decision_latency_seconds = decision_at.and_then(|decision| {
        let latency = (takeover_at - decision).num_seconds();
        if latency >= 0 {
            Some(latency as u64)
        } else {
            None
        }
    });

    let step_ids = |key: &str| -> Vec<StepId> {
        payload
            .get(key)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(StepId::new))
                    .collect()
            })
            .unwrap_or_default()
    };

    TakeoverDiagnostic {
        trigger_reason: payload
            .get("trigger_reason")
            .and_then(|v| v.as_str())
            .unwrap_or("succession")
            .to_string(),
        decision_at,
        takeover_at,
        decision_latency_seconds,
        adopted_step_ids: step_ids("adopted_step_ids"),
        failed_step_ids: step_ids("failed_step_ids"),
    }
}

/// Event types that belong on the operator timeline.
fn on_timeline(event_type: EventType) -> bool {
    matches!(
        event_type,
        EventType::HeartbeatWarning
            | EventType::HeartbeatStale
            | EventType::LeaseTakeover
            | EventType::LeaseAdopted
            | EventType::LeaseNotAdopted
            | EventType::SuccessionAccepted
    )
}

/// Merged, deterministically ordered timeline over heartbeat, lease, and
/// takeover entries.
pub fn operator_timeline(ledger: &Ledger) -> Result<OperatorTimelineView, LedgerError> {
    let mut entries: Vec<TimelineEntry> = ledger
        .events()?
        .into_iter()
        .filter(|e| on_timeline(e.event_type))
        .map(|e| TimelineEntry {
            occurred_at: e.timestamp,
            event_id: e.event_id,
            event_type: e.event_type,
            step_id: e.step_id,
            severity: e.severity,
            task_id: e.task_id.to_string(),
            run_id: e.run_id.to_string(),
        })
        .collect();

    entries.sort_by(|a, b| {
        a.occurred_at
            .cmp(&b.occurred_at)
            .then_with(|| a.event_id.cmp(&b.event_id))
            .then_with(|| a.event_type.name().cmp(b.event_type.name()))
            .then_with(|| a.step_id.cmp(&b.step_id))
    });

    Ok(OperatorTimelineView { entries })
}

#[cfg(test)]
#[path = "observe_tests.rs"]
mod tests;
