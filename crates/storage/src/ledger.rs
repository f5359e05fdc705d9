// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed ledger façade over a state backend.
//!
//! All subsystems publish events through here: the ledger assigns monotonic
//! `event_id`s, stamps timestamps, refuses duplicate `dedup_key` appends, and
//! pairs every snapshot append with its announcing event so readers never
//! observe one without the other.

use crate::backend::{BackendError, SnapshotEntry, StateBackend};
use chrono::{DateTime, Utc};
use daokit_core::{
    CheckpointRecord, EventDraft, EventRecord, HeartbeatRecord, PipelineState, ProcessLease,
};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

/// Errors from ledger operations. Fatal to the current run.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("no pipeline state in ledger")]
    NoState,
}

/// Single-writer ledger for one `(task_id, run_id)` root.
pub struct Ledger {
    backend: Box<dyn StateBackend>,
    next_event_id: u64,
    dedup_keys: HashSet<String>,
}

impl Ledger {
    /// Open the ledger, scanning the journal to restore the id counter and
    /// the dedup-key set.
    pub fn open(backend: Box<dyn StateBackend>) -> Result<Self, LedgerError> {
        let events = backend.read_events()?;
        let next_event_id = events.iter().map(|e| e.event_id).max().unwrap_or(0) + 1;
        let dedup_keys = events
            .iter()
            .filter_map(|e| e.dedup_key.clone())
            .collect::<HashSet<_>>();

        Ok(Self {
            backend,
            next_event_id,
            dedup_keys,
        })
    }

    /// The id the next appended event will receive.
    pub fn next_event_id(&self) -> u64 {
        self.next_event_id
    }

    /// Append an event.
    ///
    /// Returns `Ok(None)` when the draft carries a `dedup_key` that has
    /// already been appended — the suppression mechanism behind
    /// one-event-per-silence-streak.
    pub fn append(
        &mut self,
        draft: EventDraft,
        now: DateTime<Utc>,
    ) -> Result<Option<EventRecord>, LedgerError> {
        if let Some(key) = &draft.dedup_key {
            if self.dedup_keys.contains(key) {
                debug!(dedup_key = %key, "suppressing duplicate event");
                return Ok(None);
            }
        }

        let record = EventRecord::from_draft(draft, self.next_event_id, now);
        self.backend.append_event(&record)?;
        self.next_event_id += 1;
        if let Some(key) = &record.dedup_key {
            self.dedup_keys.insert(key.clone());
        }
        Ok(Some(record))
    }

    /// Persist a new pipeline snapshot together with its announcing event.
    ///
    /// This is the shared write boundary: the snapshot entry carries the
    /// event's id as its `seq`, and `snapshots()` hides entries whose event
    /// has not landed, so readers observe the pair or neither.
    pub fn commit_state(
        &mut self,
        state: &PipelineState,
        draft: EventDraft,
        now: DateTime<Utc>,
    ) -> Result<EventRecord, LedgerError> {
        let record = EventRecord::from_draft(draft, self.next_event_id, now);

        self.backend.save_state(state)?;
        self.backend.append_snapshot(&SnapshotEntry {
            seq: record.event_id,
            state: state.clone(),
        })?;
        self.backend.append_event(&record)?;

        self.next_event_id += 1;
        if let Some(key) = &record.dedup_key {
            self.dedup_keys.insert(key.clone());
        }
        Ok(record)
    }

    pub fn state(&self) -> Result<Option<PipelineState>, LedgerError> {
        Ok(self.backend.load_state()?)
    }

    pub fn require_state(&self) -> Result<PipelineState, LedgerError> {
        self.state()?.ok_or(LedgerError::NoState)
    }

    pub fn events(&self) -> Result<Vec<EventRecord>, LedgerError> {
        Ok(self.backend.read_events()?)
    }

    /// Snapshot entries whose announcing event is present in the journal.
    pub fn snapshots(&self) -> Result<Vec<SnapshotEntry>, LedgerError> {
        let last_event = self.next_event_id.saturating_sub(1);
        let snapshots = self.backend.read_snapshots()?;
        Ok(snapshots
            .into_iter()
            .filter(|s| s.seq <= last_event)
            .collect())
    }

    pub fn leases(&self) -> Result<Vec<ProcessLease>, LedgerError> {
        Ok(self.backend.load_leases()?)
    }

    pub fn save_leases(&mut self, leases: &[ProcessLease]) -> Result<(), LedgerError> {
        Ok(self.backend.save_leases(leases)?)
    }

    pub fn heartbeat(&self) -> Result<Option<HeartbeatRecord>, LedgerError> {
        Ok(self.backend.load_heartbeat()?)
    }

    pub fn save_heartbeat(&mut self, record: &HeartbeatRecord) -> Result<(), LedgerError> {
        Ok(self.backend.save_heartbeat(record)?)
    }

    pub fn checkpoints(&self) -> Result<Vec<CheckpointRecord>, LedgerError> {
        Ok(self.backend.list_checkpoints()?)
    }

    pub fn append_checkpoint(&mut self, record: &CheckpointRecord) -> Result<(), LedgerError> {
        Ok(self.backend.append_checkpoint(record)?)
    }

    pub fn update_checkpoint(&mut self, record: &CheckpointRecord) -> Result<(), LedgerError> {
        Ok(self.backend.update_checkpoint(record)?)
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
