// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pluggable persistence behind the ledger façade.
//!
//! Two interchangeable implementations exist: the file-tree backend and the
//! transactional table backend. Contract parity between them is mandatory;
//! selection is internal (environment or settings file), never a public
//! CLI argument.

use crate::fs::FsBackend;
use crate::layout::RootLayout;
use crate::table::TableBackend;
use daokit_core::{CheckpointRecord, EventRecord, HeartbeatRecord, PipelineState, ProcessLease};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

/// Environment variable selecting the state backend.
pub const BACKEND_ENV: &str = "DAOKIT_STATE_BACKEND";

/// Errors that can occur in backend operations
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Corrupt record in {domain} at {location}: {message}")]
    Corrupt {
        domain: &'static str,
        location: String,
        message: String,
    },
}

/// A pipeline snapshot journal entry.
///
/// `seq` is the event_id of the announcing event; snapshot and event share
/// one write boundary so a reader never observes one without the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub seq: u64,
    pub state: PipelineState,
}

/// Persistence over the five ledger domains.
pub trait StateBackend: Send {
    fn load_state(&self) -> Result<Option<PipelineState>, BackendError>;
    fn save_state(&mut self, state: &PipelineState) -> Result<(), BackendError>;

    fn append_event(&mut self, record: &EventRecord) -> Result<(), BackendError>;
    fn read_events(&self) -> Result<Vec<EventRecord>, BackendError>;

    fn load_leases(&self) -> Result<Vec<ProcessLease>, BackendError>;
    fn save_leases(&mut self, leases: &[ProcessLease]) -> Result<(), BackendError>;

    fn load_heartbeat(&self) -> Result<Option<HeartbeatRecord>, BackendError>;
    fn save_heartbeat(&mut self, record: &HeartbeatRecord) -> Result<(), BackendError>;

    fn append_snapshot(&mut self, entry: &SnapshotEntry) -> Result<(), BackendError>;
    fn read_snapshots(&self) -> Result<Vec<SnapshotEntry>, BackendError>;

    fn append_checkpoint(&mut self, record: &CheckpointRecord) -> Result<(), BackendError>;
    /// Overwrite an existing checkpoint record (used to clear `valid`).
    fn update_checkpoint(&mut self, record: &CheckpointRecord) -> Result<(), BackendError>;
    /// All checkpoint records, oldest first.
    fn list_checkpoints(&self) -> Result<Vec<CheckpointRecord>, BackendError>;
}

/// Which backend implementation to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Fs,
    Sqlite,
}

impl BackendKind {
    /// Resolve from `DAOKIT_STATE_BACKEND`; unknown values fall back to fs
    /// with a warning rather than failing a run over a typo.
    pub fn from_env() -> Self {
        match std::env::var(BACKEND_ENV).ok().as_deref() {
            Some("sqlite") | Some("table") => BackendKind::Sqlite,
            Some("fs") | None => BackendKind::Fs,
            Some(other) => {
                tracing::warn!(value = other, "unknown state backend, using fs");
                BackendKind::Fs
            }
        }
    }
}

/// Open the selected backend for a runtime root.
pub fn open_backend(
    root: &Path,
    kind: BackendKind,
) -> Result<Box<dyn StateBackend>, BackendError> {
    let layout = RootLayout::new(root);
    match kind {
        BackendKind::Fs => Ok(Box::new(FsBackend::new(layout))),
        BackendKind::Sqlite => Ok(Box::new(TableBackend::open(&layout)?)),
    }
}
