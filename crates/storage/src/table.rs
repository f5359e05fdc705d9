// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transactional table backend over an embedded SQLite database.
//!
//! Same five domains as the file tree: event append runs inside a
//! transaction, mutable JSON blobs are single-statement upserts. Contract
//! parity with [`crate::FsBackend`] is mandatory and covered by the
//! backend-parity specs.

use crate::backend::{BackendError, SnapshotEntry, StateBackend};
use crate::layout::RootLayout;
use daokit_core::{CheckpointRecord, EventRecord, HeartbeatRecord, PipelineState, ProcessLease};
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;

/// Singleton-row keys for the mutable blob table.
const BLOB_STATE: &str = "pipeline_state";
const BLOB_LEASES: &str = "process_leases";
const BLOB_HEARTBEAT: &str = "heartbeat_status";

/// SQLite implementation of [`StateBackend`].
pub struct TableBackend {
    conn: Connection,
}

impl TableBackend {
    /// Open (or create) the database under the root's state directory.
    pub fn open(layout: &RootLayout) -> Result<Self, BackendError> {
        fs::create_dir_all(layout.state_dir())?;
        let conn = Connection::open(layout.ledger_db())?;
        Self::with_connection(conn)
    }

    /// In-memory database, for tests.
    pub fn open_in_memory() -> Result<Self, BackendError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, BackendError> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS blobs (
                 name TEXT PRIMARY KEY,
                 body TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS events (
                 event_id INTEGER PRIMARY KEY,
                 body TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS snapshots (
                 seq INTEGER PRIMARY KEY,
                 body TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS checkpoints (
                 checkpoint_id TEXT PRIMARY KEY,
                 created_at TEXT NOT NULL,
                 body TEXT NOT NULL
             );",
        )?;
        Ok(Self { conn })
    }

    fn load_blob<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, BackendError> {
        let mut stmt = self.conn.prepare("SELECT body FROM blobs WHERE name = ?1")?;
        let mut rows = stmt.query(params![name])?;
        match rows.next()? {
            Some(row) => {
                let body: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&body)?))
            }
            None => Ok(None),
        }
    }

    fn save_blob<T: Serialize>(&mut self, name: &str, value: &T) -> Result<(), BackendError> {
        let body = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT INTO blobs (name, body) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET body = excluded.body",
            params![name, body],
        )?;
        Ok(())
    }
}

impl StateBackend for TableBackend {
    fn load_state(&self) -> Result<Option<PipelineState>, BackendError> {
        self.load_blob(BLOB_STATE)
    }

    fn save_state(&mut self, state: &PipelineState) -> Result<(), BackendError> {
        self.save_blob(BLOB_STATE, state)
    }

    fn append_event(&mut self, record: &EventRecord) -> Result<(), BackendError> {
        let body = serde_json::to_string(record)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO events (event_id, body) VALUES (?1, ?2)",
            params![record.event_id as i64, body],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn read_events(&self) -> Result<Vec<EventRecord>, BackendError> {
        let mut stmt = self
            .conn
            .prepare("SELECT body FROM events ORDER BY event_id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut events = Vec::new();
        for body in rows {
            events.push(serde_json::from_str(&body?)?);
        }
        Ok(events)
    }

    fn load_leases(&self) -> Result<Vec<ProcessLease>, BackendError> {
        Ok(self.load_blob(BLOB_LEASES)?.unwrap_or_default())
    }

    fn save_leases(&mut self, leases: &[ProcessLease]) -> Result<(), BackendError> {
        self.save_blob(BLOB_LEASES, &leases)
    }

    fn load_heartbeat(&self) -> Result<Option<HeartbeatRecord>, BackendError> {
        self.load_blob(BLOB_HEARTBEAT)
    }

    fn save_heartbeat(&mut self, record: &HeartbeatRecord) -> Result<(), BackendError> {
        self.save_blob(BLOB_HEARTBEAT, record)
    }

    fn append_snapshot(&mut self, entry: &SnapshotEntry) -> Result<(), BackendError> {
        let body = serde_json::to_string(entry)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO snapshots (seq, body) VALUES (?1, ?2)",
            params![entry.seq as i64, body],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn read_snapshots(&self) -> Result<Vec<SnapshotEntry>, BackendError> {
        let mut stmt = self.conn.prepare("SELECT body FROM snapshots ORDER BY seq")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut snapshots = Vec::new();
        for body in rows {
            snapshots.push(serde_json::from_str(&body?)?);
        }
        Ok(snapshots)
    }

    fn append_checkpoint(&mut self, record: &CheckpointRecord) -> Result<(), BackendError> {
        let body = serde_json::to_string(record)?;
        self.conn.execute(
            "INSERT INTO checkpoints (checkpoint_id, created_at, body) VALUES (?1, ?2, ?3)",
            params![record.checkpoint_id, record.created_at.to_rfc3339(), body],
        )?;
        Ok(())
    }

    fn update_checkpoint(&mut self, record: &CheckpointRecord) -> Result<(), BackendError> {
        let body = serde_json::to_string(record)?;
        self.conn.execute(
            "UPDATE checkpoints SET body = ?2, created_at = ?3 WHERE checkpoint_id = ?1",
            params![record.checkpoint_id, body, record.created_at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn list_checkpoints(&self) -> Result<Vec<CheckpointRecord>, BackendError> {
        let mut stmt = self
            .conn
            .prepare("SELECT body FROM checkpoints ORDER BY created_at, checkpoint_id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut checkpoints = Vec::new();
        for body in rows {
            checkpoints.push(serde_json::from_str(&body?)?);
        }
        Ok(checkpoints)
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
