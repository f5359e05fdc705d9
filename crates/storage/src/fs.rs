// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-tree state backend.
//!
//! Whole-object files (`pipeline_state.json`, `process_leases.json`,
//! `heartbeat_status.json`) are rewritten via `.tmp` + atomic rename + fsync.
//! Journals (`events.jsonl`, `snapshots.jsonl`) are appended with fsync, one
//! JSON record per line. Checkpoints are one JSON file each under
//! `checkpoints/`.
//!
//! Corrupt whole-object files are rotated to `.bak` so recovery can proceed;
//! corrupt journal tails stop the read at the corruption point, preserving
//! the valid prefix.

use crate::backend::{BackendError, SnapshotEntry, StateBackend};
use crate::layout::RootLayout;
use daokit_core::{CheckpointRecord, EventRecord, HeartbeatRecord, PipelineState, ProcessLease};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

const MAX_BAK_FILES: u32 = 3;

/// File-tree implementation of [`StateBackend`].
pub struct FsBackend {
    layout: RootLayout,
}

impl FsBackend {
    pub fn new(layout: RootLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &RootLayout {
        &self.layout
    }

    /// Write a whole-object file atomically: `.tmp`, fsync, rename.
    fn save_object<T: Serialize>(path: &Path, value: &T) -> Result<(), BackendError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp_path)?;
            serde_json::to_writer_pretty(&mut file, value)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;

        Ok(())
    }

    /// Load a whole-object file, rotating corrupt content to `.bak`.
    fn load_object<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, BackendError> {
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        match serde_json::from_reader(reader) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                let bak_path = rotate_bak_path(path);
                warn!(
                    error = %e,
                    path = %path.display(),
                    bak = %bak_path.display(),
                    "Corrupt state file, moving to .bak",
                );
                fs::rename(path, &bak_path)?;
                Ok(None)
            }
        }
    }

    /// Append one JSON line to a journal and fsync.
    fn append_line<T: Serialize>(path: &Path, record: &T) -> Result<(), BackendError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut json_bytes = serde_json::to_vec(record)?;
        json_bytes.push(b'\n');

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(&json_bytes)?;
        file.sync_all()?;

        Ok(())
    }

    /// Read all valid lines of a journal, stopping at the first corrupt entry.
    fn read_lines<T: DeserializeOwned>(
        path: &Path,
        domain: &'static str,
    ) -> Result<Vec<T>, BackendError> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut records = Vec::new();
        let mut line = String::new();
        let mut line_no = 0u64;

        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => break,
                Err(e) => return Err(e.into()),
            }
            line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(
                        domain,
                        line = line_no,
                        error = %e,
                        "Corrupt journal entry, stopping at corruption point",
                    );
                    break;
                }
            }
        }

        Ok(records)
    }

    fn checkpoint_path(&self, checkpoint_id: &str) -> PathBuf {
        self.layout
            .checkpoints_dir()
            .join(format!("{checkpoint_id}.json"))
    }
}

impl StateBackend for FsBackend {
    fn load_state(&self) -> Result<Option<PipelineState>, BackendError> {
        Self::load_object(&self.layout.pipeline_state())
    }

    fn save_state(&mut self, state: &PipelineState) -> Result<(), BackendError> {
        Self::save_object(&self.layout.pipeline_state(), state)
    }

    fn append_event(&mut self, record: &EventRecord) -> Result<(), BackendError> {
        Self::append_line(&self.layout.events(), record)
    }

    fn read_events(&self) -> Result<Vec<EventRecord>, BackendError> {
        Self::read_lines(&self.layout.events(), "events")
    }

    fn load_leases(&self) -> Result<Vec<ProcessLease>, BackendError> {
        Ok(Self::load_object(&self.layout.process_leases())?.unwrap_or_default())
    }

    fn save_leases(&mut self, leases: &[ProcessLease]) -> Result<(), BackendError> {
        Self::save_object(&self.layout.process_leases(), &leases)
    }

    fn load_heartbeat(&self) -> Result<Option<HeartbeatRecord>, BackendError> {
        Self::load_object(&self.layout.heartbeat_status())
    }

    fn save_heartbeat(&mut self, record: &HeartbeatRecord) -> Result<(), BackendError> {
        Self::save_object(&self.layout.heartbeat_status(), record)
    }

    fn append_snapshot(&mut self, entry: &SnapshotEntry) -> Result<(), BackendError> {
        Self::append_line(&self.layout.snapshots(), entry)
    }

    fn read_snapshots(&self) -> Result<Vec<SnapshotEntry>, BackendError> {
        Self::read_lines(&self.layout.snapshots(), "snapshots")
    }

    fn append_checkpoint(&mut self, record: &CheckpointRecord) -> Result<(), BackendError> {
        Self::save_object(&self.checkpoint_path(&record.checkpoint_id), record)
    }

    fn update_checkpoint(&mut self, record: &CheckpointRecord) -> Result<(), BackendError> {
        Self::save_object(&self.checkpoint_path(&record.checkpoint_id), record)
    }

    fn list_checkpoints(&self) -> Result<Vec<CheckpointRecord>, BackendError> {
        let dir = self.layout.checkpoints_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut records: Vec<CheckpointRecord> = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match Self::load_object::<CheckpointRecord>(&path)? {
                Some(record) => records.push(record),
                // Truncated checkpoint files rotate to .bak; they are flagged
                // rather than corrupting the ledger.
                None => warn!(path = %path.display(), "Skipping unreadable checkpoint"),
            }
        }

        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.checkpoint_id.cmp(&b.checkpoint_id))
        });
        Ok(records)
    }
}

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
/// The oldest backup is removed when the limit is reached.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    // Remove the oldest if at capacity
    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    // Shift existing backups up by one
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

#[cfg(test)]
#[path = "fs_tests.rs"]
mod tests;
