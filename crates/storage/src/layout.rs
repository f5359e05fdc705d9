// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Frozen on-disk topology of a runtime root.
//!
//! ```text
//! <root>/state/{pipeline_state.json, events.jsonl, process_leases.json,
//!               heartbeat_status.json, snapshots.jsonl}
//! <root>/artifacts/dispatch/...
//! <root>/checkpoints/...
//! <root>/handoff/...
//! ```
//!
//! This layout is release-evidence compatible and must not change.

use std::path::{Path, PathBuf};

/// Path accessors for one runtime root.
#[derive(Debug, Clone)]
pub struct RootLayout {
    root: PathBuf,
}

impl RootLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }

    pub fn pipeline_state(&self) -> PathBuf {
        self.state_dir().join("pipeline_state.json")
    }

    pub fn events(&self) -> PathBuf {
        self.state_dir().join("events.jsonl")
    }

    pub fn process_leases(&self) -> PathBuf {
        self.state_dir().join("process_leases.json")
    }

    pub fn heartbeat_status(&self) -> PathBuf {
        self.state_dir().join("heartbeat_status.json")
    }

    pub fn snapshots(&self) -> PathBuf {
        self.state_dir().join("snapshots.jsonl")
    }

    pub fn ledger_db(&self) -> PathBuf {
        self.state_dir().join("ledger.sqlite")
    }

    pub fn checkpoints_dir(&self) -> PathBuf {
        self.root.join("checkpoints")
    }

    pub fn handoff_dir(&self) -> PathBuf {
        self.root.join("handoff")
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.root.join("artifacts")
    }

    pub fn dispatch_artifacts_dir(&self) -> PathBuf {
        self.artifacts_dir().join("dispatch")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join("settings.toml")
    }

    /// The directories `init` creates and `check` expects.
    pub fn required_dirs(&self) -> Vec<PathBuf> {
        vec![
            self.state_dir(),
            self.dispatch_artifacts_dir(),
            self.checkpoints_dir(),
            self.handoff_dir(),
        ]
    }
}
