// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint records: safe resume boundaries written at node completion.
//!
//! The `snapshot_hash` binds the post-node pipeline snapshot; resume walks
//! checkpoints newest-first until one matches the re-read snapshot.

use crate::step::StepId;
use crate::SCHEMA_VERSION;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle node a checkpoint was taken after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleNode {
    Extract,
    Plan,
    Dispatch,
    Verify,
    Transition,
}

impl fmt::Display for LifecycleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleNode::Extract => "EXTRACT",
            LifecycleNode::Plan => "PLAN",
            LifecycleNode::Dispatch => "DISPATCH",
            LifecycleNode::Verify => "VERIFY",
            LifecycleNode::Transition => "TRANSITION",
        };
        write!(f, "{s}")
    }
}

/// Persisted checkpoint record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub schema_version: String,
    pub checkpoint_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<StepId>,
    pub lifecycle_node: LifecycleNode,
    pub snapshot_hash: String,
    pub created_at: DateTime<Utc>,
    /// Cleared when the record is found tampered or truncated on resume.
    pub valid: bool,
}

impl CheckpointRecord {
    pub fn new(
        checkpoint_id: impl Into<String>,
        step_id: Option<StepId>,
        lifecycle_node: LifecycleNode,
        snapshot_hash: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            checkpoint_id: checkpoint_id.into(),
            step_id,
            lifecycle_node,
            snapshot_hash: snapshot_hash.into(),
            created_at,
            valid: true,
        }
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
