// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat status record owned by the heartbeat evaluator.

use crate::SCHEMA_VERSION;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Liveness state of the run's active executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeartbeatState {
    Idle,
    Running,
    Warning,
    Stale,
    Blocked,
}

impl fmt::Display for HeartbeatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HeartbeatState::Idle => "IDLE",
            HeartbeatState::Running => "RUNNING",
            HeartbeatState::Warning => "WARNING",
            HeartbeatState::Stale => "STALE",
            HeartbeatState::Blocked => "BLOCKED",
        };
        write!(f, "{s}")
    }
}

/// Persisted heartbeat status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatRecord {
    pub schema_version: String,
    pub status: HeartbeatState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    pub observed_at: DateTime<Utc>,
    pub warning_after_seconds: u64,
    pub stale_after_seconds: u64,
}

impl HeartbeatRecord {
    pub fn idle(observed_at: DateTime<Utc>, warning_after: u64, stale_after: u64) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            status: HeartbeatState::Idle,
            reason_code: None,
            last_heartbeat_at: None,
            observed_at,
            warning_after_seconds: warning_after,
            stale_after_seconds: stale_after,
        }
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
