// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat evaluation: explicit beats plus artifact-mtime implicit
//! liveness, with one escalation event per silence streak.

use daokit_adapters::newest_artifact_mtime;
use daokit_core::{
    Clock, EventDraft, EventType, HeartbeatRecord, HeartbeatState, PipelineStatus, RunKey,
};
use daokit_storage::{Ledger, LedgerError};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

/// Heartbeat thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub warning_after_seconds: u64,
    pub stale_after_seconds: u64,
    pub check_interval_seconds: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            warning_after_seconds: 900,
            stale_after_seconds: 1200,
            check_interval_seconds: 60,
        }
    }
}

impl HeartbeatConfig {
    /// Threshold-derived reason code, e.g. `NO_OUTPUT_20M` for 1200s.
    pub fn stale_reason_code(&self) -> String {
        format!("NO_OUTPUT_{}M", self.stale_after_seconds.div_ceil(60))
    }
}

/// The pure state function over a silence duration.
///
/// `silence >= stale_after` is STALE — the boundary is inclusive.
pub fn classify(silence_seconds: u64, config: &HeartbeatConfig) -> HeartbeatState {
    if silence_seconds >= config.stale_after_seconds {
        HeartbeatState::Stale
    } else if silence_seconds >= config.warning_after_seconds {
        HeartbeatState::Warning
    } else {
        HeartbeatState::Running
    }
}

/// Heartbeat evaluator: owns the persisted heartbeat record.
pub struct HeartbeatService<C: Clock> {
    config: HeartbeatConfig,
    clock: C,
}

impl<C: Clock> HeartbeatService<C> {
    pub fn new(config: HeartbeatConfig, clock: C) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &HeartbeatConfig {
        &self.config
    }

    /// Record an explicit beat.
    pub fn beat(&self, ledger: &mut Ledger) -> Result<(), LedgerError> {
        let now = self.clock.now();
        let mut record = ledger
            .heartbeat()?
            .unwrap_or_else(|| self.idle_record(now));
        record.last_heartbeat_at = Some(now);
        record.observed_at = now;
        if record.status == HeartbeatState::Idle {
            record.status = HeartbeatState::Running;
        }
        ledger.save_heartbeat(&record)
    }

    /// One evaluator tick: derive the current state, persist it, and emit
    /// warning/stale events (deduped per silence streak).
    pub fn tick(
        &self,
        ledger: &mut Ledger,
        artifact_root: &Path,
    ) -> Result<HeartbeatRecord, LedgerError> {
        let now = self.clock.now();
        let state = ledger.state()?;
        let previous = ledger.heartbeat()?;

        let (status, reason_code, last_activity) = match &state {
            // BLOCKED is set externally with the lifecycle state
            Some(s) if s.status == PipelineStatus::Blocked => {
                (HeartbeatState::Blocked, None, None)
            }
            Some(s) if !s.running_steps().is_empty() => {
                let explicit = previous.as_ref().and_then(|p| p.last_heartbeat_at);
                let implicit = newest_artifact_mtime(artifact_root)
                    .map(DateTime::<Utc>::from);
                // Effective last activity is the freshest of the two signals;
                // with neither, the last snapshot write stands in.
                let last_activity = match (explicit, implicit) {
                    (Some(a), Some(b)) => Some(a.max(b)),
                    (a, b) => a.or(b),
                }
                .unwrap_or(s.updated_at);

                let silence = (now - last_activity).num_seconds().max(0) as u64;
                let status = classify(silence, &self.config);
                let reason = match status {
                    HeartbeatState::Stale => Some(self.config.stale_reason_code()),
                    _ => None,
                };
                (status, reason, Some(last_activity))
            }
            _ => (HeartbeatState::Idle, None, None),
        };

        let record = HeartbeatRecord {
            status,
            reason_code: reason_code.clone(),
            last_heartbeat_at: previous
                .as_ref()
                .and_then(|p| p.last_heartbeat_at)
                .or(last_activity),
            observed_at: now,
            ..self.idle_record(now)
        };
        ledger.save_heartbeat(&record)?;

        if let Some(state) = &state {
            let key = RunKey::new(state.task_id.clone(), state.run_id.clone());
            let anchor = last_activity
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "none".to_string());

            match status {
                HeartbeatState::Warning => {
                    // Same streak-dedup shape as stale, with its own key space
                    let dedup = format!("{}|{}|WARNING", key.task_id, anchor);
                    ledger.append(
                        EventDraft::new(
                            EventType::HeartbeatWarning,
                            key.task_id.clone(),
                            key.run_id.clone(),
                        )
                        .dedup_key(dedup)
                        .payload(serde_json::json!({
                            "warning_after_seconds": self.config.warning_after_seconds,
                        })),
                        now,
                    )?;
                }
                HeartbeatState::Stale => {
                    let reason = reason_code.unwrap_or_default();
                    let dedup = format!("{}|{}|{}", key.task_id, anchor, reason);
                    let appended = ledger.append(
                        EventDraft::new(
                            EventType::HeartbeatStale,
                            key.task_id.clone(),
                            key.run_id.clone(),
                        )
                        .dedup_key(dedup)
                        .payload(serde_json::json!({
                            "reason_code": &reason,
                            "last_heartbeat_at": anchor,
                            "stale_after_seconds": self.config.stale_after_seconds,
                        })),
                        now,
                    )?;
                    if appended.is_some() {
                        warn!(task_id = %key.task_id, reason_code = %reason, "heartbeat stale");
                    }
                }
                _ => {}
            }
        }

        Ok(record)
    }

    fn idle_record(&self, now: DateTime<Utc>) -> HeartbeatRecord {
        HeartbeatRecord::idle(
            now,
            self.config.warning_after_seconds,
            self.config.stale_after_seconds,
        )
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
