// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle hooks with timeout budgets and idempotent ledger deltas.
//!
//! A hook never writes the ledger directly: it returns a delta of event
//! drafts which the runner applies only after the hook finishes inside its
//! budget. A timed-out or failed hook leaves no trace — the delta is
//! discarded. Idempotency comes from dedup keys derived from
//! `(hook_point, hook_name, idempotency_key)`, so re-running the same hook
//! yields the same ledger delta.

use daokit_core::{Clock, EventDraft};
use daokit_storage::{Ledger, LedgerError};
use std::fmt;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Where in the lifecycle a hook fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    PreCompact,
    SessionStart,
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HookPoint::PreCompact => "pre-compact",
            HookPoint::SessionStart => "session-start",
        };
        write!(f, "{s}")
    }
}

/// Tentative ledger changes produced by a hook.
#[derive(Debug, Default)]
pub struct HookDelta {
    pub events: Vec<EventDraft>,
}

/// A hook: idempotent, side-effect-scoped to the provided context.
pub trait Hook: Send {
    fn name(&self) -> &str;
    fn idempotency_key(&self) -> String;
    fn execute(&self) -> Result<HookDelta, String>;
}

/// Errors from hook execution.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("hook {name} timed out after {budget_ms}ms; tentative changes rolled back")]
    Timeout { name: String, budget_ms: u64 },
    #[error("hook {name} failed: {message}")]
    Failed { name: String, message: String },
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Runs hooks under an individual timeout budget.
pub struct HookRunner {
    budget: Duration,
}

impl Default for HookRunner {
    fn default() -> Self {
        Self {
            budget: Duration::from_secs(30),
        }
    }
}

impl HookRunner {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    /// Execute one hook and apply its delta.
    ///
    /// The hook body runs on its own thread so the budget can be enforced
    /// with `recv_timeout`; only a completed hook's delta reaches the ledger.
    pub fn run<C: Clock, H: Hook + 'static>(
        &self,
        ledger: &mut Ledger,
        clock: &C,
        point: HookPoint,
        hook: H,
    ) -> Result<usize, HookError> {
        let name = hook.name().to_string();
        let idempotency_key = hook.idempotency_key();
        let budget = self.budget;

        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            let result = hook.execute();
            let _ = tx.send(result);
        });

        let delta = match rx.recv_timeout(budget) {
            Ok(Ok(delta)) => delta,
            Ok(Err(message)) => {
                return Err(HookError::Failed { name, message });
            }
            Err(_) => {
                warn!(hook = %name, point = %point, "hook exceeded its budget, rolling back");
                // The thread keeps running to completion but its delta is
                // dropped with the channel.
                drop(handle);
                return Err(HookError::Timeout {
                    name,
                    budget_ms: budget.as_millis() as u64,
                });
            }
        };

        let now = clock.now();
        let mut applied = 0usize;
        for (n, draft) in delta.events.into_iter().enumerate() {
            // Same (point, name, idempotency_key) always maps to the same
            // dedup keys, which is what makes re-execution a no-op.
            let dedup = format!("hook|{point}|{name}|{idempotency_key}|{n}");
            if ledger.append(draft.dedup_key(dedup), now)?.is_some() {
                applied += 1;
            }
        }
        Ok(applied)
    }
}

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;
