// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transition guards over the lifecycle status edge set.
//!
//! State advances only through this table; any other transition fails loudly
//! with a diagnostic carrying the trigger and the allowed targets.

use daokit_core::PipelineStatus;
use thiserror::Error;

/// Rejected transition, with everything an operator needs to see why.
#[derive(Debug, Error)]
#[error(
    "transition '{trigger}' from {from_status} to {to_status} is not allowed (allowed: {})",
    format_targets(.allowed_targets)
)]
pub struct TransitionGuardError {
    pub trigger: String,
    pub from_status: PipelineStatus,
    pub to_status: PipelineStatus,
    pub allowed_targets: Vec<PipelineStatus>,
}

fn format_targets(targets: &[PipelineStatus]) -> String {
    if targets.is_empty() {
        return "none - terminal".to_string();
    }
    targets
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The canonical edge set.
pub fn allowed_targets(from: PipelineStatus) -> &'static [PipelineStatus] {
    match from {
        PipelineStatus::Planning => &[PipelineStatus::Analysis],
        PipelineStatus::Analysis => &[PipelineStatus::Freeze],
        PipelineStatus::Freeze => &[PipelineStatus::Execute],
        PipelineStatus::Execute => &[PipelineStatus::Accept, PipelineStatus::Draining],
        PipelineStatus::Accept => &[
            PipelineStatus::Execute,
            PipelineStatus::Done,
            PipelineStatus::Draining,
        ],
        PipelineStatus::Draining => &[PipelineStatus::Execute, PipelineStatus::Blocked],
        PipelineStatus::Blocked => &[PipelineStatus::Execute],
        PipelineStatus::Done => &[],
    }
}

/// Check one edge, returning the full diagnostic on rejection.
pub fn check(
    trigger: &str,
    from: PipelineStatus,
    to: PipelineStatus,
) -> Result<(), TransitionGuardError> {
    let allowed = allowed_targets(from);
    if allowed.contains(&to) {
        Ok(())
    } else {
        Err(TransitionGuardError {
            trigger: trigger.to_string(),
            from_status: from,
            to_status: to,
            allowed_targets: allowed.to_vec(),
        })
    }
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
