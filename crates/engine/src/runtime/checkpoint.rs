// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint persistence and the resume walk.
//!
//! A checkpoint binds the post-node snapshot by canonical hash. On resume we
//! walk newest-first until a record's hash matches the re-read snapshot;
//! mismatching records are flagged invalid but never corrupt the ledger.

use daokit_core::{
    canonical_hash, CheckpointRecord, Clock, EventDraft, EventType, LifecycleNode, PipelineState,
    StepId,
};
use daokit_storage::{Ledger, LedgerError};
use tracing::warn;

/// Persist a checkpoint for the post-node snapshot and announce it.
pub fn write_checkpoint<C: Clock>(
    ledger: &mut Ledger,
    clock: &C,
    state: &PipelineState,
    node: LifecycleNode,
    step_id: Option<StepId>,
) -> Result<CheckpointRecord, LedgerError> {
    let now = clock.now();
    let checkpoint_id = format!("cp-{:06}", ledger.checkpoints()?.len() + 1);
    let record = CheckpointRecord::new(
        checkpoint_id,
        step_id.clone(),
        node,
        canonical_hash(state),
        now,
    );
    ledger.append_checkpoint(&record)?;

    let mut draft = EventDraft::new(
        EventType::CheckpointPersisted,
        state.task_id.clone(),
        state.run_id.clone(),
    )
    .payload(serde_json::json!({
        "checkpoint_id": &record.checkpoint_id,
        "lifecycle_node": node,
        "snapshot_hash": &record.snapshot_hash,
    }));
    if let Some(step_id) = step_id {
        draft = draft.step(step_id);
    }
    ledger.append(draft, now)?;

    Ok(record)
}

/// Find the newest checkpoint consistent with the current snapshot.
///
/// Records whose hash does not match are flagged `valid = false`; older
/// valid checkpoints remain acceptable.
pub fn latest_consistent(
    ledger: &mut Ledger,
    state: &PipelineState,
) -> Result<Option<CheckpointRecord>, LedgerError> {
    let current_hash = canonical_hash(state);
    let mut checkpoints = ledger.checkpoints()?;
    checkpoints.reverse();

    for mut record in checkpoints {
        if !record.valid {
            continue;
        }
        if record.snapshot_hash == current_hash {
            return Ok(Some(record));
        }
        warn!(
            checkpoint_id = %record.checkpoint_id,
            "checkpoint hash does not match snapshot, flagging invalid",
        );
        record.valid = false;
        ledger.update_checkpoint(&record)?;
    }

    Ok(None)
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
