// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stable reason codes surfaced in CLI output and ledger event payloads.
//!
//! These strings are part of the frozen contract; they are never renamed.

// -- initialisation / health --
pub const E_INIT_FAILED: &str = "E_INIT_FAILED";
pub const E_CHECK_LAYOUT_MISSING: &str = "E_CHECK_LAYOUT_MISSING";
pub const E_CHECK_STATE_INVALID: &str = "E_CHECK_STATE_INVALID";
pub const E_CHECK_HEARTBEAT_INVALID: &str = "E_CHECK_HEARTBEAT_INVALID";

// -- runtime --
pub const E_RUN_FAILED: &str = "E_RUN_FAILED";
pub const E_RUN_INTERRUPTED: &str = "E_RUN_INTERRUPTED";
pub const E_INTERRUPTED: &str = "E_INTERRUPTED";

// -- recovery --
pub const E_STATUS_FAILED: &str = "E_STATUS_FAILED";
pub const E_REPLAY_FAILED: &str = "E_REPLAY_FAILED";
pub const E_TAKEOVER_FAILED: &str = "E_TAKEOVER_FAILED";
pub const E_HANDOFF_FAILED: &str = "E_HANDOFF_FAILED";

// -- acceptance --
pub const MISSING_EVIDENCE: &str = "MISSING_EVIDENCE";
pub const UNREADABLE_EVIDENCE: &str = "UNREADABLE_EVIDENCE";
pub const INVALID_EVIDENCE_PATH: &str = "INVALID_EVIDENCE_PATH";
pub const OUT_OF_SCOPE_CHANGE: &str = "OUT_OF_SCOPE_CHANGE";
pub const MISSING_COMMAND_EVIDENCE: &str = "MISSING_COMMAND_EVIDENCE";
pub const REWORK_EXHAUSTED: &str = "REWORK_EXHAUSTED";

// -- succession --
pub const LEASE_EXPIRED: &str = "LEASE_EXPIRED";
pub const LEASE_OWNERSHIP_MISMATCH: &str = "LEASE_OWNERSHIP_MISMATCH";
pub const NO_ACTIVE_LEASE: &str = "NO_ACTIVE_LEASE";

// -- role_lifecycle markers --
pub const FAILED_NON_ADOPTED_LEASE: &str = "failed_non_adopted_lease";

/// One-line remediation pointer for a terminal reason code, shown alongside
/// CLI failures.
pub fn remediation(code: &str) -> &'static str {
    match code {
        E_INIT_FAILED => "check that --root points at a writable directory",
        E_CHECK_LAYOUT_MISSING => "run `daokit init --root <root>` to create the layout",
        E_CHECK_STATE_INVALID => "inspect state/pipeline_state.json; restore from .bak if rotated",
        E_CHECK_HEARTBEAT_INVALID => "inspect state/heartbeat_status.json for manual edits",
        E_RUN_FAILED => "see the last ERROR event via `daokit replay --source events`",
        E_RUN_INTERRUPTED | E_INTERRUPTED => "resume with `daokit run` or accept succession via `daokit takeover`",
        E_STATUS_FAILED => "verify the root has been initialised and a run exists",
        E_REPLAY_FAILED => "verify state/events.jsonl exists and is readable",
        E_TAKEOVER_FAILED => "check lease status with `daokit status --json`",
        E_HANDOFF_FAILED => "recreate the package with `daokit handoff --create`",
        _ => "see `daokit status --json` for details",
    }
}
