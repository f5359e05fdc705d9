// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `daokit check` — validate layout, state, and heartbeat.

use crate::exit_error::ExitError;
use crate::output::print_json;
use anyhow::Result;
use clap::Args;
use daokit_core::{reason, HeartbeatRecord, PipelineState, SCHEMA_VERSION};
use daokit_storage::RootLayout;
use std::fs;
use std::path::PathBuf;

#[derive(Args)]
pub struct CheckArgs {
    /// Runtime root directory
    #[arg(long)]
    pub root: PathBuf,

    /// Emit the check result as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: CheckArgs) -> Result<()> {
    let layout = RootLayout::new(&args.root);

    // -- layout --
    for dir in layout.required_dirs() {
        if !dir.is_dir() {
            return Err(ExitError::failure(
                reason::E_CHECK_LAYOUT_MISSING,
                format!("missing directory {}", dir.display()),
            )
            .into());
        }
    }
    for file in [layout.events(), layout.process_leases(), layout.heartbeat_status()] {
        if !file.is_file() {
            return Err(ExitError::failure(
                reason::E_CHECK_LAYOUT_MISSING,
                format!("missing state file {}", file.display()),
            )
            .into());
        }
    }

    // -- pipeline state (absent before the first run) --
    let state_path = layout.pipeline_state();
    let state: Option<PipelineState> = if state_path.is_file() {
        let raw = fs::read_to_string(&state_path)?;
        let state: PipelineState = serde_json::from_str(&raw).map_err(|e| {
            ExitError::failure(
                reason::E_CHECK_STATE_INVALID,
                format!("{}: {e}", state_path.display()),
            )
        })?;
        if state.schema_version != SCHEMA_VERSION {
            return Err(ExitError::failure(
                reason::E_CHECK_STATE_INVALID,
                format!(
                    "{}: schema_version {} is not {}",
                    state_path.display(),
                    state.schema_version,
                    SCHEMA_VERSION
                ),
            )
            .into());
        }
        Some(state)
    } else {
        None
    };

    // -- heartbeat --
    let heartbeat_path = layout.heartbeat_status();
    let raw = fs::read_to_string(&heartbeat_path)?;
    let heartbeat: HeartbeatRecord = serde_json::from_str(&raw).map_err(|e| {
        ExitError::failure(
            reason::E_CHECK_HEARTBEAT_INVALID,
            format!("{}: {e}", heartbeat_path.display()),
        )
    })?;
    if heartbeat.warning_after_seconds >= heartbeat.stale_after_seconds {
        return Err(ExitError::failure(
            reason::E_CHECK_HEARTBEAT_INVALID,
            format!(
                "warning_after_seconds {} must be below stale_after_seconds {}",
                heartbeat.warning_after_seconds, heartbeat.stale_after_seconds
            ),
        )
        .into());
    }

    if args.json {
        print_json(&serde_json::json!({
            "ok": true,
            "root": args.root,
            "run": state.as_ref().map(|s| serde_json::json!({
                "task_id": &s.task_id,
                "run_id": &s.run_id,
                "status": s.status,
            })),
            "heartbeat": heartbeat.status,
        }))?;
    } else {
        match &state {
            Some(state) => println!(
                "ok: {} {}/{} status={} heartbeat={}",
                args.root.display(),
                state.task_id,
                state.run_id,
                state.status,
                heartbeat.status
            ),
            None => println!(
                "ok: {} (no run yet) heartbeat={}",
                args.root.display(),
                heartbeat.status
            ),
        }
    }
    Ok(())
}
