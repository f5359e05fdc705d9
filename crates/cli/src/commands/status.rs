// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `daokit status` — aggregated run view.

use crate::commands::runtime_for;
use crate::exit_error::ExitError;
use crate::output::{format_time_ago, print_json};
use anyhow::Result;
use clap::Args;
use daokit_core::reason;
use std::path::PathBuf;

#[derive(Args)]
pub struct StatusArgs {
    /// Runtime root directory
    #[arg(long)]
    pub root: PathBuf,

    #[arg(long = "task-id")]
    pub task_id: Option<String>,

    #[arg(long = "run-id")]
    pub run_id: Option<String>,

    /// Emit the aggregate view as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: StatusArgs) -> Result<()> {
    let runtime = runtime_for(&args.root);
    let view = runtime
        .status(args.task_id.as_deref(), args.run_id.as_deref())
        .map_err(|e| ExitError::failure(reason::E_STATUS_FAILED, e.to_string()))?;

    if args.json {
        return print_json(&view);
    }

    match &view.state {
        Some(state) => {
            println!(
                "{}/{}: {} (updated {} ago)",
                state.task_id,
                state.run_id,
                state.status,
                format_time_ago(state.updated_at)
            );
            for entry in &state.steps {
                println!("  step {} {}", entry.id, entry.state);
            }
            if let Some(at) = state.succession.last_takeover_at {
                println!("  succession: takeover {} ago", format_time_ago(at));
            }
        }
        None => println!("no run in {}", args.root.display()),
    }

    for lease in &view.leases {
        println!(
            "  lease {} {} {} expires {}",
            lease.step_id, lease.thread_id, lease.status, lease.expires_at
        );
    }
    if let Some(heartbeat) = &view.heartbeat {
        match &heartbeat.reason_code {
            Some(code) => println!("  heartbeat {} ({code})", heartbeat.status),
            None => println!("  heartbeat {}", heartbeat.status),
        }
    }
    if let Some(handoff) = &view.handoff {
        println!("  handoff {}", handoff.display());
    }
    Ok(())
}
