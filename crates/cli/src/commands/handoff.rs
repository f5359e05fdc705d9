// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `daokit handoff` — create a handoff package (pre-compact) or apply one
//! (session-start) and hand control back to the runtime.

use crate::commands::runtime_for;
use crate::exit_error::ExitError;
use crate::output::print_json;
use anyhow::Result;
use clap::Args;
use daokit_core::{reason, SystemClock};
use daokit_engine::{apply_package, create_package, load_plan, RunOptions, TerminalStatus};
use daokit_storage::{open_backend, BackendKind, Ledger, RootLayout};
use std::path::PathBuf;

#[derive(Args)]
pub struct HandoffArgs {
    /// Runtime root directory
    #[arg(long)]
    pub root: PathBuf,

    /// Snapshot the ledger into a new package
    #[arg(long, conflicts_with = "apply")]
    pub create: bool,

    /// Verify and apply a package, then resume the run
    #[arg(long, conflicts_with = "create")]
    pub apply: bool,

    /// Package path (defaults to the newest package under handoff/)
    #[arg(long)]
    pub path: Option<PathBuf>,
}

pub fn execute(args: HandoffArgs) -> Result<()> {
    if args.create == args.apply {
        return Err(ExitError::failure(
            reason::E_HANDOFF_FAILED,
            "exactly one of --create or --apply is required",
        )
        .into());
    }

    let layout = RootLayout::new(&args.root);
    let mut ledger = open_ledger(&args.root)?;
    let plan = load_plan(&ledger)
        .map_err(|e| ExitError::failure(reason::E_HANDOFF_FAILED, e.to_string()))?;

    if args.create {
        let (package, path) = create_package(&mut ledger, &layout, &plan, &SystemClock)
            .map_err(|e| ExitError::failure(reason::E_HANDOFF_FAILED, e.to_string()))?;
        print_json(&serde_json::json!({
            "path": path,
            "package_hash": package.package_hash,
            "next_action": package.next_action,
        }))?;
        return Ok(());
    }

    let resume = apply_package(&mut ledger, &layout, args.path.as_deref(), &SystemClock)
        .map_err(|e| ExitError::failure(reason::E_HANDOFF_FAILED, e.to_string()))?;
    print_json(&resume)?;

    // The resume plan hands control back to the runtime
    let state = ledger
        .require_state()
        .map_err(|e| ExitError::failure(reason::E_HANDOFF_FAILED, e.to_string()))?;
    let (task_id, run_id) = (state.task_id.to_string(), state.run_id.to_string());
    drop(ledger);

    let mut runtime = runtime_for(&args.root);
    let terminal = runtime
        .resume(&task_id, &run_id, &RunOptions::default())
        .map_err(|e| ExitError::failure(reason::E_HANDOFF_FAILED, e.to_string()))?;

    match terminal {
        TerminalStatus::Done => {
            println!("done: {task_id}/{run_id}");
            Ok(())
        }
        TerminalStatus::Interrupted => Err(ExitError::new(
            130,
            reason::E_INTERRUPTED,
            format!("{task_id}/{run_id} interrupted during handoff resume"),
        )
        .into()),
        TerminalStatus::Failed => Err(ExitError::failure(
            reason::E_HANDOFF_FAILED,
            format!("{task_id}/{run_id} failed after handoff apply"),
        )
        .into()),
    }
}

fn open_ledger(root: &std::path::Path) -> Result<Ledger> {
    let backend = open_backend(root, BackendKind::from_env())
        .map_err(|e| ExitError::failure(reason::E_HANDOFF_FAILED, e.to_string()))?;
    Ok(Ledger::open(backend)
        .map_err(|e| ExitError::failure(reason::E_HANDOFF_FAILED, e.to_string()))?)
}
