// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `daokit replay` — iterate the event journal or the snapshot journal.

use crate::exit_error::ExitError;
use anyhow::Result;
use clap::{Args, ValueEnum};
use daokit_core::reason;
use daokit_storage::{open_backend, BackendKind, Ledger};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ReplaySource {
    Events,
    Snapshots,
}

#[derive(Args)]
pub struct ReplayArgs {
    /// Runtime root directory
    #[arg(long)]
    pub root: PathBuf,

    /// Which journal to iterate
    #[arg(long, value_enum)]
    pub source: ReplaySource,

    /// Maximum entries to print (newest last)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Emit entries as JSON lines
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: ReplayArgs) -> Result<()> {
    let ledger = open_ledger(&args.root)?;

    match args.source {
        ReplaySource::Events => {
            let events = ledger
                .events()
                .map_err(|e| ExitError::failure(reason::E_REPLAY_FAILED, e.to_string()))?;
            for event in tail(events, args.limit) {
                if args.json {
                    println!("{}", serde_json::to_string(&event)?);
                } else {
                    println!("{}", event.log_summary());
                }
            }
        }
        ReplaySource::Snapshots => {
            let snapshots = ledger
                .snapshots()
                .map_err(|e| ExitError::failure(reason::E_REPLAY_FAILED, e.to_string()))?;
            for entry in tail(snapshots, args.limit) {
                if args.json {
                    println!("{}", serde_json::to_string(&entry)?);
                } else {
                    println!(
                        "#{} {}/{} status={} steps={}",
                        entry.seq,
                        entry.state.task_id,
                        entry.state.run_id,
                        entry.state.status,
                        entry.state.steps.len()
                    );
                }
            }
        }
    }
    Ok(())
}

fn open_ledger(root: &std::path::Path) -> Result<Ledger> {
    let backend = open_backend(root, BackendKind::from_env())
        .map_err(|e| ExitError::failure(reason::E_REPLAY_FAILED, e.to_string()))?;
    Ok(Ledger::open(backend)
        .map_err(|e| ExitError::failure(reason::E_REPLAY_FAILED, e.to_string()))?)
}

fn tail<T>(items: Vec<T>, limit: Option<usize>) -> Vec<T> {
    match limit {
        Some(limit) if items.len() > limit => {
            let skip = items.len() - limit;
            items.into_iter().skip(skip).collect()
        }
        _ => items,
    }
}
