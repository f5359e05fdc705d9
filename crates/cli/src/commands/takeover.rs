// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `daokit takeover` — accept succession for a run.

use crate::exit_error::ExitError;
use crate::output::print_json;
use anyhow::Result;
use clap::Args;
use daokit_core::{reason, RunKey, SystemClock, ThreadId, UuidTokenGen};
use daokit_engine::{LeaseRegistry, RunConfig, SuccessionTrigger, SuccessorId};
use daokit_storage::{open_backend, BackendKind, Ledger};
use std::path::PathBuf;

#[derive(Args)]
pub struct TakeoverArgs {
    /// Runtime root directory
    #[arg(long)]
    pub root: PathBuf,

    #[arg(long = "task-id")]
    pub task_id: String,

    #[arg(long = "run-id")]
    pub run_id: String,

    /// Identity of the successor executor thread
    #[arg(long = "successor-thread-id")]
    pub successor_thread_id: String,

    /// Successor pid (defaults to this process)
    #[arg(long = "successor-pid")]
    pub successor_pid: Option<u32>,
}

pub fn execute(args: TakeoverArgs) -> Result<()> {
    let backend = open_backend(&args.root, BackendKind::from_env())
        .map_err(|e| ExitError::failure(reason::E_TAKEOVER_FAILED, e.to_string()))?;
    let mut ledger = Ledger::open(backend)
        .map_err(|e| ExitError::failure(reason::E_TAKEOVER_FAILED, e.to_string()))?;

    let state = ledger
        .require_state()
        .map_err(|e| ExitError::failure(reason::E_TAKEOVER_FAILED, e.to_string()))?;
    if state.task_id != args.task_id.as_str() || state.run_id != args.run_id.as_str() {
        return Err(ExitError::failure(
            reason::E_TAKEOVER_FAILED,
            format!(
                "root holds {}/{}, not {}/{}",
                state.task_id, state.run_id, args.task_id, args.run_id
            ),
        )
        .into());
    }

    let config = RunConfig::resolve(&args.root);
    let registry = LeaseRegistry::new(config.lease, SystemClock, UuidTokenGen);
    let successor = SuccessorId {
        thread_id: ThreadId::new(&args.successor_thread_id),
        pid: args.successor_pid.unwrap_or_else(std::process::id),
    };
    let trigger = succession_trigger(&ledger, &state);

    let result = registry
        .batch_takeover_run(
            &mut ledger,
            &RunKey::new(args.task_id.as_str(), args.run_id.as_str()),
            &successor,
            &trigger,
        )
        .map_err(|e| ExitError::failure(reason::E_TAKEOVER_FAILED, e.to_string()))?;

    print_json(&result)
}

/// Anchor the succession decision to what actually prompted it.
///
/// When the journal holds a stale-heartbeat escalation for this run, that
/// escalation instant is the decision point and the gap to the takeover is
/// real operator latency. Without one, this is a plain operator takeover
/// decided now.
fn succession_trigger(ledger: &Ledger, state: &daokit_core::PipelineState) -> SuccessionTrigger {
    let stale_at = ledger
        .events()
        .ok()
        .and_then(|events| {
            events
                .into_iter()
                .filter(|e| {
                    e.event_type == daokit_core::EventType::HeartbeatStale
                        && e.task_id == state.task_id
                        && e.run_id == state.run_id
                })
                .map(|e| e.timestamp)
                .next_back()
        });

    match stale_at {
        Some(at) => SuccessionTrigger::heartbeat_stale(at),
        None => SuccessionTrigger::operator(chrono::Utc::now()),
    }
}
