// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `daokit run` — start (or resume) a run.

use crate::commands::runtime_for;
use crate::exit_error::ExitError;
use anyhow::Result;
use clap::Args;
use daokit_core::reason;
use daokit_engine::{RunOptions, TerminalStatus};
use daokit_plan::PlanInput;
use std::path::PathBuf;

#[derive(Args)]
pub struct RunArgs {
    /// Runtime root directory
    #[arg(long)]
    pub root: PathBuf,

    #[arg(long = "task-id")]
    pub task_id: String,

    #[arg(long = "run-id")]
    pub run_id: String,

    /// Goal text driving the plan compiler
    #[arg(long)]
    pub goal: String,

    /// Stop cooperatively after the first dispatch (exit 130)
    #[arg(long = "simulate-interruption")]
    pub simulate_interruption: bool,
}

pub fn execute(args: RunArgs) -> Result<()> {
    let mut runtime = runtime_for(&args.root);

    let input = PlanInput {
        goal: args.goal,
        task_id: Some(args.task_id.clone()),
        run_id: Some(args.run_id.clone()),
        ..PlanInput::default()
    };
    let options = RunOptions {
        simulate_interruption: args.simulate_interruption,
        ..RunOptions::default()
    };

    let terminal = runtime.run(input, &options).map_err(|e| {
        ExitError::failure(reason::E_RUN_FAILED, e.to_string())
    })?;

    match terminal {
        TerminalStatus::Done => {
            println!("done: {}/{}", args.task_id, args.run_id);
            Ok(())
        }
        TerminalStatus::Interrupted => Err(ExitError::new(
            130,
            reason::E_RUN_INTERRUPTED,
            format!("{}/{} interrupted at node boundary", args.task_id, args.run_id),
        )
        .into()),
        TerminalStatus::Failed => Err(ExitError::failure(
            reason::E_RUN_FAILED,
            format!("{}/{} failed; see the event journal", args.task_id, args.run_id),
        )
        .into()),
    }
}
