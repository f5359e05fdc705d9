// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! daokit - deterministic, evidence-gated orchestration CLI

mod commands;
mod exit_error;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{check, handoff, init, replay, run, status, takeover};
use daokit_core::reason;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "daokit",
    version,
    about = "DAOKit - deterministic, evidence-gated workflow orchestration"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the runtime directory tree and empty state files idempotently
    Init(init::InitArgs),
    /// Validate layout, state, and heartbeat
    Check(check::CheckArgs),
    /// Start (or resume) a run
    Run(run::RunArgs),
    /// Aggregated run view
    Status(status::StatusArgs),
    /// Iterate events or snapshots
    Replay(replay::ReplayArgs),
    /// Accept succession for a run
    Takeover(takeover::TakeoverArgs),
    /// Create or apply a handoff package
    Handoff(handoff::HandoffArgs),
}

fn main() {
    // Library logging goes to stderr, gated by DAOKIT_LOG (quiet by default)
    let filter = EnvFilter::try_from_env("DAOKIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dispatch() {
        let (code, reason_code) = match e.downcast_ref::<exit_error::ExitError>() {
            Some(exit) => (exit.code, exit.reason.clone()),
            None => (1, reason::E_RUN_FAILED.to_string()),
        };
        eprintln!("Error: {}: {}", reason_code, format_error(&e));
        eprintln!("hint: {}", reason::remediation(&reason_code));
        std::process::exit(code);
    }
}

fn dispatch() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => init::execute(args),
        Commands::Check(args) => check::execute(args),
        Commands::Run(args) => run::execute(args),
        Commands::Status(args) => status::execute(args),
        Commands::Replay(args) => replay::execute(args),
        Commands::Takeover(args) => takeover::execute(args),
        Commands::Handoff(args) => handoff::execute(args),
    }
}

fn format_error(e: &anyhow::Error) -> String {
    match e.downcast_ref::<exit_error::ExitError>() {
        Some(exit) => exit.message.clone(),
        None => format!("{e:#}"),
    }
}
