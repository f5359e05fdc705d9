// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `daokit init` — create the runtime tree and empty state files.

use crate::exit_error::ExitError;
use anyhow::Result;
use clap::Args;
use daokit_core::{reason, HeartbeatRecord, SCHEMA_VERSION};
use daokit_storage::RootLayout;
use std::fs;
use std::path::PathBuf;

#[derive(Args)]
pub struct InitArgs {
    /// Runtime root directory
    #[arg(long)]
    pub root: PathBuf,
}

pub fn execute(args: InitArgs) -> Result<()> {
    let layout = RootLayout::new(&args.root);

    for dir in layout.required_dirs() {
        if dir.exists() && !dir.is_dir() {
            return Err(ExitError::failure(
                reason::E_INIT_FAILED,
                format!("{} exists and is not a directory", dir.display()),
            )
            .into());
        }
        fs::create_dir_all(&dir).map_err(|e| {
            ExitError::failure(
                reason::E_INIT_FAILED,
                format!("cannot create {}: {e}", dir.display()),
            )
        })?;
    }

    // Empty state files, created once and left alone on re-init
    let touches: &[(PathBuf, &str)] = &[
        (layout.events(), ""),
        (layout.snapshots(), ""),
        (layout.process_leases(), "[]\n"),
    ];
    for (path, content) in touches {
        if !path.exists() {
            fs::write(path, content).map_err(|e| {
                ExitError::failure(
                    reason::E_INIT_FAILED,
                    format!("cannot create {}: {e}", path.display()),
                )
            })?;
        }
    }

    let heartbeat_path = layout.heartbeat_status();
    if !heartbeat_path.exists() {
        let record = HeartbeatRecord::idle(chrono::Utc::now(), 900, 1200);
        let body = serde_json::to_string_pretty(&record)?;
        fs::write(&heartbeat_path, body + "\n").map_err(|e| {
            ExitError::failure(
                reason::E_INIT_FAILED,
                format!("cannot create {}: {e}", heartbeat_path.display()),
            )
        })?;
    }

    println!(
        "initialized {} (contract family {})",
        args.root.display(),
        SCHEMA_VERSION
    );
    Ok(())
}
