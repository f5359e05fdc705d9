// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One module per frozen command.

pub mod check;
pub mod handoff;
pub mod init;
pub mod replay;
pub mod run;
pub mod status;
pub mod takeover;

use daokit_adapters::backend_for;
use daokit_core::SystemClock;
use daokit_engine::{RunConfig, Runtime};
use std::path::Path;

/// Build the runtime for a root with resolved configuration.
pub(crate) fn runtime_for(root: &Path) -> Runtime<SystemClock> {
    let config = RunConfig::resolve(root);
    let dispatch = backend_for(&config.dispatch);
    Runtime::new(root, config, SystemClock, dispatch)
}
