// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the lifecycle runtime

use crate::handoff::HandoffError;
use crate::lease::LeaseOpError;
use crate::runtime::guard::TransitionGuardError;
use daokit_adapters::DispatchError;
use daokit_plan::PlanError;
use daokit_storage::{BackendError, LedgerError};
use thiserror::Error;

/// Errors that can occur in the runtime.
///
/// Dispatch and acceptance outcomes are values, not errors; everything here
/// is fatal to the current run and surfaces as `E_RUN_FAILED`.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("plan error: {0}")]
    Plan(#[from] PlanError),
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("transition guard: {0}")]
    Guard(#[from] TransitionGuardError),
    #[error("lease error: {0}")]
    Lease(#[from] LeaseOpError),
    #[error("handoff error: {0}")]
    Handoff(#[from] HandoffError),
    #[error("no route for acceptance reason {reason_code} at verify (known: {known})")]
    RouteGuard { reason_code: String, known: String },
    #[error("no run found for {task_id}/{run_id}")]
    RunNotFound { task_id: String, run_id: String },
    #[error("no compiled plan recorded in the ledger")]
    PlanNotRecorded,
    #[error("run is BLOCKED; manual recovery required")]
    Blocked,
}
