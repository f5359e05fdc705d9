// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handoff package lifecycle: pre-compact capture, session-start resume.

use daokit_core::reason;
use daokit_core::{
    Clock, EventDraft, EventType, HandoffPackage, OpenAcceptanceItem, StepId, StepState,
    SCHEMA_VERSION,
};
use daokit_plan::Plan;
use daokit_storage::{Ledger, LedgerError, RootLayout};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors from handoff operations. All surface as `E_HANDOFF_FAILED`.
#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no handoff package found under {0}")]
    NoPackage(PathBuf),
    #[error("package hash does not match content: {0}")]
    HashMismatch(PathBuf),
    #[error("package schema version {found} is not {}", SCHEMA_VERSION)]
    SchemaVersion { found: String },
    #[error("package is for {package}, ledger holds {ledger}")]
    PackageMismatch { package: String, ledger: String },
}

impl HandoffError {
    pub fn reason_code(&self) -> &'static str {
        reason::E_HANDOFF_FAILED
    }
}

/// The resume plan handed back to the runtime after a package is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePlan {
    /// Steps still in PENDING, FAILED, or RUNNING. ACCEPTED never replays.
    pub steps: Vec<StepId>,
}

/// Snapshot the current ledger into a sealed package under `handoff/`.
pub fn create_package<C: Clock>(
    ledger: &mut Ledger,
    layout: &RootLayout,
    plan: &Plan,
    clock: &C,
) -> Result<(HandoffPackage, PathBuf), HandoffError> {
    let now = clock.now();
    let state = ledger.require_state()?;

    let open_acceptance_items: Vec<OpenAcceptanceItem> = state
        .steps
        .iter()
        .filter(|entry| entry.state != StepState::Accepted)
        .filter_map(|entry| plan.step(&entry.id))
        .flat_map(|step| {
            step.acceptance_criteria.iter().map(|criterion| OpenAcceptanceItem {
                step_id: step.id.clone(),
                criterion: criterion.clone(),
            })
        })
        .collect();

    // Evidence already on disk: the declared outputs of accepted steps.
    let evidence_paths: Vec<String> = state
        .steps
        .iter()
        .filter(|entry| entry.state == StepState::Accepted)
        .filter_map(|entry| plan.step(&entry.id))
        .flat_map(|step| step.expected_outputs.iter().map(|o| o.path.clone()))
        .collect();

    let next_action = match state.resumable_steps().first() {
        Some(step) => format!("dispatch {step}"),
        None => "complete".to_string(),
    };

    let package = HandoffPackage::new(
        state.task_id.clone(),
        state.run_id.clone(),
        state.current_step.clone(),
        open_acceptance_items,
        evidence_paths,
        next_action,
    );

    let dir = layout.handoff_dir();
    fs::create_dir_all(&dir)?;
    let path = dir.join(format!("handoff-{:06}.json", next_package_number(&dir)?));
    write_package(&path, &package)?;

    ledger.append(
        EventDraft::new(
            EventType::HandoffCreated,
            state.task_id.clone(),
            state.run_id.clone(),
        )
        .payload(serde_json::json!({
            "package_hash": &package.package_hash,
            "path": &path,
        })),
        now,
    )?;

    info!(path = %path.display(), "handoff package created");
    Ok((package, path))
}

/// Verify and apply a package, returning the resume plan.
///
/// Rejects tampered content, foreign schema versions, and packages whose
/// `(task_id, run_id)` does not match the current ledger.
pub fn apply_package<C: Clock>(
    ledger: &mut Ledger,
    layout: &RootLayout,
    path: Option<&Path>,
    clock: &C,
) -> Result<ResumePlan, HandoffError> {
    let now = clock.now();
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => newest_package(&layout.handoff_dir())?,
    };

    let package: HandoffPackage = serde_json::from_str(&fs::read_to_string(&path)?)?;
    if !package.verify_hash() {
        return Err(HandoffError::HashMismatch(path));
    }
    if package.schema_version != SCHEMA_VERSION {
        return Err(HandoffError::SchemaVersion {
            found: package.schema_version,
        });
    }

    let state = ledger.require_state()?;
    if package.task_id != state.task_id || package.run_id != state.run_id {
        return Err(HandoffError::PackageMismatch {
            package: format!("{}/{}", package.task_id, package.run_id),
            ledger: format!("{}/{}", state.task_id, state.run_id),
        });
    }

    // The resume plan reflects the ledger, not the package: steps accepted
    // since the capture stay accepted.
    let resume = ResumePlan {
        steps: state.resumable_steps(),
    };

    ledger.append(
        EventDraft::new(
            EventType::HandoffApplied,
            state.task_id.clone(),
            state.run_id.clone(),
        )
        .payload(serde_json::json!({
            "package_hash": &package.package_hash,
            "resume_steps": &resume.steps,
        })),
        now,
    )?;

    Ok(resume)
}

fn write_package(path: &Path, package: &HandoffPackage) -> Result<(), HandoffError> {
    let tmp = path.with_extension("tmp");
    let body = serde_json::to_string_pretty(package)?;
    fs::write(&tmp, body.as_bytes())?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn next_package_number(dir: &Path) -> Result<u32, HandoffError> {
    Ok(package_files(dir)?.len() as u32 + 1)
}

fn newest_package(dir: &Path) -> Result<PathBuf, HandoffError> {
    package_files(dir)?
        .into_iter()
        .next_back()
        .ok_or_else(|| HandoffError::NoPackage(dir.to_path_buf()))
}

/// Package files sorted by name; the zero-padded counter makes that
/// chronological.
pub fn package_files(dir: &Path) -> Result<Vec<PathBuf>, HandoffError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("handoff-") && n.ends_with(".json"))
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
#[path = "handoff_tests.rs"]
mod tests;
