// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Acceptance gate: criterion evaluation over persisted artifacts.
//!
//! Outcomes are values with stable reason codes; nothing here crashes the
//! runtime. A failed evaluation produces the rework payload the dispatch
//! node replays with.

use crate::scope;
use daokit_core::reason;
use daokit_core::{canonical_hash, derived_id, StepContract, StepId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// The synthetic criterion the scope guard reports against.
pub const SCOPE_CRITERION: &str = "changes stay within allowed scope";

/// The output names forming the evidence trio.
pub const EVIDENCE_TRIO: [&str; 3] = ["report", "verification.log", "audit-summary"];

/// Acceptance tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AcceptanceConfig {
    /// Demand command evidence inside `verification.log`.
    pub require_command_evidence: bool,
    /// Maximum rework attempts per step before `REWORK_EXHAUSTED`.
    pub rework_bound: u32,
}

impl Default for AcceptanceConfig {
    fn default() -> Self {
        Self {
            require_command_evidence: false,
            rework_bound: 2,
        }
    }
}

/// Per-criterion evaluation state inside a proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionState {
    pub criterion: String,
    pub satisfied: bool,
}

/// Proof record backing an accepted step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub proof_id: String,
    pub criteria_states: Vec<CriterionState>,
}

/// What the dispatch node needs to replay a failed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReworkPayload {
    pub step_id: StepId,
    pub reason_code: String,
    /// Exactly the criteria that failed.
    pub failed_criteria: Vec<String>,
    /// The minimum artifact delta required: paths to produce or fix.
    pub artifact_delta: Vec<String>,
}

/// Result of one acceptance evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AcceptanceOutcome {
    Passed { proof: Proof },
    Failed { reason_code: String, rework: ReworkPayload },
}

impl AcceptanceOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, AcceptanceOutcome::Passed { .. })
    }

    pub fn reason_code(&self) -> Option<&str> {
        match self {
            AcceptanceOutcome::Passed { .. } => None,
            AcceptanceOutcome::Failed { reason_code, .. } => Some(reason_code),
        }
    }
}

/// Evaluate a step's acceptance criteria against the artifacts at its
/// declared expected outputs under `evidence_root`.
pub fn evaluate(
    step: &StepContract,
    evidence_root: &Path,
    changed_files: &[String],
    config: &AcceptanceConfig,
) -> AcceptanceOutcome {
    // Scope guard first: an out-of-scope change taints the whole attempt
    // regardless of what evidence exists.
    let violators = scope::violations(step.allowed_scope.as_deref(), changed_files);
    if !violators.is_empty() {
        return fail(
            step,
            reason::OUT_OF_SCOPE_CHANGE,
            vec![SCOPE_CRITERION.to_string()],
            violators,
        );
    }

    // Path safety: every declared output must resolve inside the root.
    for output in &step.expected_outputs {
        if !is_safe_relative(&output.path) {
            return fail(
                step,
                reason::INVALID_EVIDENCE_PATH,
                step.acceptance_criteria.clone(),
                vec![output.path.clone()],
            );
        }
    }

    // Evidence trio declaration, when this step requires it.
    if step.require_evidence {
        let missing_trio: Vec<String> = EVIDENCE_TRIO
            .iter()
            .filter(|name| step.output(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing_trio.is_empty() {
            return fail(
                step,
                reason::MISSING_EVIDENCE,
                step.acceptance_criteria.clone(),
                missing_trio,
            );
        }
    }

    // Existence and readability of every declared output.
    let mut artifact_hashes: Vec<(String, String)> = Vec::new();
    let mut missing: Vec<String> = Vec::new();
    let mut unreadable: Vec<String> = Vec::new();
    for output in &step.expected_outputs {
        let path = evidence_root.join(&output.path);
        if !path.exists() {
            missing.push(output.path.clone());
            continue;
        }
        match fs::read(&path) {
            Ok(content) => artifact_hashes.push((output.name.clone(), canonical_hash(&content))),
            Err(_) => unreadable.push(output.path.clone()),
        }
    }
    if !missing.is_empty() {
        return fail(
            step,
            reason::MISSING_EVIDENCE,
            step.acceptance_criteria.clone(),
            missing,
        );
    }
    if !unreadable.is_empty() {
        return fail(
            step,
            reason::UNREADABLE_EVIDENCE,
            step.acceptance_criteria.clone(),
            unreadable,
        );
    }

    // Command evidence inside the verification log, when configured.
    if config.require_command_evidence {
        if let Some(log_output) = step.output("verification.log") {
            let path = evidence_root.join(&log_output.path);
            let content = fs::read_to_string(&path).unwrap_or_default();
            if !has_command_evidence(&content) {
                return fail(
                    step,
                    reason::MISSING_COMMAND_EVIDENCE,
                    step.acceptance_criteria.clone(),
                    vec![log_output.path.clone()],
                );
            }
        }
    }

    let criteria_states: Vec<CriterionState> = step
        .acceptance_criteria
        .iter()
        .map(|criterion| CriterionState {
            criterion: criterion.clone(),
            satisfied: true,
        })
        .collect();

    // Proof identity binds step, criteria, and artifact content.
    let proof_id = derived_id(
        "proof",
        &(&step.id, &step.acceptance_criteria, &artifact_hashes),
    );

    AcceptanceOutcome::Passed {
        proof: Proof {
            proof_id,
            criteria_states,
        },
    }
}

fn fail(
    step: &StepContract,
    reason_code: &str,
    failed_criteria: Vec<String>,
    artifact_delta: Vec<String>,
) -> AcceptanceOutcome {
    AcceptanceOutcome::Failed {
        reason_code: reason_code.to_string(),
        rework: ReworkPayload {
            step_id: step.id.clone(),
            reason_code: reason_code.to_string(),
            failed_criteria,
            artifact_delta,
        },
    }
}

/// A declared output path must be relative and stay inside the evidence
/// root: absolute paths and any `..` segment are rejected.
fn is_safe_relative(path: &str) -> bool {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        return false;
    }
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Accept either the line marker `Command: <cmd>` or the block markers
/// `=== COMMAND ENTRY N START/END ===`.
fn has_command_evidence(log: &str) -> bool {
    static BLOCK_MARKER: OnceLock<Option<Regex>> = OnceLock::new();
    let block = BLOCK_MARKER
        .get_or_init(|| Regex::new(r"(?m)^=== COMMAND ENTRY \d+ (START|END) ===$").ok());

    log.lines().any(|line| line.starts_with("Command: "))
        || block.as_ref().is_some_and(|re| re.is_match(log))
}

#[cfg(test)]
#[path = "acceptance_tests.rs"]
mod tests;
