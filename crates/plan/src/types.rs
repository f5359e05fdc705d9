// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan compiler input and output shapes.

use daokit_core::{RunId, StepContract, StepId, TaskId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A pre-authored step as supplied by the caller (JSON).
///
/// Optional fields are filled during compilation; the validated result is a
/// [`StepContract`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub goal: String,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    /// `name -> relative path` pairs, serialised like the contract shape.
    #[serde(default)]
    pub expected_outputs: Vec<(String, String)>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_scope: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_evidence: Option<bool>,
}

/// Everything the compiler consumes. Canonicalised (serialised with sorted
/// keys) for derived-id hashing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanInput {
    pub goal: String,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub steps: Vec<StepDraft>,
    /// Dependency names steps may reference without defining a step.
    #[serde(default)]
    pub external_dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

impl PlanInput {
    pub fn from_goal(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            ..Self::default()
        }
    }
}

/// A compiled, validated plan in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub task_id: TaskId,
    pub run_id: RunId,
    pub goal: String,
    pub constraints: Vec<String>,
    /// Steps in deterministic topological order.
    pub steps: Vec<StepContract>,
}

impl Plan {
    pub fn step(&self, id: &StepId) -> Option<&StepContract> {
        self.steps.iter().find(|s| &s.id == id)
    }

    /// The dispatch-ready payload for one step.
    pub fn dispatch_payload(&self, step: &StepContract) -> serde_json::Value {
        serde_json::json!({
            "task_id": &self.task_id,
            "run_id": &self.run_id,
            "step_id": &step.id,
            "goal": &step.goal,
            "actions": &step.actions,
            "acceptance_criteria": &step.acceptance_criteria,
            "expected_outputs": &step.expected_outputs,
            "constraints": &self.constraints,
        })
    }
}

/// What a diagnostic is complaining about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    EmptyGoal,
    EmptyActions,
    EmptyAcceptanceCriteria,
    EmptyExpectedOutputs,
    MissingDependencies,
    DuplicateStepId,
    DuplicateOutputPath,
    SelfDependency,
    UnknownDependency,
    CyclicDependency,
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticCode::EmptyGoal => "EMPTY_GOAL",
            DiagnosticCode::EmptyActions => "EMPTY_ACTIONS",
            DiagnosticCode::EmptyAcceptanceCriteria => "EMPTY_ACCEPTANCE_CRITERIA",
            DiagnosticCode::EmptyExpectedOutputs => "EMPTY_EXPECTED_OUTPUTS",
            DiagnosticCode::MissingDependencies => "MISSING_DEPENDENCIES",
            DiagnosticCode::DuplicateStepId => "DUPLICATE_STEP_ID",
            DiagnosticCode::DuplicateOutputPath => "DUPLICATE_OUTPUT_PATH",
            DiagnosticCode::SelfDependency => "SELF_DEPENDENCY",
            DiagnosticCode::UnknownDependency => "UNKNOWN_DEPENDENCY",
            DiagnosticCode::CyclicDependency => "CYCLIC_DEPENDENCY",
        };
        write!(f, "{s}")
    }
}

/// One structured rejection entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDiagnostic {
    pub code: DiagnosticCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    pub message: String,
}

impl PlanDiagnostic {
    pub fn new(code: DiagnosticCode, step_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code,
            step_id: step_id.map(|s| s.to_string()),
            message: message.into(),
        }
    }
}

impl fmt::Display for PlanDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.step_id {
            Some(step) => write!(f, "{} [{}]: {}", self.code, step, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

/// Errors from plan compilation
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("invalid plan: {}", format_diagnostics(.0))]
    Invalid(Vec<PlanDiagnostic>),
}

impl PlanError {
    pub fn diagnostics(&self) -> &[PlanDiagnostic] {
        match self {
            PlanError::Invalid(diagnostics) => diagnostics,
        }
    }
}

fn format_diagnostics(diagnostics: &[PlanDiagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
