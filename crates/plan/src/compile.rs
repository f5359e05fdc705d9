// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan compilation: normalise, validate, and order the step DAG.
//!
//! Compilation is deterministic: identical canonical input produces the same
//! step ids, the same topological order, and the same derived task/run ids.

use crate::types::{DiagnosticCode, Plan, PlanDiagnostic, PlanError, PlanInput, StepDraft};
use daokit_core::{derived_id, ExpectedOutput, RunId, StepContract, StepId, TaskId};
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::debug;

/// Compile an input into a validated plan, or a full set of diagnostics.
pub fn compile(input: &PlanInput) -> Result<Plan, PlanError> {
    let mut diagnostics = Vec::new();

    if input.goal.trim().is_empty() {
        diagnostics.push(PlanDiagnostic::new(
            DiagnosticCode::EmptyGoal,
            None,
            "plan goal must not be empty",
        ));
    }

    let drafts = if input.steps.is_empty() {
        vec![default_step(&input.goal)]
    } else {
        input.steps.clone()
    };

    // Assign ids and index by id, catching duplicates. IndexMap keeps input
    // order for deterministic tie-breaking during topological processing.
    let mut by_id: IndexMap<String, StepContract> = IndexMap::new();
    for (pos, draft) in drafts.iter().enumerate() {
        let step = materialize(draft, pos);
        if by_id.contains_key(step.id.as_str()) {
            diagnostics.push(PlanDiagnostic::new(
                DiagnosticCode::DuplicateStepId,
                Some(step.id.as_str()),
                format!("step id {} is declared more than once", step.id),
            ));
            continue;
        }
        validate_step(&step, &mut diagnostics);
        by_id.insert(step.id.as_str().to_string(), step);
    }

    check_output_conflicts(&by_id, &mut diagnostics);
    check_dependencies(&by_id, &input.external_dependencies, &mut diagnostics);

    let ordered = topological_order(&by_id, &mut diagnostics);

    if !diagnostics.is_empty() {
        return Err(PlanError::Invalid(diagnostics));
    }

    let task_id = match &input.task_id {
        Some(id) => TaskId::new(id),
        None => TaskId::new(derived_id("task", input)),
    };
    let run_id = match &input.run_id {
        Some(id) => RunId::new(id),
        None => RunId::new(derived_id("run", input)),
    };

    debug!(task_id = %task_id, run_id = %run_id, steps = ordered.len(), "plan compiled");

    Ok(Plan {
        task_id,
        run_id,
        goal: input.goal.clone(),
        constraints: input.constraints.clone(),
        steps: ordered
            .into_iter()
            .filter_map(|id| by_id.get(&id).cloned())
            .collect(),
    })
}

/// The single step synthesised when the caller supplies only a goal.
fn default_step(goal: &str) -> StepDraft {
    StepDraft {
        id: Some("S1".to_string()),
        title: Some(goal.to_string()),
        category: Some("execute".to_string()),
        goal: goal.to_string(),
        actions: vec!["execute".to_string()],
        acceptance_criteria: vec!["expected outputs are present".to_string()],
        expected_outputs: vec![
            ("report".to_string(), "steps/S1/report.md".to_string()),
            (
                "verification.log".to_string(),
                "steps/S1/verification.log".to_string(),
            ),
            (
                "audit-summary".to_string(),
                "steps/S1/audit-summary.md".to_string(),
            ),
        ],
        dependencies: Vec::new(),
        allowed_scope: None,
        retrieval_policy: None,
        require_evidence: Some(true),
    }
}

/// Fill defaults and normalise a draft into contract shape.
fn materialize(draft: &StepDraft, pos: usize) -> StepContract {
    let id = draft
        .id
        .clone()
        .unwrap_or_else(|| format!("S{}", pos + 1));
    StepContract {
        id: StepId::new(&id),
        title: draft.title.clone().unwrap_or_else(|| id.clone()),
        category: draft.category.clone().unwrap_or_else(|| "execute".to_string()),
        goal: draft.goal.clone(),
        actions: draft.actions.clone(),
        acceptance_criteria: draft.acceptance_criteria.clone(),
        expected_outputs: draft
            .expected_outputs
            .iter()
            .map(|(name, path)| ExpectedOutput::new(name, normalize_path(path)))
            .collect(),
        dependencies: draft.dependencies.iter().map(|d| StepId::new(d.clone())).collect(),
        allowed_scope: draft.allowed_scope.clone(),
        retrieval_policy: draft.retrieval_policy.clone(),
        require_evidence: draft.require_evidence.unwrap_or(true),
    }
}

fn validate_step(step: &StepContract, diagnostics: &mut Vec<PlanDiagnostic>) {
    let id = step.id.as_str();
    if step.goal.trim().is_empty() {
        diagnostics.push(PlanDiagnostic::new(
            DiagnosticCode::EmptyGoal,
            Some(id),
            "step goal must not be empty",
        ));
    }
    if step.actions.is_empty() {
        diagnostics.push(PlanDiagnostic::new(
            DiagnosticCode::EmptyActions,
            Some(id),
            "step must declare at least one action",
        ));
    }
    if step.acceptance_criteria.is_empty() {
        diagnostics.push(PlanDiagnostic::new(
            DiagnosticCode::EmptyAcceptanceCriteria,
            Some(id),
            "step must declare at least one acceptance criterion",
        ));
    }
    if step.expected_outputs.is_empty() {
        diagnostics.push(PlanDiagnostic::new(
            DiagnosticCode::EmptyExpectedOutputs,
            Some(id),
            "step must declare at least one expected output",
        ));
    }
    for dep in &step.dependencies {
        if dep == &step.id {
            diagnostics.push(PlanDiagnostic::new(
                DiagnosticCode::SelfDependency,
                Some(id),
                format!("step {id} depends on itself"),
            ));
        }
    }
}

/// Detect expected-output paths claimed by more than one step after
/// normalisation, so aliases like `a/./b` collide with `a/b`.
fn check_output_conflicts(
    by_id: &IndexMap<String, StepContract>,
    diagnostics: &mut Vec<PlanDiagnostic>,
) {
    let mut claimed: HashMap<String, String> = HashMap::new();
    for step in by_id.values() {
        for output in &step.expected_outputs {
            let normalized = normalize_path(&output.path);
            match claimed.get(&normalized) {
                Some(owner) if owner != step.id.as_str() => {
                    diagnostics.push(PlanDiagnostic::new(
                        DiagnosticCode::DuplicateOutputPath,
                        Some(step.id.as_str()),
                        format!("output path {normalized} already claimed by step {owner}"),
                    ));
                }
                Some(_) => {
                    diagnostics.push(PlanDiagnostic::new(
                        DiagnosticCode::DuplicateOutputPath,
                        Some(step.id.as_str()),
                        format!("output path {normalized} declared twice in the same step"),
                    ));
                }
                None => {
                    claimed.insert(normalized, step.id.as_str().to_string());
                }
            }
        }
    }
}

fn check_dependencies(
    by_id: &IndexMap<String, StepContract>,
    external: &[String],
    diagnostics: &mut Vec<PlanDiagnostic>,
) {
    for step in by_id.values() {
        for dep in &step.dependencies {
            if dep == &step.id {
                continue; // already reported as SelfDependency
            }
            if !by_id.contains_key(dep.as_str()) && !external.iter().any(|e| e == dep.as_str()) {
                diagnostics.push(PlanDiagnostic::new(
                    DiagnosticCode::UnknownDependency,
                    Some(step.id.as_str()),
                    format!("dependency {dep} is neither a step nor a declared external"),
                ));
            }
        }
    }
}

/// Iterative Kahn ordering; ties broken by input position. Leftover nodes
/// after the queue drains are members of a cycle.
fn topological_order(
    by_id: &IndexMap<String, StepContract>,
    diagnostics: &mut Vec<PlanDiagnostic>,
) -> Vec<String> {
    let mut in_degree: IndexMap<&str, usize> =
        by_id.keys().map(|id| (id.as_str(), 0usize)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for step in by_id.values() {
        for dep in &step.dependencies {
            // External and unknown deps do not gate ordering
            if !by_id.contains_key(dep.as_str()) || dep == &step.id {
                continue;
            }
            *in_degree.entry(step.id.as_str()).or_insert(0) += 1;
            dependents
                .entry(dep.as_str())
                .or_default()
                .push(step.id.as_str());
        }
    }

    let mut ready: Vec<&str> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut ordered = Vec::with_capacity(by_id.len());

    while !ready.is_empty() {
        // Lowest input position first keeps the order deterministic
        ready.sort_by_key(|id| by_id.get_index_of(*id));
        let id = ready.remove(0);
        ordered.push(id.to_string());

        if let Some(children) = dependents.get(id) {
            for child in children {
                if let Some(degree) = in_degree.get_mut(child) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(child);
                    }
                }
            }
        }
    }

    if ordered.len() != by_id.len() {
        let mut stuck: Vec<&str> = by_id
            .keys()
            .map(|id| id.as_str())
            .filter(|id| !ordered.iter().any(|o| o == id))
            .collect();
        stuck.sort_unstable();
        diagnostics.push(PlanDiagnostic::new(
            DiagnosticCode::CyclicDependency,
            None,
            format!("dependency cycle among steps: {}", stuck.join(", ")),
        ));
    }

    ordered
}

/// Lexically normalise a relative path: drop `.` and empty segments.
///
/// `..` segments are preserved — they are the acceptance engine's job to
/// reject, with their own reason code.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    segments.join("/")
}

#[cfg(test)]
#[path = "compile_tests.rs"]
mod tests;
