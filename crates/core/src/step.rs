// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step contract: the declarative description of one unit of work.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifier of a step within a plan.
    #[derive(Default)]
    pub struct StepId;
}

/// A named output a step promises to produce, at a path relative to the
/// evidence root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedOutput {
    pub name: String,
    pub path: String,
}

impl ExpectedOutput {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

fn default_require_evidence() -> bool {
    true
}

/// Declarative contract for one unit of work.
///
/// Validation (non-empty goal/actions/criteria/outputs, dependency checks)
/// happens in the plan compiler; this type is the persisted shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepContract {
    pub id: StepId,
    pub title: String,
    pub category: String,
    pub goal: String,
    pub actions: Vec<String>,
    pub acceptance_criteria: Vec<String>,
    pub expected_outputs: Vec<ExpectedOutput>,
    pub dependencies: Vec<StepId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_scope: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval_policy: Option<String>,
    /// Whether acceptance demands the evidence trio (report, verification
    /// log, audit summary) among the expected outputs.
    #[serde(default = "default_require_evidence")]
    pub require_evidence: bool,
}

impl StepContract {
    /// Look up a declared output by name.
    pub fn output(&self, name: &str) -> Option<&ExpectedOutput> {
        self.expected_outputs.iter().find(|o| o.name == name)
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
