// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handoff package: the durable minimum needed to resume in a fresh process.

use crate::hash::canonical_hash;
use crate::run::{RunId, TaskId};
use crate::step::StepId;
use crate::SCHEMA_VERSION;
use serde::{Deserialize, Serialize};

/// An acceptance item still open at package-creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAcceptanceItem {
    pub step_id: StepId,
    pub criterion: String,
}

/// Durable capture of a run's resume state, written at pre-compact and
/// consumed at session-start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffPackage {
    pub schema_version: String,
    pub task_id: TaskId,
    pub run_id: RunId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<StepId>,
    pub open_acceptance_items: Vec<OpenAcceptanceItem>,
    pub evidence_paths: Vec<String>,
    pub next_action: String,
    /// Canonical hash of the package content (computed with this field empty).
    pub package_hash: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recent_decisions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blockers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retrieval_cache_keys: Vec<String>,
}

impl HandoffPackage {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        task_id: TaskId,
        run_id: RunId,
        current_step: Option<StepId>,
        open_acceptance_items: Vec<OpenAcceptanceItem>,
        evidence_paths: Vec<String>,
        next_action: impl Into<String>,
    ) -> Self {
        let mut package = Self {
            schema_version: SCHEMA_VERSION.to_string(),
            task_id,
            run_id,
            current_step,
            open_acceptance_items,
            evidence_paths,
            next_action: next_action.into(),
            package_hash: String::new(),
            recent_decisions: Vec::new(),
            blockers: Vec::new(),
            retrieval_cache_keys: Vec::new(),
        };
        package.package_hash = package.content_hash();
        package
    }

    /// Hash of the package with `package_hash` zeroed out.
    pub fn content_hash(&self) -> String {
        let mut unsealed = self.clone();
        unsealed.package_hash = String::new();
        canonical_hash(&unsealed)
    }

    /// Recompute the seal after mutating optional detail fields.
    pub fn reseal(&mut self) {
        self.package_hash = self.content_hash();
    }

    /// Whether the stored hash still matches the content.
    pub fn verify_hash(&self) -> bool {
        self.package_hash == self.content_hash()
    }
}

#[cfg(test)]
#[path = "handoff_tests.rs"]
mod tests;
