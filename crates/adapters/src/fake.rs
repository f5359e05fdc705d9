// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic in-process dispatch backend for tests.
//!
//! Materialises the step's declared expected outputs under the evidence root
//! (including a verification log carrying command evidence) and records every
//! invocation for assertions.

use crate::artifact::{ArtifactStore, ErrorArtifact};
use crate::backend::{
    DispatchBackend, DispatchError, DispatchRequest, DispatchResult, DispatchStatus,
};
use serde_json::json;
use std::fs;
use std::sync::{Arc, Mutex};

/// Scripted behavior for the next invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeOutcome {
    /// Write declared outputs and succeed.
    Succeed,
    /// Succeed but skip writing outputs (drives MISSING_EVIDENCE).
    SucceedWithoutOutputs,
    /// Return a retryable failure.
    FailRetryable,
    /// Return a fatal failure.
    FailFatal,
}

/// Test double implementing the full capability set.
#[derive(Clone)]
pub struct FakeBackend {
    outcomes: Arc<Mutex<Vec<FakeOutcome>>>,
    calls: Arc<Mutex<Vec<DispatchRequest>>>,
    changed_files: Arc<Mutex<Vec<String>>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            changed_files: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue an outcome for the next invocation. Defaults to `Succeed` when
    /// the queue is empty.
    pub fn push_outcome(&self, outcome: FakeOutcome) {
        self.outcomes.lock().unwrap_or_else(|e| e.into_inner()).push(outcome);
    }

    /// Files reported as changed by subsequent invocations.
    pub fn set_changed_files(&self, files: Vec<String>) {
        *self.changed_files.lock().unwrap_or_else(|e| e.into_inner()) = files;
    }

    pub fn calls(&self) -> Vec<DispatchRequest> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn next_outcome(&self) -> FakeOutcome {
        let mut outcomes = self.outcomes.lock().unwrap_or_else(|e| e.into_inner());
        if outcomes.is_empty() {
            FakeOutcome::Succeed
        } else {
            outcomes.remove(0)
        }
    }

    fn write_outputs(&self, request: &DispatchRequest) -> std::io::Result<()> {
        let outputs = request
            .payload
            .get("expected_outputs")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        for output in outputs {
            let (Some(name), Some(rel)) = (
                output.get("name").and_then(|v| v.as_str()),
                output.get("path").and_then(|v| v.as_str()),
            ) else {
                continue;
            };
            let path = request.evidence_root.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let content = if name == "verification.log" {
                format!(
                    "Command: fake-executor --step {}\nall checks passed\n",
                    request.step_id
                )
            } else {
                format!("{name} for step {}\n", request.step_id)
            };
            fs::write(path, content)?;
        }
        Ok(())
    }
}

impl DispatchBackend for FakeBackend {
    fn invoke(
        &self,
        request: &DispatchRequest,
        store: &ArtifactStore,
    ) -> Result<DispatchResult, DispatchError> {
        let thread_id = request.thread_id();
        let paths = store.begin_call(
            &request.task_id,
            &request.run_id,
            &request.step_id,
            &thread_id,
            request.kind.action(),
            &request.request_artifact(),
        )?;

        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let outcome = self.next_outcome();
        let (status, message) = match outcome {
            FakeOutcome::Succeed | FakeOutcome::SucceedWithoutOutputs => {
                if outcome == FakeOutcome::Succeed {
                    self.write_outputs(request)?;
                }
                (DispatchStatus::Success, "ok".to_string())
            }
            FakeOutcome::FailRetryable => {
                (DispatchStatus::Retryable, "scripted transient failure".to_string())
            }
            FakeOutcome::FailFatal => (DispatchStatus::Fatal, "scripted fatal failure".to_string()),
        };

        let changed_files = self.changed_files.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let data = json!({"status": &message, "files_changed": &changed_files});
        let error = if status == DispatchStatus::Success {
            ErrorArtifact::default()
        } else {
            ErrorArtifact::failure("DISPATCH_FAILED", &message, chrono::Utc::now())
        };
        store.complete_call(&paths, &data, &error)?;

        Ok(DispatchResult {
            status,
            message,
            data,
            changed_files,
            artifacts: paths,
        })
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
