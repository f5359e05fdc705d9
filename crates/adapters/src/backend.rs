// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dispatch capability set: `create`, `resume`, `rework`.
//!
//! Two concrete backends implement it (subprocess and LLM); a small factory
//! keyed on the configured selector picks one. Dispatch failures are values
//! flowing into the verify node, never exceptions out of the runtime.

use crate::artifact::{ArtifactPaths, ArtifactStore};
use crate::config::{DispatchBackendKind, DispatchConfig};
use crate::llm::LlmBackend;
use crate::subprocess::SubprocessBackend;
use daokit_core::{RunId, StepId, TaskId, ThreadId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that make a dispatch call impossible to even attempt.
///
/// Anything that happens *during* the attempt is captured in the result and
/// the error artifact instead.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no executor command configured (set DAOKIT_DISPATCH_COMMAND)")]
    NoCommand,
    #[error("request serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which capability is being exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Create,
    Resume,
    Rework,
}

impl CallKind {
    pub fn action(&self) -> &'static str {
        match self {
            CallKind::Create => "create",
            CallKind::Resume => "resume",
            CallKind::Rework => "rework",
        }
    }
}

/// One dispatch invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub task_id: TaskId,
    pub run_id: RunId,
    pub step_id: StepId,
    /// Caller-supplied, or derived from the call identity so retries land in
    /// the same thread-space.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
    pub kind: CallKind,
    /// The dispatch-ready payload from the plan compiler, plus any rework
    /// detail the verify node attached.
    pub payload: serde_json::Value,
    /// Root the executor writes declared outputs under.
    pub evidence_root: PathBuf,
}

impl DispatchRequest {
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id.clone().unwrap_or_else(|| {
            ArtifactStore::derived_thread_id(&self.task_id, &self.run_id, &self.step_id)
        })
    }

    /// Normalised request artifact content.
    pub fn request_artifact(&self) -> serde_json::Value {
        serde_json::json!({
            "task_id": &self.task_id,
            "run_id": &self.run_id,
            "step_id": &self.step_id,
            "thread_id": self.thread_id(),
            "kind": self.kind,
            "payload": &self.payload,
            "evidence_root": &self.evidence_root,
        })
    }
}

/// Classified outcome of one dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    Success,
    Retryable,
    Fatal,
}

/// Structured result of one dispatch call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResult {
    pub status: DispatchStatus,
    pub message: String,
    /// Parsed executor output: JSON object, `key=value` map, or raw message.
    pub data: serde_json::Value,
    /// Files the executor reports as changed, for the scope guard.
    #[serde(default)]
    pub changed_files: Vec<String>,
    pub artifacts: ArtifactPaths,
}

impl DispatchResult {
    pub fn is_success(&self) -> bool {
        self.status == DispatchStatus::Success
    }
}

/// Capability set shared by all dispatch backends.
pub trait DispatchBackend: Send {
    fn invoke(
        &self,
        request: &DispatchRequest,
        store: &ArtifactStore,
    ) -> Result<DispatchResult, DispatchError>;

    fn create(
        &self,
        request: &DispatchRequest,
        store: &ArtifactStore,
    ) -> Result<DispatchResult, DispatchError> {
        debug_assert!(matches!(request.kind, CallKind::Create));
        self.invoke(request, store)
    }

    fn resume(
        &self,
        request: &DispatchRequest,
        store: &ArtifactStore,
    ) -> Result<DispatchResult, DispatchError> {
        debug_assert!(matches!(request.kind, CallKind::Resume));
        self.invoke(request, store)
    }

    fn rework(
        &self,
        request: &DispatchRequest,
        store: &ArtifactStore,
    ) -> Result<DispatchResult, DispatchError> {
        debug_assert!(matches!(request.kind, CallKind::Rework));
        self.invoke(request, store)
    }
}

/// Pick the backend for the configured selector.
pub fn backend_for(config: &DispatchConfig) -> Box<dyn DispatchBackend> {
    match config.backend {
        DispatchBackendKind::Subprocess => Box::new(SubprocessBackend::new(config.clone())),
        DispatchBackendKind::Llm => Box::new(LlmBackend::new(config.clone())),
    }
}

/// Extract the changed-files list an executor reported in its output.
pub(crate) fn changed_files_from(data: &serde_json::Value) -> Vec<String> {
    match data.get("files_changed") {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect(),
        Some(serde_json::Value::String(joined)) => joined
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
