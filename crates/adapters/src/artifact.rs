// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-call artifact persistence.
//!
//! Every dispatch call leaves three artifacts at a deterministic path:
//!
//! ```text
//! <root>/<task>/<run>/<step>/<thread>/<action>/call-<n>/request.json
//!                                              call-<n>/output.json
//!                                              call-<n>/error.json
//! ```
//!
//! `error.json` is an empty record on success so the trio is always present.

use chrono::{DateTime, Utc};
use daokit_core::{derived_id, RunId, StepId, TaskId, ThreadId};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// The three artifact files of one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub call_dir: PathBuf,
    pub request: PathBuf,
    pub output: PathBuf,
    pub error: PathBuf,
}

/// Error artifact content. All fields empty on success.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurred_at: Option<DateTime<Utc>>,
}

impl ErrorArtifact {
    pub fn failure(
        reason_code: impl Into<String>,
        message: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            reason_code: Some(reason_code.into()),
            message: Some(message.into()),
            occurred_at: Some(occurred_at),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.reason_code.is_none() && self.message.is_none()
    }
}

/// Artifact store rooted at `<root>/artifacts/dispatch`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stable thread id derived from the call identity, so retries converge
    /// on the same thread-space.
    pub fn derived_thread_id(task_id: &TaskId, run_id: &RunId, step_id: &StepId) -> ThreadId {
        ThreadId::new(derived_id("thread", &(task_id, run_id, step_id)))
    }

    fn action_dir(
        &self,
        task_id: &TaskId,
        run_id: &RunId,
        step_id: &StepId,
        thread_id: &ThreadId,
        action: &str,
    ) -> PathBuf {
        self.root
            .join(task_id.as_str())
            .join(run_id.as_str())
            .join(step_id.as_str())
            .join(thread_id.as_str())
            .join(action)
    }

    /// Allocate the next `call-<n>` directory for this action and persist the
    /// request artifact.
    pub fn begin_call(
        &self,
        task_id: &TaskId,
        run_id: &RunId,
        step_id: &StepId,
        thread_id: &ThreadId,
        action: &str,
        request: &serde_json::Value,
    ) -> io::Result<ArtifactPaths> {
        let action_dir = self.action_dir(task_id, run_id, step_id, thread_id, action);
        let call = next_call_number(&action_dir)?;
        let call_dir = action_dir.join(format!("call-{call}"));
        fs::create_dir_all(&call_dir)?;

        let paths = ArtifactPaths {
            request: call_dir.join("request.json"),
            output: call_dir.join("output.json"),
            error: call_dir.join("error.json"),
            call_dir,
        };
        write_json(&paths.request, request)?;
        Ok(paths)
    }

    /// Persist the output and error artifacts, completing the trio.
    pub fn complete_call(
        &self,
        paths: &ArtifactPaths,
        output: &serde_json::Value,
        error: &ErrorArtifact,
    ) -> io::Result<()> {
        write_json(&paths.output, output)?;
        write_json(&paths.error, error)?;
        Ok(())
    }
}

/// Scan existing `call-<n>` directories; the next call gets `max + 1`.
fn next_call_number(action_dir: &Path) -> io::Result<u32> {
    if !action_dir.exists() {
        return Ok(1);
    }
    let mut max = 0u32;
    for entry in fs::read_dir(action_dir)? {
        let name = entry?.file_name();
        if let Some(n) = name
            .to_str()
            .and_then(|s| s.strip_prefix("call-"))
            .and_then(|s| s.parse::<u32>().ok())
        {
            max = max.max(n);
        }
    }
    Ok(max + 1)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp)?;
        serde_json::to_writer_pretty(&mut file, value)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        file.write_all(b"\n")?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

/// Newest modification time of any file under `dir`, walked iteratively.
///
/// The heartbeat evaluator uses this as the implicit liveness signal.
pub fn newest_artifact_mtime(dir: &Path) -> Option<SystemTime> {
    let mut newest: Option<SystemTime> = None;
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
                newest = Some(match newest {
                    Some(current_max) if current_max >= modified => current_max,
                    _ => modified,
                });
            }
        }
    }

    newest
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
