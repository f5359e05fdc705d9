// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess dispatch backend.
//!
//! Spawns a bounded child process, feeds it the request JSON on stdin, and
//! drains stdout/stderr on dedicated reader threads so neither pipe can fill
//! and stall the child. The overall deadline is enforced by polling
//! `try_wait`; on expiry the child is killed and the timeout is captured in
//! the error artifact.
//!
//! Exit classification: 0 success, 75 (EX_TEMPFAIL) retryable, anything else
//! fatal. Stdout parsing is best-effort: JSON object first, then `key=value`
//! lines, else the raw text becomes the message.

use crate::artifact::{ArtifactStore, ErrorArtifact};
use crate::backend::{
    changed_files_from, DispatchBackend, DispatchError, DispatchRequest, DispatchResult,
    DispatchStatus,
};
use crate::config::DispatchConfig;
use serde_json::json;
use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Exit code the executor uses to signal a transient failure.
const EXIT_RETRYABLE: i32 = 75;

/// Poll interval for the deadline loop.
const WAIT_POLL: Duration = Duration::from_millis(25);

/// Subprocess implementation of [`DispatchBackend`].
pub struct SubprocessBackend {
    config: DispatchConfig,
}

impl SubprocessBackend {
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    fn spawn(&self, request_json: &[u8]) -> Result<Child, std::io::Error> {
        // The command list is verified non-empty before this is called
        let program = &self.config.command[0];

        let mut child = Command::new(program)
            .args(&self.config.command[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Write the request and close stdin so the child sees EOF.
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(request_json)?;
        }

        Ok(child)
    }
}

impl DispatchBackend for SubprocessBackend {
    fn invoke(
        &self,
        request: &DispatchRequest,
        store: &ArtifactStore,
    ) -> Result<DispatchResult, DispatchError> {
        if self.config.command.is_empty() {
            return Err(DispatchError::NoCommand);
        }

        let thread_id = request.thread_id();
        let paths = store.begin_call(
            &request.task_id,
            &request.run_id,
            &request.step_id,
            &thread_id,
            request.kind.action(),
            &request.request_artifact(),
        )?;

        let request_json = serde_json::to_vec(&request.request_artifact())?;

        // A spawn failure (missing binary, broken pipe) is a dispatch-level
        // error: it lands in the error artifact and flows to the verify
        // node, never out of the runtime as an exception.
        let mut child = match self.spawn(&request_json) {
            Ok(child) => child,
            Err(e) => {
                let message = format!("failed to spawn executor: {e}");
                let error = ErrorArtifact::failure("SPAWN_FAILED", &message, chrono::Utc::now());
                let output = json!({
                    "status": DispatchStatus::Fatal,
                    "message": &message,
                    "data": {},
                    "stderr": "",
                });
                store.complete_call(&paths, &output, &error)?;
                return Ok(DispatchResult {
                    status: DispatchStatus::Fatal,
                    message,
                    data: json!({}),
                    changed_files: Vec::new(),
                    artifacts: paths,
                });
            }
        };

        // Dedicated reader threads: one per pipe, so a chatty stderr can
        // never block a child writing stdout (or vice versa).
        let stdout_handle = child.stdout.take().map(spawn_reader);
        let stderr_handle = child.stderr.take().map(spawn_reader);

        let timeout = Duration::from_secs(self.config.timeout_seconds);
        let deadline = Instant::now() + timeout;
        let mut timed_out = false;

        let status = loop {
            match child.try_wait()? {
                Some(status) => break Some(status),
                None if Instant::now() >= deadline => {
                    warn!(
                        step_id = %request.step_id,
                        timeout_seconds = self.config.timeout_seconds,
                        "dispatch subprocess timed out, killing",
                    );
                    let _ = child.kill();
                    let _ = child.wait();
                    timed_out = true;
                    break None;
                }
                None => thread::sleep(WAIT_POLL),
            }
        };

        let stdout = join_reader(stdout_handle);
        let stderr = join_reader(stderr_handle);

        let (status_class, message) = if timed_out {
            (
                DispatchStatus::Retryable,
                format!("timed out after {}s", self.config.timeout_seconds),
            )
        } else {
            let code = status.and_then(|s| s.code());
            match code {
                Some(0) => (DispatchStatus::Success, "ok".to_string()),
                Some(EXIT_RETRYABLE) => (
                    DispatchStatus::Retryable,
                    format!("transient failure (exit {EXIT_RETRYABLE})"),
                ),
                Some(code) => (DispatchStatus::Fatal, format!("exit code {code}")),
                // Killed by signal
                None => (DispatchStatus::Fatal, "terminated by signal".to_string()),
            }
        };

        let data = parse_stdout(&stdout);
        let changed_files = changed_files_from(&data);

        let error = if status_class == DispatchStatus::Success {
            ErrorArtifact::default()
        } else {
            let mut error =
                ErrorArtifact::failure("DISPATCH_FAILED", &message, chrono::Utc::now());
            if timed_out {
                error.reason_code = Some("TIMEOUT".to_string());
            }
            error
        };

        let output = json!({
            "status": status_class,
            "message": &message,
            "data": &data,
            "stderr": &stderr,
        });
        store.complete_call(&paths, &output, &error)?;

        debug!(
            step_id = %request.step_id,
            status = ?status_class,
            changed = changed_files.len(),
            "dispatch subprocess finished",
        );

        Ok(DispatchResult {
            status: status_class,
            message,
            data,
            changed_files,
            artifacts: paths,
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buffer = String::new();
        let _ = pipe.read_to_string(&mut buffer);
        buffer
    })
}

fn join_reader(handle: Option<thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// Best-effort stdout parsing: JSON object, `key=value` lines, raw message.
pub(crate) fn parse_stdout(stdout: &str) -> serde_json::Value {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return json!({});
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if value.is_object() {
            return value;
        }
    }

    let pairs: Vec<(&str, &str)> = trimmed
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .collect();
    if !pairs.is_empty() {
        let mut map = serde_json::Map::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), json!(v));
        }
        return serde_json::Value::Object(map);
    }

    json!({ "message": trimmed })
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
