// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LLM dispatch backend against an OpenAI-compatible endpoint.
//!
//! One blocking HTTP call per dispatch; retries are bounded and only fire on
//! transport errors and 5xx responses. 4xx responses are configuration or
//! request problems and fail immediately.

use crate::artifact::{ArtifactStore, ErrorArtifact};
use crate::backend::{
    changed_files_from, DispatchBackend, DispatchError, DispatchRequest, DispatchResult,
    DispatchStatus,
};
use crate::config::DispatchConfig;
use crate::subprocess::parse_stdout;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// LLM implementation of [`DispatchBackend`].
pub struct LlmBackend {
    config: DispatchConfig,
}

impl LlmBackend {
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    fn chat_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.llm.base_url.trim_end_matches('/')
        )
    }

    fn request_body(&self, request: &DispatchRequest) -> serde_json::Value {
        json!({
            "model": self.config.llm.model,
            "temperature": self.config.llm.temperature,
            "max_tokens": self.config.llm.max_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": request.payload.to_string(),
                }
            ],
        })
    }

    /// One attempt. `Ok` carries (status, message, content); `Err` is a
    /// transport failure eligible for retry.
    fn attempt(&self, body: &serde_json::Value) -> Result<(u16, String, String), String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.config.llm.timeout_seconds))
            .build()
            .map_err(|e| e.to_string())?;

        let response = client
            .post(self.chat_url())
            .bearer_auth(&self.config.llm.api_key)
            .json(body)
            .send()
            .map_err(|e| e.to_string())?;

        let status = response.status().as_u16();
        let text = response.text().map_err(|e| e.to_string())?;

        let content = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| {
                v.pointer("/choices/0/message/content")
                    .and_then(|c| c.as_str())
                    .map(|s| s.to_string())
            })
            .unwrap_or_default();

        Ok((status, text, content))
    }
}

impl DispatchBackend for LlmBackend {
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

        let body = self.request_body(request);
        let max_attempts = self.config.max_retries + 1;
        let mut outcome: Option<(u16, String)> = None;
        let mut content = String::new();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.attempt(&body) {
                Ok((status, _text, got)) if status < 500 => {
                    outcome = Some((status, got.clone()));
                    content = got;
                    break;
                }
                Ok((status, text, _)) => {
                    // 5xx: retry within the bound
                    warn!(attempt, status, "LLM endpoint returned server error");
                    last_error = format!("HTTP {status}: {text}");
                }
                Err(transport) => {
                    warn!(attempt, error = %transport, "LLM transport error");
                    last_error = transport;
                }
            }
        }

        let (status_class, message, data) = match outcome {
            Some((status, _)) if (200..300).contains(&status) => {
                let data = parse_stdout(&content);
                (DispatchStatus::Success, "ok".to_string(), data)
            }
            Some((status, _)) => (
                DispatchStatus::Fatal,
                format!("HTTP {status} from LLM endpoint"),
                json!({}),
            ),
            None => (
                DispatchStatus::Retryable,
                format!("LLM unreachable after {max_attempts} attempts: {last_error}"),
                json!({}),
            ),
        };

        let changed_files = changed_files_from(&data);
        let error = if status_class == DispatchStatus::Success {
            ErrorArtifact::default()
        } else {
            ErrorArtifact::failure("LLM_DISPATCH_FAILED", &message, chrono::Utc::now())
        };

        let output = json!({
            "status": status_class,
            "message": &message,
            "data": &data,
            "content": &content,
        });
        store.complete_call(&paths, &output, &error)?;

        debug!(step_id = %request.step_id, status = ?status_class, "LLM dispatch finished");

        Ok(DispatchResult {
            status: status_class,
            message,
            data,
            changed_files,
            artifacts: paths,
        })
    }
}

#[cfg(test)]
#[path = "llm_tests.rs"]
mod tests;
