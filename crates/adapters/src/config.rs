// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch configuration records.
//!
//! Backend selection and tuning come from `DAOKIT_*` environment variables
//! layered over an optional settings file; there is no public CLI argument
//! for any of this.

use serde::Deserialize;

/// Environment variable selecting the dispatch backend.
pub const DISPATCH_BACKEND_ENV: &str = "DAOKIT_DISPATCH_BACKEND";

const COMMAND_ENV: &str = "DAOKIT_DISPATCH_COMMAND";
const TIMEOUT_ENV: &str = "DAOKIT_DISPATCH_TIMEOUT_SECONDS";
const MAX_RETRIES_ENV: &str = "DAOKIT_DISPATCH_MAX_RETRIES";

const LLM_API_KEY_ENV: &str = "DAOKIT_LLM_API_KEY";
const LLM_BASE_URL_ENV: &str = "DAOKIT_LLM_BASE_URL";
const LLM_MODEL_ENV: &str = "DAOKIT_LLM_MODEL";
const LLM_MAX_TOKENS_ENV: &str = "DAOKIT_LLM_MAX_TOKENS";
const LLM_TEMPERATURE_ENV: &str = "DAOKIT_LLM_TEMPERATURE";
const LLM_TIMEOUT_ENV: &str = "DAOKIT_LLM_TIMEOUT_SECONDS";

/// Which dispatch backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchBackendKind {
    #[default]
    Subprocess,
    Llm,
}

/// LLM backend tuning for an OpenAI-compatible endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 4096,
            temperature: 0.0,
            timeout_seconds: 120,
        }
    }
}

impl LlmConfig {
    /// Layer environment overrides on top of this config.
    pub fn with_env(mut self) -> Self {
        if let Ok(v) = std::env::var(LLM_API_KEY_ENV) {
            self.api_key = v;
        }
        if let Ok(v) = std::env::var(LLM_BASE_URL_ENV) {
            self.base_url = v;
        }
        if let Ok(v) = std::env::var(LLM_MODEL_ENV) {
            self.model = v;
        }
        if let Some(v) = parse_env(LLM_MAX_TOKENS_ENV) {
            self.max_tokens = v;
        }
        if let Some(v) = parse_env(LLM_TEMPERATURE_ENV) {
            self.temperature = v;
        }
        if let Some(v) = parse_env(LLM_TIMEOUT_ENV) {
            self.timeout_seconds = v;
        }
        self
    }
}

/// Full dispatch configuration record.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub backend: DispatchBackendKind,
    /// Executor argv for the subprocess backend. The request JSON arrives on
    /// the child's stdin.
    pub command: Vec<String>,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub llm: LlmConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            backend: DispatchBackendKind::Subprocess,
            command: Vec::new(),
            timeout_seconds: 600,
            max_retries: 2,
            llm: LlmConfig::default(),
        }
    }
}

impl DispatchConfig {
    /// Layer environment overrides on top of this config.
    pub fn with_env(mut self) -> Self {
        match std::env::var(DISPATCH_BACKEND_ENV).ok().as_deref() {
            Some("llm") => self.backend = DispatchBackendKind::Llm,
            Some("subprocess") => self.backend = DispatchBackendKind::Subprocess,
            Some(other) => {
                tracing::warn!(value = other, "unknown dispatch backend, keeping configured")
            }
            None => {}
        }
        if let Ok(v) = std::env::var(COMMAND_ENV) {
            self.command = v.split_whitespace().map(|s| s.to_string()).collect();
        }
        if let Some(v) = parse_env(TIMEOUT_ENV) {
            self.timeout_seconds = v;
        }
        if let Some(v) = parse_env(MAX_RETRIES_ENV) {
            self.max_retries = v;
        }
        self.llm = self.llm.with_env();
        self
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
