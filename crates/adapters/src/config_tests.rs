// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear_env() {
    for name in [
        DISPATCH_BACKEND_ENV,
        COMMAND_ENV,
        TIMEOUT_ENV,
        MAX_RETRIES_ENV,
        LLM_API_KEY_ENV,
        LLM_BASE_URL_ENV,
        LLM_MODEL_ENV,
        LLM_MAX_TOKENS_ENV,
        LLM_TEMPERATURE_ENV,
        LLM_TIMEOUT_ENV,
    ] {
        std::env::remove_var(name);
    }
}

#[test]
#[serial]
fn defaults_without_env() {
    clear_env();
    let config = DispatchConfig::default().with_env();
    assert_eq!(config.backend, DispatchBackendKind::Subprocess);
    assert!(config.command.is_empty());
    assert_eq!(config.timeout_seconds, 600);
    assert_eq!(config.max_retries, 2);
}

#[test]
#[serial]
fn env_selects_backend_and_command() {
    clear_env();
    std::env::set_var(DISPATCH_BACKEND_ENV, "llm");
    std::env::set_var(COMMAND_ENV, "/usr/bin/executor --flag");
    std::env::set_var(TIMEOUT_ENV, "30");

    let config = DispatchConfig::default().with_env();
    assert_eq!(config.backend, DispatchBackendKind::Llm);
    assert_eq!(config.command, vec!["/usr/bin/executor", "--flag"]);
    assert_eq!(config.timeout_seconds, 30);
    clear_env();
}

#[test]
#[serial]
fn unknown_backend_value_keeps_configured() {
    clear_env();
    std::env::set_var(DISPATCH_BACKEND_ENV, "carrier-pigeon");
    let config = DispatchConfig::default().with_env();
    assert_eq!(config.backend, DispatchBackendKind::Subprocess);
    clear_env();
}

#[test]
#[serial]
fn llm_env_overrides() {
    clear_env();
    std::env::set_var(LLM_API_KEY_ENV, "sk-test");
    std::env::set_var(LLM_MODEL_ENV, "local-model");
    std::env::set_var(LLM_MAX_TOKENS_ENV, "128");
    std::env::set_var(LLM_TEMPERATURE_ENV, "0.5");

    let config = LlmConfig::default().with_env();
    assert_eq!(config.api_key, "sk-test");
    assert_eq!(config.model, "local-model");
    assert_eq!(config.max_tokens, 128);
    assert!((config.temperature - 0.5).abs() < f32::EPSILON);
    clear_env();
}

#[test]
#[serial]
fn settings_toml_shape_deserializes() {
    clear_env();
    let config: DispatchConfig = serde_json::from_str(
        r#"{
            "backend": "llm",
            "command": ["run-step"],
            "timeout_seconds": 45,
            "llm": {"model": "m1"}
        }"#,
    )
    .unwrap();
    assert_eq!(config.backend, DispatchBackendKind::Llm);
    assert_eq!(config.timeout_seconds, 45);
    assert_eq!(config.llm.model, "m1");
    // Unspecified fields keep defaults
    assert_eq!(config.max_retries, 2);
}
