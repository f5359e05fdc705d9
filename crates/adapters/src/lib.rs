// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Dispatch adapter layer: bounded subprocess/LLM invocations with per-call
//! artifact persistence.

mod artifact;
mod backend;
mod config;
mod llm;
mod subprocess;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use artifact::{newest_artifact_mtime, ArtifactPaths, ArtifactStore, ErrorArtifact};
pub use backend::{
    backend_for, CallKind, DispatchBackend, DispatchError, DispatchRequest, DispatchResult,
    DispatchStatus,
};
pub use config::{DispatchBackendKind, DispatchConfig, LlmConfig, DISPATCH_BACKEND_ENV};
pub use llm::LlmBackend;
pub use subprocess::SubprocessBackend;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeBackend, FakeOutcome};
