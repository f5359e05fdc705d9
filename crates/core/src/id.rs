// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier newtypes and lease-token minting.
//!
//! Every ledger record correlates through string ids (`TaskId`, `RunId`,
//! `StepId`, `ThreadId`). The newtypes exist so the correlation axes cannot
//! be mixed up at call sites; they stay `String`-backed because ids arrive
//! from the CLI and from derived hashes, never from a dense keyspace.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Define a `String`-backed identifier for one correlation axis.
///
/// Ids derive `Ord` so merged views (operator timelines, checkpoint
/// listings) sort deterministically without per-site comparators.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

/// Mints opaque lease tokens.
///
/// Tokens prove lease ownership on every mutating registry operation, so
/// production tokens must be unguessable; tests need them predictable.
pub trait TokenGen: Clone + Send + Sync {
    fn mint(&self) -> String;
}

/// Random (UUID v4) tokens for production leases.
#[derive(Clone, Default)]
pub struct UuidTokenGen;

impl TokenGen for UuidTokenGen {
    fn mint(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic `<prefix>-<n>` tokens for tests.
#[derive(Clone)]
pub struct CountingTokenGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl CountingTokenGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl TokenGen for CountingTokenGen {
    fn mint(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
