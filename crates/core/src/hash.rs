// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical content hashing for snapshots, proofs, and derived ids.
//!
//! Canonical form is the `serde_json` rendering of a `Value`: object keys are
//! kept sorted by the default `Map` representation, so serialising the same
//! logical content always yields the same bytes.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hex sha-256 over the canonical JSON rendering of `value`.
///
/// Returns the hash of the literal string `"null"` for values that fail to
/// serialise; callers treat the hash as opaque so this keeps the function
/// total without panicking inside hashing paths.
pub fn canonical_hash<T: Serialize>(value: &T) -> String {
    let canonical = serde_json::to_value(value)
        .and_then(|v| serde_json::to_string(&v))
        .unwrap_or_else(|_| "null".to_string());
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex_encode(&hasher.finalize())
}

/// First `n` hex characters of the canonical hash.
pub fn short_hash<T: Serialize>(value: &T, n: usize) -> String {
    let mut hash = canonical_hash(value);
    hash.truncate(n);
    hash
}

/// Derive a stable identifier `"<prefix>-<hash12>"` from canonical content.
///
/// Used for task/run ids when the caller does not supply them, and for
/// thread ids so retries converge on the same thread-space.
pub fn derived_id<T: Serialize>(prefix: &str, value: &T) -> String {
    format!("{}-{}", prefix, short_hash(value, 12))
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
#[path = "hash_tests.rs"]
mod tests;
