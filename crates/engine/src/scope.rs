// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scope guard: dispatch-induced file changes must stay inside the step's
//! declared allowed path set.

use glob::Pattern;

/// Files changed outside the allowed globs, in input order.
///
/// A step with no declared scope allows everything. Patterns that fail to
/// parse match nothing, so a bad pattern narrows scope instead of widening it.
pub fn violations(allowed_scope: Option<&[String]>, changed_files: &[String]) -> Vec<String> {
    let Some(scope) = allowed_scope else {
        return Vec::new();
    };

    let patterns: Vec<Pattern> = scope
        .iter()
        .filter_map(|raw| match Pattern::new(raw) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                tracing::warn!(pattern = %raw, error = %e, "invalid scope glob, matches nothing");
                None
            }
        })
        .collect();

    changed_files
        .iter()
        .filter(|file| !patterns.iter().any(|p| p.matches(file)))
        .cloned()
        .collect()
}

#[cfg(test)]
#[path = "scope_tests.rs"]
mod tests;
