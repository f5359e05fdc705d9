// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn no_declared_scope_allows_everything() {
    let changed = strings(&["src/anything.rs", "/etc/passwd"]);
    assert!(violations(None, &changed).is_empty());
}

#[test]
fn out_of_scope_files_are_listed_in_order() {
    let scope = strings(&["src/foo/**"]);
    let changed = strings(&["src/foo/a.py", "src/bar/b.py"]);
    assert_eq!(violations(Some(&scope), &changed), strings(&["src/bar/b.py"]));
}

#[parameterized(
    exact = { "src/foo/a.py", true },
    nested = { "src/foo/deep/b.py", true },
    sibling = { "src/bar/b.py", false },
    outside = { "README.md", false },
)]
fn single_glob_matching(file: &str, in_scope: bool) {
    let scope = strings(&["src/foo/**"]);
    let changed = strings(&[file]);
    assert_eq!(violations(Some(&scope), &changed).is_empty(), in_scope);
}

#[test]
fn any_matching_pattern_admits_a_file() {
    let scope = strings(&["docs/**", "src/foo/**"]);
    let changed = strings(&["docs/guide.md", "src/foo/a.rs"]);
    assert!(violations(Some(&scope), &changed).is_empty());
}

#[test]
fn invalid_pattern_matches_nothing() {
    let scope = strings(&["src/[foo/**"]);
    let changed = strings(&["src/foo/a.rs"]);
    assert_eq!(violations(Some(&scope), &changed), changed);
}

#[test]
fn empty_scope_list_rejects_all_changes() {
    let scope: Vec<String> = Vec::new();
    let changed = strings(&["a.rs"]);
    assert_eq!(violations(Some(&scope), &changed), changed);
}
