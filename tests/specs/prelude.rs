//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for driving the daokit binary black-box, plus a
//! stub dispatch executor that writes the evidence trio the way a
//! well-behaved agent would.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Returns the path to the daokit binary.
///
/// Resolves relative to the test binary itself (target/debug/deps/specs-*)
/// so it works regardless of where cargo was invoked from.
pub fn daokit_binary() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let standard = manifest_dir.join("target/debug/daokit");
    if standard.exists() {
        return standard;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join("daokit");
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

/// Write the stub executor script into `dir` and return its path.
///
/// The stub reads the dispatch request from stdin, extracts the step id and
/// evidence root, writes the evidence trio, and reports success as JSON.
pub fn stub_executor(dir: &Path) -> PathBuf {
    let path = dir.join("stub-executor.sh");
    let script = r#"#!/bin/sh
input=$(cat)
step=$(printf '%s' "$input" | sed -n 's/.*"step_id":"\([^"]*\)".*/\1/p')
root=$(printf '%s' "$input" | sed -n 's/.*"evidence_root":"\([^"]*\)".*/\1/p')
mkdir -p "$root/steps/$step"
printf 'report for %s\n' "$step" > "$root/steps/$step/report.md"
printf 'Command: stub-executor --step %s\nall checks passed\n' "$step" > "$root/steps/$step/verification.log"
printf 'audit summary for %s\n' "$step" > "$root/steps/$step/audit-summary.md"
printf '{"status":"ok"}\n'
"#;
    std::fs::write(&path, script).unwrap();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    path
}

/// Create a CLI builder for daokit commands.
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// High-level CLI builder for fluent test assertions.
pub struct CliBuilder {
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Add CLI arguments
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Point the subprocess dispatch backend at the stub executor.
    pub fn executor(mut self, path: &Path) -> Self {
        self.envs.push((
            "DAOKIT_DISPATCH_COMMAND".to_string(),
            path.to_string_lossy().to_string(),
        ));
        self
    }

    /// Set an environment variable
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.envs.push((key.to_string(), value.to_string()));
        self
    }

    /// Run and return the raw output.
    pub fn output(self) -> Output {
        let mut cmd = assert_cmd::Command::from_std(Command::new(daokit_binary()));
        cmd.args(&self.args);

        // Keep the parent environment from steering backend selection
        cmd.env_remove("DAOKIT_STATE_BACKEND");
        cmd.env_remove("DAOKIT_DISPATCH_BACKEND");
        cmd.env_remove("DAOKIT_DISPATCH_COMMAND");
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }

        cmd.output().expect("failed to run daokit")
    }

    /// Run, assert exit 0, and return stdout.
    pub fn passes(self) -> String {
        let output = self.output();
        assert!(
            output.status.success(),
            "expected success, got {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    /// Run, assert the given exit code, and return stderr.
    pub fn fails_with(self, code: i32) -> String {
        let output = self.output();
        assert_eq!(
            output.status.code(),
            Some(code),
            "stdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
        String::from_utf8_lossy(&output.stderr).to_string()
    }
}

/// Parse the event journal under a root into JSON values.
pub fn read_events(root: &Path) -> Vec<serde_json::Value> {
    let raw = std::fs::read_to_string(root.join("state/events.jsonl")).unwrap_or_default();
    raw.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

/// Event type names, in journal order.
pub fn event_types(root: &Path) -> Vec<String> {
    read_events(root)
        .iter()
        .map(|e| e["event_type"].as_str().unwrap().to_string())
        .collect()
}

/// Assert `expected` appears as an in-order subsequence of `events`.
pub fn assert_subsequence(events: &[String], expected: &[&str]) {
    let mut it = events.iter();
    for want in expected {
        assert!(
            it.any(|got| got == want),
            "missing {want} (in order) within {events:?}"
        );
    }
}
