// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run configuration: defaults, the optional `settings.toml` under the
//! runtime root, then `DAOKIT_*` environment overrides, in that order.

use crate::acceptance::AcceptanceConfig;
use crate::heartbeat::HeartbeatConfig;
use crate::lease::LeaseConfig;
use daokit_adapters::DispatchConfig;
use daokit_storage::RootLayout;
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

const HEARTBEAT_WARNING_ENV: &str = "DAOKIT_HEARTBEAT_WARNING_AFTER_SECONDS";
const HEARTBEAT_STALE_ENV: &str = "DAOKIT_HEARTBEAT_STALE_AFTER_SECONDS";
const HEARTBEAT_INTERVAL_ENV: &str = "DAOKIT_HEARTBEAT_CHECK_INTERVAL_SECONDS";
const ACCEPTANCE_REWORK_BOUND_ENV: &str = "DAOKIT_ACCEPTANCE_REWORK_BOUND";
const ACCEPTANCE_COMMAND_EVIDENCE_ENV: &str = "DAOKIT_ACCEPTANCE_REQUIRE_COMMAND_EVIDENCE";
const LEASE_TTL_ENV: &str = "DAOKIT_LEASE_TTL_SECONDS";

/// The `settings.toml` shape. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dispatch: DispatchConfig,
    pub heartbeat: HeartbeatConfig,
    pub acceptance: AcceptanceConfig,
    pub lease: LeaseConfig,
}

impl Settings {
    /// Load from the root's settings file; missing or unparseable files fall
    /// back to defaults (with a warning for the latter).
    pub fn load(root: &Path) -> Self {
        let path = RootLayout::new(root).settings_file();
        let Ok(raw) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        match toml::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unparseable settings file, using defaults");
                Self::default()
            }
        }
    }
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub dispatch: DispatchConfig,
    pub heartbeat: HeartbeatConfig,
    pub acceptance: AcceptanceConfig,
    pub lease: LeaseConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            dispatch: settings.dispatch,
            heartbeat: settings.heartbeat,
            acceptance: settings.acceptance,
            lease: settings.lease,
        }
    }
}

impl RunConfig {
    /// defaults → settings file → environment.
    pub fn resolve(root: &Path) -> Self {
        let settings = Settings::load(root);
        let mut config = Self {
            dispatch: settings.dispatch.with_env(),
            heartbeat: settings.heartbeat,
            acceptance: settings.acceptance,
            lease: settings.lease,
        };

        if let Some(v) = parse_env(HEARTBEAT_WARNING_ENV) {
            config.heartbeat.warning_after_seconds = v;
        }
        if let Some(v) = parse_env(HEARTBEAT_STALE_ENV) {
            config.heartbeat.stale_after_seconds = v;
        }
        if let Some(v) = parse_env(HEARTBEAT_INTERVAL_ENV) {
            config.heartbeat.check_interval_seconds = v;
        }
        if let Some(v) = parse_env(ACCEPTANCE_REWORK_BOUND_ENV) {
            config.acceptance.rework_bound = v;
        }
        if let Some(v) = parse_env::<bool>(ACCEPTANCE_COMMAND_EVIDENCE_ENV) {
            config.acceptance.require_command_evidence = v;
        }
        if let Some(v) = parse_env(LEASE_TTL_ENV) {
            config.lease.ttl_seconds = v;
        }

        config
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
