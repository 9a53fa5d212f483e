// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./canopy.toml` > `~/.config/canopy/canopy.toml` > `/etc/canopy/canopy.toml`
//! with environment variable overrides via `CANOPY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CanopyConfig;

/// Config sections that env vars may target, longest names first so that
/// `CANOPY_MOD_SAN_...` is not mistaken for a shorter section.
const ENV_SECTIONS: &[&str] = &[
    "cert_info",
    "scheduler",
    "taskflow",
    "mod_san",
    "storage",
    "daemon",
    "queue",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/canopy/canopy.toml` (system-wide)
/// 3. `~/.config/canopy/canopy.toml` (user XDG config)
/// 4. `./canopy.toml` (local directory)
/// 5. `CANOPY_*` environment variables
pub fn load_config() -> Result<CanopyConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<CanopyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CanopyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CanopyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CanopyConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CanopyConfig::default()))
        .merge(Toml::file("/etc/canopy/canopy.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("canopy/canopy.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("canopy.toml"))
        .merge(env_provider())
}

/// Map a lowercased, prefix-stripped env var name onto a dotted config key.
///
/// Section names and key names both contain underscores, so splitting on `_`
/// is ambiguous: `CANOPY_MOD_SAN_PROPERTY_SPEC` must become
/// `mod_san.property_spec`. Unknown sections are passed through unchanged and
/// rejected later by `deny_unknown_fields`.
pub fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
fn env_provider() -> Env {
    Env::prefixed("CANOPY_").map(|key| map_env_key(key.as_str()).into())
}
