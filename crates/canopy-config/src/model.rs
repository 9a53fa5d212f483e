// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Canopy control plane.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Canopy configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CanopyConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// SQLite database settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Coordination queue settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Certificate info store settings.
    #[serde(default)]
    pub cert_info: CertInfoConfig,

    /// Task runtime (logbook persistence and job board) settings.
    #[serde(default)]
    pub taskflow: TaskflowConfig,

    /// Mod-SAN workflow parameters.
    #[serde(default)]
    pub mod_san: ModSanConfig,

    /// Periodic background job trigger.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Name reported in logs.
    #[serde(default = "default_daemon_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            name: default_daemon_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_daemon_name() -> String {
    "canopy".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "canopy.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Coordination queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Coordination path of the mod-SAN mapping queue.
    #[serde(default = "default_mod_san_queue_path")]
    pub mod_san_queue_path: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            mod_san_queue_path: default_mod_san_queue_path(),
        }
    }
}

fn default_mod_san_queue_path() -> String {
    "/mod_san_queue".to_string()
}

/// Which backend holds certificate info.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CertInfoBackend {
    /// JSON columns of the `provider_info` record table.
    #[default]
    Record,
    /// Nodes of the coordination key tree.
    Tree,
}

/// Certificate info store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CertInfoConfig {
    /// Backend holding certificate records.
    #[serde(default)]
    pub backend: CertInfoBackend,

    /// Partition key of the provider row in the record backend.
    #[serde(default = "default_provider_name")]
    pub provider_name: String,

    /// Hostname capacity seeded when the setting is read for the first time.
    #[serde(default = "default_hostname_limit")]
    pub default_hostname_limit: u32,
}

impl Default for CertInfoConfig {
    fn default() -> Self {
        Self {
            backend: CertInfoBackend::default(),
            provider_name: default_provider_name(),
            default_hostname_limit: default_hostname_limit(),
        }
    }
}

fn default_provider_name() -> String {
    "akamai".to_string()
}

fn default_hostname_limit() -> u32 {
    80
}

/// Task runtime configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TaskflowConfig {
    /// Job board that submitted workflows are posted to.
    #[serde(default = "default_board_name")]
    pub board_name: String,

    /// Name a worker registers under when consuming the board.
    #[serde(default = "default_conductor_name")]
    pub conductor_name: String,

    /// Seconds a worker sleeps when the board has nothing claimable.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Seconds after which a claim by an unresponsive worker expires.
    #[serde(default = "default_claim_timeout_secs")]
    pub claim_timeout_secs: u64,
}

impl Default for TaskflowConfig {
    fn default() -> Self {
        Self {
            board_name: default_board_name(),
            conductor_name: default_conductor_name(),
            poll_interval_secs: default_poll_interval_secs(),
            claim_timeout_secs: default_claim_timeout_secs(),
        }
    }
}

fn default_board_name() -> String {
    "canopy_jobs".to_string()
}

fn default_conductor_name() -> String {
    "canopy-conductor".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_claim_timeout_secs() -> u64 {
    300
}

/// Mod-SAN workflow parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModSanConfig {
    /// SAN certificate CNAMEs domains may be mapped onto. When empty, the
    /// names known to the certificate info store are used instead.
    #[serde(default)]
    pub san_cert_cnames: Vec<String>,

    /// Suffix appended to a SAN cert CNAME to form its edge hostname.
    #[serde(default = "default_san_cert_domain_suffix")]
    pub san_cert_domain_suffix: String,

    /// Property the hostname updates are applied to.
    #[serde(default = "default_property_spec")]
    pub property_spec: String,

    /// Addresses notified when a property update activates.
    #[serde(default)]
    pub notify_email_list: Vec<String>,
}

impl Default for ModSanConfig {
    fn default() -> Self {
        Self {
            san_cert_cnames: Vec::new(),
            san_cert_domain_suffix: default_san_cert_domain_suffix(),
            property_spec: default_property_spec(),
            notify_email_list: Vec::new(),
        }
    }
}

fn default_san_cert_domain_suffix() -> String {
    "edgekey.net".to_string()
}

fn default_property_spec() -> String {
    "akamai_https_san_config_numbers".to_string()
}

/// Periodic trigger for the background job controller.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Run jobs on an interval inside `canopy serve`.
    #[serde(default = "default_scheduler_enabled")]
    pub enabled: bool,

    /// Seconds between cycles.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Job types run each cycle, in order.
    #[serde(default = "default_jobs")]
    pub jobs: Vec<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_scheduler_enabled(),
            interval_secs: default_interval_secs(),
            jobs: default_jobs(),
        }
    }
}

fn default_scheduler_enabled() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    300
}

fn default_jobs() -> Vec<String> {
    vec![
        "akamai_update_papi_property_for_mod_san".to_string(),
        "akamai_check_and_update_cert_status".to_string(),
    ]
}
