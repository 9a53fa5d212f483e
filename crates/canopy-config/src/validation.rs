// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths, known job types, and positive intervals.

use std::collections::HashSet;
use std::str::FromStr;

use canopy_core::JobType;

use crate::diagnostic::ConfigError;
use crate::model::CanopyConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CanopyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        invalid("storage.database_path must not be empty".to_string());
    }

    let queue_path = &config.queue.mod_san_queue_path;
    if !queue_path.starts_with('/') || queue_path.len() < 2 || queue_path.ends_with('/') {
        invalid(format!(
            "queue.mod_san_queue_path `{queue_path}` must be an absolute coordination path like `/mod_san_queue`"
        ));
    }

    if config.cert_info.provider_name.trim().is_empty() {
        invalid("cert_info.provider_name must not be empty".to_string());
    }

    if config.cert_info.default_hostname_limit == 0 {
        invalid("cert_info.default_hostname_limit must be at least 1".to_string());
    }

    if config.taskflow.board_name.trim().is_empty() {
        invalid("taskflow.board_name must not be empty".to_string());
    }

    if config.taskflow.poll_interval_secs == 0 {
        invalid("taskflow.poll_interval_secs must be at least 1".to_string());
    }

    if config.taskflow.claim_timeout_secs == 0 {
        invalid("taskflow.claim_timeout_secs must be at least 1".to_string());
    }

    let mut seen_cnames = HashSet::new();
    for (i, cname) in config.mod_san.san_cert_cnames.iter().enumerate() {
        if cname.trim().is_empty() {
            invalid(format!("mod_san.san_cert_cnames[{i}] must not be empty"));
        } else if !seen_cnames.insert(cname) {
            invalid(format!(
                "duplicate SAN cert CNAME `{cname}` in mod_san.san_cert_cnames"
            ));
        }
    }

    if config.mod_san.san_cert_domain_suffix.trim().is_empty() {
        invalid("mod_san.san_cert_domain_suffix must not be empty".to_string());
    }

    if config.scheduler.interval_secs == 0 {
        invalid("scheduler.interval_secs must be at least 1".to_string());
    }

    for job in &config.scheduler.jobs {
        if JobType::from_str(job).is_err() {
            invalid(format!("scheduler.jobs contains unknown job type `{job}`"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
