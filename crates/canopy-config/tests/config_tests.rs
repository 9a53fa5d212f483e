// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Canopy configuration system.

use canopy_config::diagnostic::ConfigError;
use canopy_config::model::{CanopyConfig, CertInfoBackend};
use canopy_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with all known sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_canopy_config() {
    let toml = r#"
[daemon]
name = "canopy-test"
log_level = "debug"

[storage]
database_path = "/tmp/canopy-test.db"
wal_mode = false

[queue]
mod_san_queue_path = "/mod_san_queue_staging"

[cert_info]
backend = "tree"
provider_name = "akamai"
default_hostname_limit = 100

[taskflow]
board_name = "staging_jobs"
conductor_name = "worker-1"
poll_interval_secs = 2
claim_timeout_secs = 60

[mod_san]
san_cert_cnames = ["secure1.san1.example.net", "secure2.san1.example.net"]
san_cert_domain_suffix = "edgekey.net"
property_spec = "akamai_https_san_config_numbers"
notify_email_list = ["ops@example.com"]

[scheduler]
enabled = false
interval_secs = 60
jobs = ["akamai_check_and_update_cert_status"]
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.daemon.name, "canopy-test");
    assert_eq!(config.daemon.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/canopy-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.queue.mod_san_queue_path, "/mod_san_queue_staging");
    assert_eq!(config.cert_info.backend, CertInfoBackend::Tree);
    assert_eq!(config.cert_info.default_hostname_limit, 100);
    assert_eq!(config.taskflow.board_name, "staging_jobs");
    assert_eq!(config.taskflow.claim_timeout_secs, 60);
    assert_eq!(config.mod_san.san_cert_cnames.len(), 2);
    assert_eq!(config.mod_san.notify_email_list, vec!["ops@example.com"]);
    assert!(!config.scheduler.enabled);
    assert_eq!(config.scheduler.jobs, vec!["akamai_check_and_update_cert_status"]);
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.daemon.name, "canopy");
    assert_eq!(config.daemon.log_level, "info");
    assert_eq!(config.storage.database_path, "canopy.db");
    assert!(config.storage.wal_mode);
    assert_eq!(config.queue.mod_san_queue_path, "/mod_san_queue");
    assert_eq!(config.cert_info.backend, CertInfoBackend::Record);
    assert_eq!(config.cert_info.provider_name, "akamai");
    assert_eq!(config.cert_info.default_hostname_limit, 80);
    assert_eq!(config.taskflow.poll_interval_secs, 5);
    assert!(config.mod_san.san_cert_cnames.is_empty());
    assert_eq!(config.mod_san.san_cert_domain_suffix, "edgekey.net");
    assert!(config.scheduler.enabled);
    assert_eq!(config.scheduler.interval_secs, 300);
    assert_eq!(config.scheduler.jobs.len(), 2);
}

/// Dotted overrides (what the env provider produces) win over TOML.
#[test]
fn dotted_override_wins_over_toml() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let toml_content = r#"
[mod_san]
property_spec = "from-toml"
"#;

    let config: CanopyConfig = Figment::new()
        .merge(Serialized::defaults(CanopyConfig::default()))
        .merge(Toml::string(toml_content))
        .merge(("mod_san.property_spec", "from-env"))
        .extract()
        .expect("should merge override");

    assert_eq!(config.mod_san.property_spec, "from-env");
}

/// CANOPY_* variables reach nested keys that contain underscores.
#[test]
#[serial_test::serial]
fn env_var_overrides_underscored_section() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("canopy.toml");
    std::fs::write(&path, "[cert_info]\nprovider_name = \"akamai\"\n").unwrap();

    // SAFETY: serialized test, no other thread reads the environment.
    unsafe { std::env::set_var("CANOPY_CERT_INFO_PROVIDER_NAME", "akamai-staging") };
    let result = load_and_validate_path(&path);
    unsafe { std::env::remove_var("CANOPY_CERT_INFO_PROVIDER_NAME") };

    let config = result.expect("config should load");
    assert_eq!(config.cert_info.provider_name, "akamai-staging");
}

/// Unknown field in a section produces an UnknownKey diagnostic with a suggestion.
#[test]
fn unknown_key_suggests_correction() {
    let toml = r#"
[scheduler]
intervl_secs = 10
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "intervl_secs"
                && suggestion.as_deref() == Some("interval_secs")
                && valid_keys.contains("jobs")
        })
    });
    assert!(found, "expected UnknownKey for intervl_secs, got: {errors:?}");
}

/// Unexpected top-level section is rejected by deny_unknown_fields.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[gateway]
port = 8080
"#;

    let err = load_config_from_str(toml).expect_err("unknown section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("gateway"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Unknown backend variant is reported as an invalid value.
#[test]
fn unknown_cert_info_backend_is_rejected() {
    let toml = r#"
[cert_info]
backend = "etcd"
"#;

    let errors = load_and_validate_str(toml).expect_err("unknown backend should fail");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidValue { detail, .. } if detail.contains("etcd"))),
        "got: {errors:?}"
    );
}

/// Invalid type (string where number expected) produces a clear message.
#[test]
fn invalid_type_message() {
    let toml = r#"
[taskflow]
poll_interval_secs = "soon"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors.iter().any(
            |e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("poll_interval_secs"))
        ),
        "got: {errors:?}"
    );
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_catches_unknown_job_type() {
    let toml = r#"
[scheduler]
jobs = ["akamai_check_and_update_cert_status", "purge_everything"]
"#;

    let errors = load_and_validate_str(toml).expect_err("unknown job should fail");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("purge_everything"))
    ));
}

/// ConfigError can be rendered using miette's graphical handler.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "intervl_secs".to_string(),
        section: "scheduler".to_string(),
        suggestion: Some("interval_secs".to_string()),
        valid_keys: "enabled, interval_secs, jobs".to_string(),
        span: None,
        src: None,
    };

    assert!(error.code().is_some(), "should have diagnostic code");
    let help = error.help().expect("should have help text").to_string();
    assert!(help.contains("did you mean `interval_secs`"), "got: {help}");

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("intervl_secs"));
}
