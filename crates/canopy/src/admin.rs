// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `canopy post-job`, `canopy san-retry` and `canopy san-mapping`.

use serde_json::Value;
use tracing::info;

use canopy_config::CanopyConfig;
use canopy_core::CanopyError;
use canopy_modsan::SanRetryAdmin;

use crate::runtime::Runtime;
use crate::{ListAction, print_json, read_json};

/// Parse `--kwargs`, which must be a JSON object.
fn parse_kwargs(raw: &str) -> Result<Value, CanopyError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(CanopyError::validation("--kwargs must be a JSON object")),
        Err(e) => Err(CanopyError::validation(format!("--kwargs is not valid JSON: {e}"))),
    }
}

pub(crate) async fn post_job(
    config: &CanopyConfig,
    job_type: &str,
    kwargs: &str,
) -> Result<(), CanopyError> {
    let kwargs = parse_kwargs(kwargs)?;
    let runtime = Runtime::open(config).await?;
    let outcome = runtime.controller.post_job(job_type, kwargs).await;
    runtime.shutdown().await?;

    let outcome = outcome?;
    info!(
        job = %job_type,
        run = outcome.run_list.len(),
        ignored = outcome.ignore_list.len(),
        lost = outcome.lost.len(),
        "job finished"
    );
    print_json(&outcome)
}

pub(crate) async fn san_retry(config: &CanopyConfig, action: ListAction) -> Result<(), CanopyError> {
    let runtime = Runtime::open(config).await?;
    let admin = SanRetryAdmin::new(runtime.controller.clone());
    let result = match action {
        ListAction::Get => admin.admin_get_san_retry_list().await.and_then(|l| print_json(&l)),
        ListAction::Put { file } => match read_json::<Vec<Value>>(&file) {
            Ok(entries) => admin
                .admin_put_san_retry_list(entries)
                .await
                .and_then(|update| print_json(&update)),
            Err(e) => Err(e),
        },
    };
    runtime.shutdown().await?;
    result
}

pub(crate) async fn san_mapping(config: &CanopyConfig, action: ListAction) -> Result<(), CanopyError> {
    let runtime = Runtime::open(config).await?;
    let admin = SanRetryAdmin::new(runtime.controller.clone());
    let result = match action {
        ListAction::Get => admin.admin_get_san_mapping_list().await.and_then(|l| print_json(&l)),
        ListAction::Put { file } => match read_json::<Vec<Value>>(&file) {
            Ok(entries) => admin
                .admin_put_san_mapping_list(entries)
                .await
                .and_then(|update| print_json(&update)),
            Err(e) => Err(e),
        },
    };
    runtime.shutdown().await?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kwargs_must_be_an_object() {
        assert_eq!(
            parse_kwargs(r#"{"project_id":"p1"}"#).unwrap()["project_id"],
            "p1"
        );
        assert!(matches!(
            parse_kwargs("[1, 2]"),
            Err(CanopyError::ValidationFailed { .. })
        ));
        assert!(matches!(
            parse_kwargs("{oops"),
            Err(CanopyError::ValidationFailed { .. })
        ));
    }
}
