// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator reconciliation of the mapping queue.
//!
//! PUT operations validate every entry before touching the queue. A single
//! bad entry rejects the whole list with one message per offending entry.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use canopy_core::{CanopyError, MappingRequest, SanRetryEntry, ServiceCatalog};

use crate::controller::BackgroundJobController;

const REQUIRED_FIELDS: [&str; 3] = ["project_id", "domain_name", "flavor_id"];

/// Response body of a list replacement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListUpdate<T> {
    pub queue: Vec<T>,
    pub deleted: Vec<T>,
}

/// Admin surface for the san-retry and san-mapping lists.
pub struct SanRetryAdmin {
    controller: Arc<BackgroundJobController>,
    services: Option<Arc<dyn ServiceCatalog>>,
}

impl SanRetryAdmin {
    pub fn new(controller: Arc<BackgroundJobController>) -> Self {
        Self {
            controller,
            services: None,
        }
    }

    /// Check `validate_service` entries against `services` on PUT.
    pub fn with_service_catalog(mut self, services: Arc<dyn ServiceCatalog>) -> Self {
        self.services = Some(services);
        self
    }

    /// Queue contents in the normalized retry shape.
    pub async fn admin_get_san_retry_list(&self) -> Result<Vec<SanRetryEntry>, CanopyError> {
        Ok(self
            .controller
            .get_san_mapping_list()
            .await?
            .iter()
            .map(MappingRequest::to_retry_entry)
            .collect())
    }

    /// Replace the queue with retry entries.
    ///
    /// `deleted` lists previous entries, normalized, that are not in the new list.
    pub async fn admin_put_san_retry_list(
        &self,
        entries: Vec<Value>,
    ) -> Result<ListUpdate<SanRetryEntry>, CanopyError> {
        let mut errors = Vec::new();
        let mut requests = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            match parse_retry_entry(entry) {
                Ok(retry) => requests.push(MappingRequest::from(retry)),
                Err(message) => errors.push(format!("entry {i}: {message}")),
            }
        }
        if !errors.is_empty() {
            return Err(CanopyError::ValidationFailed { errors });
        }
        self.check_services(&requests).await?;

        let (queue, deleted) = self.controller.put_san_mapping_list(requests).await?;
        let queue: Vec<SanRetryEntry> = queue.iter().map(MappingRequest::to_retry_entry).collect();
        let deleted: Vec<SanRetryEntry> = deleted
            .iter()
            .map(MappingRequest::to_retry_entry)
            .filter(|d| !queue.contains(d))
            .collect();
        info!(
            queued = queue.len(),
            deleted = deleted.len(),
            "san-retry list replaced"
        );
        Ok(ListUpdate { queue, deleted })
    }

    pub async fn admin_get_san_mapping_list(&self) -> Result<Vec<MappingRequest>, CanopyError> {
        self.controller.get_san_mapping_list().await
    }

    /// Replace the queue with full mapping requests.
    pub async fn admin_put_san_mapping_list(
        &self,
        entries: Vec<Value>,
    ) -> Result<ListUpdate<MappingRequest>, CanopyError> {
        let mut errors = Vec::new();
        let mut requests = Vec::with_capacity(entries.len());
        for (i, entry) in entries.into_iter().enumerate() {
            let missing = missing_fields(&entry);
            if !missing.is_empty() {
                errors.push(format!("entry {i}: missing {}", missing.join(", ")));
                continue;
            }
            match serde_json::from_value::<MappingRequest>(entry) {
                Ok(request) => requests.push(request),
                Err(e) => errors.push(format!("entry {i}: {e}")),
            }
        }
        if !errors.is_empty() {
            return Err(CanopyError::ValidationFailed { errors });
        }
        self.check_services(&requests).await?;

        let (queue, deleted) = self.controller.put_san_mapping_list(requests).await?;
        info!(
            queued = queue.len(),
            deleted = deleted.len(),
            "san-mapping list replaced"
        );
        Ok(ListUpdate { queue, deleted })
    }

    async fn check_services(&self, requests: &[MappingRequest]) -> Result<(), CanopyError> {
        let Some(services) = &self.services else {
            return Ok(());
        };
        let mut errors = Vec::new();
        for (i, request) in requests.iter().enumerate() {
            if request.should_validate_service()
                && !services
                    .domain_exists(&request.project_id, &request.domain_name)
                    .await?
            {
                errors.push(format!(
                    "entry {i}: domain `{}` has no service in project `{}`",
                    request.domain_name, request.project_id
                ));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CanopyError::ValidationFailed { errors })
        }
    }
}

/// Required string fields that are absent, null, empty or not strings.
fn missing_fields(entry: &Value) -> Vec<&'static str> {
    REQUIRED_FIELDS
        .into_iter()
        .filter(|field| {
            !entry
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|v| !v.trim().is_empty())
        })
        .collect()
}

fn parse_retry_entry(entry: &Value) -> Result<SanRetryEntry, String> {
    if !entry.is_object() {
        return Err("expected an object".to_string());
    }
    let missing = missing_fields(entry);
    if !missing.is_empty() {
        return Err(format!("missing {}", missing.join(", ")));
    }
    let validate_service = match entry.get("validate_service") {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => *b,
        Some(other) => return Err(format!("validate_service must be a boolean, got {other}")),
    };
    let field = |name: &str| entry[name].as_str().unwrap_or_default().to_string();
    Ok(SanRetryEntry {
        project_id: field("project_id"),
        domain_name: field("domain_name"),
        flavor_id: field("flavor_id"),
        validate_service,
    })
}
