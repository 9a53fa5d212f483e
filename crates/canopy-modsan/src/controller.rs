// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background job controller for the mod-SAN pipeline.
//!
//! `akamai_update_papi_property_for_mod_san` scans the queue without
//! changing it and submits one property update covering every valid item.
//! `akamai_check_and_update_cert_status` drains the items present at the
//! start of the cycle: activated ones are handed to the status flow and
//! leave the queue, the rest go back on it.
//!
//! Item-level failures never drop an item. It is re-enqueued with an
//! `error_message`, or as its original payload if that fails, and only if
//! both attempts fail is it reported in [`JobOutcome::lost`]. Keys of a
//! queued request that [`MappingRequest`] does not model are carried along.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use canopy_config::model::ModSanConfig;
use canopy_core::types::ProviderCertDetail;
use canopy_core::{
    AKAMAI_PROVIDER, CHECK_CERT_STATUS_AND_UPDATE_FLOW, CanopyError, CertInfoStore, CertType,
    HostnameUpdate, JobType, MappingRequest, TaskArgs, TaskSubmitter, UPDATE_PROPERTY_FLOW,
};

use crate::queue::MappingQueue;

/// An item a job looked at but did not act on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IgnoredEntry {
    /// A well-formed request, possibly annotated with `error_message`.
    Request(MappingRequest),
    /// A payload that is not a valid mapping request.
    Malformed { raw: String, error_message: String },
}

impl IgnoredEntry {
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Request(req) => req.error_message.as_deref(),
            Self::Malformed { error_message, .. } => Some(error_message),
        }
    }
}

/// An item that could not be put back on the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LostItem {
    pub raw: String,
    pub error_message: String,
}

/// Result of one `post_job` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobOutcome {
    pub run_list: Vec<MappingRequest>,
    pub ignore_list: Vec<IgnoredEntry>,
    pub lost: Vec<LostItem>,
    /// Items put back as their original payload because the annotated one
    /// could not be enqueued.
    pub raw_fallbacks: usize,
}

/// How an item taken off the queue was put back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequeueOutcome {
    /// The preferred payload was enqueued.
    Requeued,
    /// The preferred payload failed; the original payload was enqueued.
    RequeuedRaw,
    /// Both attempts failed.
    Lost,
}

/// Certificate object handed to the status flow as `cert_obj_json`.
#[derive(Serialize)]
struct CertObject<'a> {
    flavor_id: &'a str,
    domain_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cert_type: Option<CertType>,
    project_id: &'a str,
    cert_details: &'a BTreeMap<String, ProviderCertDetail>,
}

impl<'a> From<&'a MappingRequest> for CertObject<'a> {
    fn from(req: &'a MappingRequest) -> Self {
        Self {
            flavor_id: &req.flavor_id,
            domain_name: &req.domain_name,
            cert_type: req.cert_type,
            project_id: &req.project_id,
            cert_details: &req.cert_details,
        }
    }
}

/// Runs the mod-SAN background jobs against one queue.
pub struct BackgroundJobController {
    queue: MappingQueue,
    cert_info: Arc<dyn CertInfoStore>,
    submitter: Arc<dyn TaskSubmitter>,
    settings: ModSanConfig,
}

impl BackgroundJobController {
    pub fn new(
        queue: MappingQueue,
        cert_info: Arc<dyn CertInfoStore>,
        submitter: Arc<dyn TaskSubmitter>,
        settings: ModSanConfig,
    ) -> Self {
        Self {
            queue,
            cert_info,
            submitter,
            settings,
        }
    }

    pub fn queue(&self) -> &MappingQueue {
        &self.queue
    }

    pub fn cert_info(&self) -> &Arc<dyn CertInfoStore> {
        &self.cert_info
    }

    /// Run one cycle of `job_type`.
    ///
    /// `kwargs` may carry a `project_id` that overrides the per-item one in
    /// submitted status flows.
    pub async fn post_job(&self, job_type: &str, kwargs: Value) -> Result<JobOutcome, CanopyError> {
        let job = JobType::from_str(job_type)
            .map_err(|_| CanopyError::UnknownJobType(job_type.to_string()))?;
        let outcome = match job {
            JobType::CheckAndUpdateCertStatus => self.check_and_update_cert_status(&kwargs).await?,
            JobType::UpdatePapiPropertyForModSan => self.update_papi_property_for_mod_san().await?,
        };
        info!(
            job = %job,
            run = outcome.run_list.len(),
            ignored = outcome.ignore_list.len(),
            lost = outcome.lost.len(),
            "background job finished"
        );
        Ok(outcome)
    }

    async fn check_and_update_cert_status(&self, kwargs: &Value) -> Result<JobOutcome, CanopyError> {
        let mut outcome = JobOutcome::default();
        let project_override = kwargs.get("project_id").and_then(Value::as_str);

        // Bound the cycle so items put back below are not seen again.
        let pending = self.queue.len().await?;
        for _ in 0..pending {
            let Some(raw) = self.queue.dequeue(true).await? else {
                break;
            };

            let mut request = match MappingRequest::from_json(&raw) {
                Ok(request) => request,
                Err(e) => {
                    let message = format!("invalid mapping request: {e}");
                    warn!(error = %message, "skipping unparsable queue item");
                    let annotated = annotate_raw(&raw, &message);
                    self.put_back(annotated, &raw, &message, &mut outcome).await;
                    outcome.ignore_list.push(IgnoredEntry::Malformed {
                        raw,
                        error_message: message,
                    });
                    continue;
                }
            };

            info!(
                domain = %request.domain_name,
                project_id = %request.project_id,
                flavor_id = %request.flavor_id,
                "checking certificate status"
            );

            if !request.is_property_activated() {
                self.put_back(Some(raw.clone()), &raw, "requeue failed", &mut outcome)
                    .await;
                outcome.ignore_list.push(IgnoredEntry::Request(request));
                continue;
            }

            match self.submit_status_flow(&request, project_override).await {
                Ok(()) => outcome.run_list.push(request),
                Err(e) => {
                    let message = e.to_string();
                    warn!(domain = %request.domain_name, error = %message, "status flow submission failed");
                    request.error_message = Some(message.clone());
                    let annotated = request.to_json().ok();
                    self.put_back(annotated, &raw, &message, &mut outcome).await;
                    outcome.ignore_list.push(IgnoredEntry::Request(request));
                }
            }
        }
        Ok(outcome)
    }

    async fn submit_status_flow(
        &self,
        request: &MappingRequest,
        project_override: Option<&str>,
    ) -> Result<(), CanopyError> {
        let cert_obj_json = serde_json::to_string(&CertObject::from(request))?;
        let mut args = TaskArgs::new();
        args.insert("cert_obj_json".to_string(), Value::String(cert_obj_json));
        args.insert(
            "project_id".to_string(),
            Value::String(project_override.unwrap_or(&request.project_id).to_string()),
        );
        self.submitter
            .submit_task(CHECK_CERT_STATUS_AND_UPDATE_FLOW, args)
            .await
    }

    /// Put an item back, preferring `preferred` and falling back to `raw`.
    async fn put_back(
        &self,
        preferred: Option<String>,
        raw: &str,
        reason: &str,
        outcome: &mut JobOutcome,
    ) {
        match self.requeue(preferred, raw).await {
            RequeueOutcome::Requeued => {}
            RequeueOutcome::RequeuedRaw => outcome.raw_fallbacks += 1,
            RequeueOutcome::Lost => {
                error!(item = raw, reason, "queue item lost after two failed re-enqueues");
                outcome.lost.push(LostItem {
                    raw: raw.to_string(),
                    error_message: reason.to_string(),
                });
            }
        }
    }

    async fn requeue(&self, preferred: Option<String>, raw: &str) -> RequeueOutcome {
        if let Some(item) = preferred {
            match self.queue.enqueue(item).await {
                Ok(()) => return RequeueOutcome::Requeued,
                Err(e) => warn!(error = %e, "re-enqueue failed, retrying with original payload"),
            }
        }
        match self.queue.enqueue(raw.to_string()).await {
            Ok(()) => RequeueOutcome::RequeuedRaw,
            Err(e) => {
                warn!(error = %e, "re-enqueue of original payload failed");
                RequeueOutcome::Lost
            }
        }
    }

    async fn valid_san_cert_cnames(&self) -> Result<BTreeSet<String>, CanopyError> {
        if self.settings.san_cert_cnames.is_empty() {
            Ok(self
                .cert_info
                .list_all_san_cert_names()
                .await?
                .into_iter()
                .collect())
        } else {
            Ok(self.settings.san_cert_cnames.iter().cloned().collect())
        }
    }

    async fn update_papi_property_for_mod_san(&self) -> Result<JobOutcome, CanopyError> {
        let mut outcome = JobOutcome::default();
        let valid_cnames = self.valid_san_cert_cnames().await?;
        let mut updates = Vec::new();

        for raw in self.queue.traverse_queue(false).await? {
            let mut request = match MappingRequest::from_json(&raw) {
                Ok(request) => request,
                Err(e) => {
                    let error_message = format!("invalid mapping request: {e}");
                    warn!(error = %error_message, "skipping unparsable queue item");
                    outcome.ignore_list.push(IgnoredEntry::Malformed { raw, error_message });
                    continue;
                }
            };

            let rejection = match request.san_cert_cname(AKAMAI_PROVIDER) {
                None => Some("no SAN cert assigned".to_string()),
                Some(cname) if !valid_cnames.contains(cname) => {
                    Some(format!("Not a valid san cert cname: {cname}"))
                }
                Some(cname) => {
                    if self.cert_info.get_enabled_status(cname).await? {
                        updates.push(HostnameUpdate::edge_hostname(
                            &request.domain_name,
                            cname,
                            &self.settings.san_cert_domain_suffix,
                        ));
                        None
                    } else {
                        Some(format!("SAN cert {cname} is disabled"))
                    }
                }
            };

            match rejection {
                Some(message) => {
                    warn!(domain = %request.domain_name, error = %message, "item not eligible for property update");
                    request.error_message = Some(message);
                    outcome.ignore_list.push(IgnoredEntry::Request(request));
                }
                None => outcome.run_list.push(request),
            }
        }

        if !updates.is_empty() {
            let update_info_list = serde_json::to_string(&json!([["add", updates]]))?;
            let mut args = TaskArgs::new();
            args.insert(
                "property_spec".to_string(),
                Value::String(self.settings.property_spec.clone()),
            );
            args.insert("update_type".to_string(), Value::String("hostnames".to_string()));
            args.insert("update_info_list".to_string(), Value::String(update_info_list));
            args.insert(
                "notify_email_list".to_string(),
                json!(self.settings.notify_email_list),
            );
            self.submitter.submit_task(UPDATE_PROPERTY_FLOW, args).await?;
            info!(hostnames = updates.len(), "submitted property hostname update");
        }

        Ok(outcome)
    }

    /// Parsed queue contents; the queue is left unchanged.
    ///
    /// Payloads that do not parse are logged and left out.
    pub async fn get_san_mapping_list(&self) -> Result<Vec<MappingRequest>, CanopyError> {
        let raw = self.queue.traverse_queue(false).await?;
        Ok(parse_all(&raw))
    }

    /// Replace the queue with `new_list`.
    ///
    /// Returns the new contents and the previous entries not present in it.
    pub async fn put_san_mapping_list(
        &self,
        new_list: Vec<MappingRequest>,
    ) -> Result<(Vec<MappingRequest>, Vec<MappingRequest>), CanopyError> {
        let payloads = new_list
            .iter()
            .map(MappingRequest::to_json)
            .collect::<Result<Vec<_>, _>>()?;
        let old = parse_all(&self.queue.swap_queue_data(payloads).await?);
        let deleted = old.into_iter().filter(|o| !new_list.contains(o)).collect();
        Ok((new_list, deleted))
    }
}

fn parse_all(raw: &[String]) -> Vec<MappingRequest> {
    raw.iter()
        .filter_map(|item| match MappingRequest::from_json(item) {
            Ok(request) => Some(request),
            Err(e) => {
                warn!(item = %item, error = %e, "unparsable mapping queue entry");
                None
            }
        })
        .collect()
}

/// Attach `error_message` to a payload that is a JSON object.
fn annotate_raw(raw: &str, message: &str) -> Option<String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(mut map)) => {
            map.insert("error_message".to_string(), Value::String(message.to_string()));
            serde_json::to_string(&Value::Object(map)).ok()
        }
        _ => None,
    }
}
