// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the queue, certificate store, task runtime and
//! background job controller.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// Provider key under which Akamai-specific certificate details are stored.
pub const AKAMAI_PROVIDER: &str = "Akamai";

/// Workflow that polls the provisioning API and records the outcome.
pub const CHECK_CERT_STATUS_AND_UPDATE_FLOW: &str = "check_cert_status_and_update_flow";

/// Workflow that pushes a batch of hostname changes to the CDN property.
pub const UPDATE_PROPERTY_FLOW: &str = "update_property_flow";

/// Keyword arguments handed to a workflow.
pub type TaskArgs = Map<String, Value>;

/// Full certificate info table, keyed by certificate CNAME hostname.
pub type SanInfo = BTreeMap<String, CertificateRecord>;

/// Health status reported by backend health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Backend is fully operational.
    Healthy,
    /// Backend is operational but experiencing issues.
    Degraded(String),
    /// Backend is not operational.
    Unhealthy(String),
}

/// Identifies the kind of backend behind an adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Queue,
    CertInfo,
    TaskRuntime,
}

/// The kind of certificate a domain is mapped onto.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CertType {
    San,
    Sni,
    Custom,
    Shared,
}

/// The two stages of the mod-SAN pipeline the background job controller runs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum JobType {
    /// Destructive drain: submit activated requests, requeue the rest.
    #[strum(serialize = "akamai_check_and_update_cert_status")]
    #[serde(rename = "akamai_check_and_update_cert_status")]
    CheckAndUpdateCertStatus,
    /// Non-destructive scan: batch hostname remaps into one property update.
    #[strum(serialize = "akamai_update_papi_property_for_mod_san")]
    #[serde(rename = "akamai_update_papi_property_for_mod_san")]
    UpdatePapiPropertyForModSan,
}

/// Provider-specific extra info attached to a certificate assignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtraInfo {
    /// CNAME of the SAN certificate the domain is assigned to.
    #[serde(rename = "san cert", default, skip_serializing_if = "Option::is_none")]
    pub san_cert: Option<String>,

    /// Provisioning-system tracking id for the pending change.
    #[serde(rename = "akamai_spsId", default, skip_serializing_if = "Option::is_none")]
    pub akamai_sps_id: Option<i64>,

    /// Any other provider keys, preserved verbatim.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Certificate details for one provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderCertDetail {
    #[serde(default)]
    pub extra_info: ExtraInfo,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// One pending domain-to-certificate assignment held in the mapping queue.
///
/// Optional keys keep explicit presence: `property_activated` and
/// `validate_service` are `None` when the producer omitted them, and the
/// accessors below apply the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRequest {
    pub domain_name: String,
    pub project_id: String,
    pub flavor_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_type: Option<CertType>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cert_details: BTreeMap<String, ProviderCertDetail>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_activated: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate_service: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Producer keys this type does not model, carried through requeues.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl MappingRequest {
    /// Create a request with only the identifying fields set.
    pub fn new(
        domain_name: impl Into<String>,
        project_id: impl Into<String>,
        flavor_id: impl Into<String>,
    ) -> Self {
        Self {
            domain_name: domain_name.into(),
            project_id: project_id.into(),
            flavor_id: flavor_id.into(),
            cert_type: None,
            cert_details: BTreeMap::new(),
            property_activated: None,
            validate_service: None,
            error_message: None,
            other: Map::new(),
        }
    }

    /// Assign the request to a SAN certificate under the given provider.
    pub fn with_san_cert(mut self, provider: &str, cname: impl Into<String>) -> Self {
        self.cert_type = Some(CertType::San);
        self.cert_details
            .entry(provider.to_string())
            .or_default()
            .extra_info
            .san_cert = Some(cname.into());
        self
    }

    /// Parse a queue payload.
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// Serialize into a queue payload.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Whether the CDN property change for this domain has been activated.
    pub fn is_property_activated(&self) -> bool {
        self.property_activated.unwrap_or(false)
    }

    /// Whether the owning service must exist; defaults to `true`.
    pub fn should_validate_service(&self) -> bool {
        self.validate_service.unwrap_or(true)
    }

    /// The SAN certificate CNAME assigned under `provider`, if any.
    pub fn san_cert_cname(&self, provider: &str) -> Option<&str> {
        self.cert_details
            .get(provider)
            .and_then(|d| d.extra_info.san_cert.as_deref())
    }

    /// Project this request onto the normalized san-retry shape.
    ///
    /// This is the only place the `validate_service` default is applied.
    pub fn to_retry_entry(&self) -> SanRetryEntry {
        SanRetryEntry {
            project_id: self.project_id.clone(),
            domain_name: self.domain_name.clone(),
            flavor_id: self.flavor_id.clone(),
            validate_service: self.should_validate_service(),
        }
    }
}

/// Normalized entry of the san-retry admin list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SanRetryEntry {
    pub project_id: String,
    pub domain_name: String,
    pub flavor_id: String,
    pub validate_service: bool,
}

impl From<SanRetryEntry> for MappingRequest {
    fn from(entry: SanRetryEntry) -> Self {
        let mut req = MappingRequest::new(entry.domain_name, entry.project_id, entry.flavor_id);
        req.validate_service = Some(entry.validate_service);
        req
    }
}

fn default_create_type() -> String {
    "modSan".to_string()
}

/// Provisioning state of one SAN certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    #[serde(rename = "cnameHostname", default)]
    pub cname_hostname: String,

    #[serde(rename = "jobId", default)]
    pub job_id: Option<i64>,

    #[serde(default)]
    pub issuer: Option<String>,

    #[serde(rename = "ipVersion", default)]
    pub ip_version: Option<String>,

    #[serde(rename = "slot-deployment.klass", alias = "slot_deployment_klass", default)]
    pub slot_deployment_klass: Option<String>,

    #[serde(rename = "spsId", default)]
    pub sps_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(rename = "createType", default = "default_create_type")]
    pub create_type: String,
}

impl CertificateRecord {
    /// An empty record for `hostname`.
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            cname_hostname: hostname.into(),
            job_id: None,
            issuer: None,
            ip_version: None,
            slot_deployment_klass: None,
            sps_id: None,
            enabled: None,
            create_type: default_create_type(),
        }
    }

    /// Names of the fields provisioning requires but this record lacks.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.job_id.is_none() {
            missing.push("jobId");
        }
        if self.issuer.is_none() {
            missing.push("issuer");
        }
        if self.ip_version.is_none() {
            missing.push("ipVersion");
        }
        if self.slot_deployment_klass.is_none() {
            missing.push("slot-deployment.klass");
        }
        missing
    }

    /// Enabled unless explicitly disabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// One hostname remap instruction inside a property update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostnameUpdate {
    pub cname_from: String,
    pub cname_to: String,
    pub cname_type: String,
}

impl HostnameUpdate {
    /// Point `domain` at the edge hostname of `san_cert` under `suffix`.
    pub fn edge_hostname(domain: &str, san_cert: &str, suffix: &str) -> Self {
        Self {
            cname_from: domain.to_string(),
            cname_to: format!("{san_cert}.{suffix}"),
            cname_type: "EDGE_HOSTNAME".to_string(),
        }
    }
}
