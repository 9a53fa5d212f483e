// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Certificate info store trait.

use async_trait::async_trait;

use crate::error::CanopyError;
use crate::types::{CertificateRecord, SanInfo};

/// Hostname capacity of a SAN certificate when no setting is stored.
pub const DEFAULT_SAN_CERT_HOSTNAME_LIMIT: u32 = 80;

/// Durable per-certificate provisioning state plus global SAN settings.
///
/// Updates are read-modify-write without version checks: two writers
/// touching the same hostname concurrently can lose one of the updates.
#[async_trait]
pub trait CertInfoStore: Send + Sync {
    /// Full record for `hostname`.
    ///
    /// Fails with [`CanopyError::RecordNotFound`] when nothing is stored and
    /// [`CanopyError::InvalidRecord`] when required fields are null.
    async fn get_cert_info(&self, hostname: &str) -> Result<CertificateRecord, CanopyError>;

    /// Last provisioning-system id recorded for `hostname`.
    async fn get_cert_last_spsid(&self, hostname: &str) -> Result<Option<i64>, CanopyError>;

    /// Record the latest provisioning ids, leaving all other fields untouched.
    async fn save_cert_last_ids(
        &self,
        hostname: &str,
        sps_id: i64,
        job_id: Option<i64>,
    ) -> Result<(), CanopyError>;

    /// Whether new domains may be assigned to `hostname`; `true` when unset.
    async fn get_enabled_status(&self, hostname: &str) -> Result<bool, CanopyError>;

    /// Enable or disable assignment of new domains to `hostname`.
    async fn set_enabled_status(&self, hostname: &str, enabled: bool) -> Result<(), CanopyError>;

    /// Maximum hostnames per SAN certificate, seeding the default on first read.
    async fn get_san_cert_hostname_limit(&self) -> Result<u32, CanopyError>;

    /// Replace the hostname capacity setting.
    async fn set_san_cert_hostname_limit(&self, limit: u32) -> Result<(), CanopyError>;

    /// Every certificate hostname with stored info, sorted.
    async fn list_all_san_cert_names(&self) -> Result<Vec<String>, CanopyError>;

    /// The whole info table.
    async fn get_san_info(&self) -> Result<SanInfo, CanopyError>;

    /// Overwrite the whole info table.
    async fn update_san_info(&self, info: SanInfo) -> Result<(), CanopyError>;
}
