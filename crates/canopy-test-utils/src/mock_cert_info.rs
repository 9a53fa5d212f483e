// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory certificate info store.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use canopy_core::{
    CanopyError, CertInfoStore, CertificateRecord, DEFAULT_SAN_CERT_HOSTNAME_LIMIT, SanInfo,
};

#[derive(Default)]
struct State {
    info: SanInfo,
    limit: Option<u32>,
}

/// Certificate info held in a map, with the same lookup rules as the
/// SQLite-backed stores.
#[derive(Default)]
pub struct MemoryCertInfoStore {
    state: Mutex<State>,
}

impl MemoryCertInfoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record keyed by its `cname_hostname`.
    pub fn insert(&self, record: CertificateRecord) {
        self.lock().info.insert(record.cname_hostname.clone(), record);
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(hostname: &str) -> CanopyError {
    CanopyError::RecordNotFound {
        hostname: hostname.to_string(),
    }
}

#[async_trait]
impl CertInfoStore for MemoryCertInfoStore {
    async fn get_cert_info(&self, hostname: &str) -> Result<CertificateRecord, CanopyError> {
        let record = self
            .lock()
            .info
            .get(hostname)
            .cloned()
            .ok_or_else(|| not_found(hostname))?;
        let missing = record.missing_fields();
        if missing.is_empty() {
            Ok(record)
        } else {
            Err(CanopyError::InvalidRecord {
                hostname: hostname.to_string(),
                missing,
            })
        }
    }

    async fn get_cert_last_spsid(&self, hostname: &str) -> Result<Option<i64>, CanopyError> {
        self.lock()
            .info
            .get(hostname)
            .map(|r| r.sps_id)
            .ok_or_else(|| not_found(hostname))
    }

    async fn save_cert_last_ids(
        &self,
        hostname: &str,
        sps_id: i64,
        job_id: Option<i64>,
    ) -> Result<(), CanopyError> {
        let mut state = self.lock();
        let record = state.info.get_mut(hostname).ok_or_else(|| not_found(hostname))?;
        record.sps_id = Some(sps_id);
        if job_id.is_some() {
            record.job_id = job_id;
        }
        Ok(())
    }

    async fn get_enabled_status(&self, hostname: &str) -> Result<bool, CanopyError> {
        Ok(self
            .lock()
            .info
            .get(hostname)
            .is_none_or(CertificateRecord::is_enabled))
    }

    async fn set_enabled_status(&self, hostname: &str, enabled: bool) -> Result<(), CanopyError> {
        let mut state = self.lock();
        let record = state.info.get_mut(hostname).ok_or_else(|| not_found(hostname))?;
        record.enabled = Some(enabled);
        Ok(())
    }

    async fn get_san_cert_hostname_limit(&self) -> Result<u32, CanopyError> {
        Ok(*self
            .lock()
            .limit
            .get_or_insert(DEFAULT_SAN_CERT_HOSTNAME_LIMIT))
    }

    async fn set_san_cert_hostname_limit(&self, limit: u32) -> Result<(), CanopyError> {
        self.lock().limit = Some(limit);
        Ok(())
    }

    async fn list_all_san_cert_names(&self) -> Result<Vec<String>, CanopyError> {
        Ok(self.lock().info.keys().cloned().collect())
    }

    async fn get_san_info(&self) -> Result<SanInfo, CanopyError> {
        Ok(self.lock().info.clone())
    }

    async fn update_san_info(&self, info: SanInfo) -> Result<(), CanopyError> {
        self.lock().info = info;
        Ok(())
    }
}
