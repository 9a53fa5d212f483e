// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` opens SQLite storage in a temp directory and exposes the
//! real mapping queue backend, certificate info store and job board built
//! on it, next to a [`RecordingSubmitter`] for assertions on submissions.

use std::sync::Arc;

use canopy_config::model::{CanopyConfig, CertInfoBackend, StorageConfig};
use canopy_core::{
    CanopyError, CertInfoStore, CertificateRecord, CoordinationQueue, SanInfo, StorageAdapter,
};
use canopy_storage::SqliteStorage;
use canopy_taskflow::TaskflowSubmitter;

use crate::mock_submitter::RecordingSubmitter;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    backend: CertInfoBackend,
    san_cert_cnames: Vec<String>,
    records: Vec<CertificateRecord>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            backend: CertInfoBackend::Record,
            san_cert_cnames: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Store certificate info in the given backend.
    pub fn with_cert_backend(mut self, backend: CertInfoBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Configure the valid SAN cert CNAMEs.
    pub fn with_san_cert_cnames<I, S>(mut self, cnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.san_cert_cnames = cnames.into_iter().map(Into::into).collect();
        self
    }

    /// Seed a certificate record before the harness is returned.
    pub fn with_cert_record(mut self, record: CertificateRecord) -> Self {
        self.records.push(record);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, CanopyError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| CanopyError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = CanopyConfig::default();
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };
        config.cert_info.backend = self.backend;
        config.mod_san.san_cert_cnames = self.san_cert_cnames;

        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await?;

        let queue = storage.coordination_queue(&config.queue.mod_san_queue_path)?;
        let cert_info = storage.cert_info_store(&config.cert_info)?;
        if !self.records.is_empty() {
            let info: SanInfo = self
                .records
                .into_iter()
                .map(|r| (r.cname_hostname.clone(), r))
                .collect();
            cert_info.update_san_info(info).await?;
        }
        let taskflow = Arc::new(TaskflowSubmitter::from_config(
            storage.database()?.clone(),
            &config.taskflow,
        ));

        Ok(TestHarness {
            storage,
            queue,
            cert_info,
            submitter: Arc::new(RecordingSubmitter::new()),
            taskflow,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment over temp storage.
pub struct TestHarness {
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    /// Coordination queue at the configured mod-SAN queue path.
    pub queue: Arc<dyn CoordinationQueue>,
    /// Certificate info store for the configured backend.
    pub cert_info: Arc<dyn CertInfoStore>,
    /// Submitter double that records flows instead of posting them.
    pub submitter: Arc<RecordingSubmitter>,
    /// Real submitter posting to the configured job board.
    pub taskflow: Arc<TaskflowSubmitter>,
    /// Canopy configuration pointing at the temp database.
    pub config: CanopyConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Raw payloads currently in the mapping queue, head first.
    ///
    /// Leaves the queue unchanged.
    pub async fn queue_contents(&self) -> Result<Vec<String>, CanopyError> {
        let mut items = Vec::new();
        while let Some(item) = self.queue.consume().await? {
            items.push(item);
        }
        self.queue.put_all(items.clone()).await?;
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::JobType;

    #[tokio::test]
    async fn harness_wires_shared_database() {
        let harness = TestHarness::builder()
            .with_cert_backend(CertInfoBackend::Tree)
            .with_san_cert_cnames(["san1.example.net"])
            .with_cert_record(CertificateRecord::new("san1.example.net"))
            .build()
            .await
            .unwrap();

        harness.queue.put("x".into()).await.unwrap();
        assert_eq!(harness.queue_contents().await.unwrap(), vec!["x"]);
        assert_eq!(harness.queue.len().await.unwrap(), 1);

        assert_eq!(
            harness.cert_info.list_all_san_cert_names().await.unwrap(),
            vec!["san1.example.net"]
        );
        assert_eq!(harness.config.mod_san.san_cert_cnames, vec!["san1.example.net"]);
        assert!(harness.config.scheduler.jobs.contains(&JobType::CheckAndUpdateCertStatus.to_string()));
    }
}
