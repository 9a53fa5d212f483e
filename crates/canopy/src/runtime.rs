// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Component wiring shared by every subcommand.

use std::sync::Arc;

use tracing::debug;

use canopy_config::CanopyConfig;
use canopy_core::{CanopyError, CertInfoStore, PluginAdapter, StorageAdapter};
use canopy_modsan::{BackgroundJobController, MappingQueue};
use canopy_storage::SqliteStorage;
use canopy_taskflow::TaskflowSubmitter;

/// Storage plus the components built on it.
pub(crate) struct Runtime {
    storage: Arc<SqliteStorage>,
    pub(crate) cert_info: Arc<dyn CertInfoStore>,
    pub(crate) controller: Arc<BackgroundJobController>,
}

impl Runtime {
    /// Open the configured database and wire the controller to it.
    pub(crate) async fn open(config: &CanopyConfig) -> Result<Self, CanopyError> {
        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await?;

        let queue = MappingQueue::new(storage.coordination_queue(&config.queue.mod_san_queue_path)?);
        let cert_info = storage.cert_info_store(&config.cert_info)?;
        let submitter = Arc::new(TaskflowSubmitter::from_config(
            storage.database()?.clone(),
            &config.taskflow,
        ));
        let controller = Arc::new(BackgroundJobController::new(
            queue,
            cert_info.clone(),
            submitter,
            config.mod_san.clone(),
        ));
        debug!(
            backend = ?config.cert_info.backend,
            queue = %config.queue.mod_san_queue_path,
            board = %config.taskflow.board_name,
            "runtime wired"
        );

        Ok(Self {
            storage,
            cert_info,
            controller,
        })
    }

    /// Checkpoint the WAL so the next process starts from a compact file.
    pub(crate) async fn shutdown(&self) -> Result<(), CanopyError> {
        self.storage.shutdown().await
    }
}
