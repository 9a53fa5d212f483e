// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use canopy_config::model::{CertInfoBackend, CertInfoConfig, StorageConfig};
use canopy_core::{
    AdapterType, CanopyError, CertInfoStore, CoordinationQueue, HealthStatus, PluginAdapter,
    StorageAdapter,
};

use crate::cert_info::{RecordCertInfoStore, TreeCertInfoStore};
use crate::coordination::{SqliteCoordinationQueue, SqliteCoordinationTree};
use crate::database::Database;

/// SQLite-backed storage adapter.
///
/// Owns the [`Database`] handle and hands out the queue, tree and cert info
/// backends built on it. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`] is called.
    ///
    /// [`initialize`]: StorageAdapter::initialize
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns the underlying Database, or an error if not initialized.
    pub fn database(&self) -> Result<&Database, CanopyError> {
        self.db.get().ok_or_else(|| CanopyError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Coordination queue rooted at `path`.
    pub fn coordination_queue(&self, path: &str) -> Result<Arc<dyn CoordinationQueue>, CanopyError> {
        Ok(Arc::new(SqliteCoordinationQueue::new(
            self.database()?.clone(),
            path,
        )))
    }

    /// Certificate info store for the configured backend.
    pub fn cert_info_store(
        &self,
        config: &CertInfoConfig,
    ) -> Result<Arc<dyn CertInfoStore>, CanopyError> {
        let db = self.database()?.clone();
        let store: Arc<dyn CertInfoStore> = match config.backend {
            CertInfoBackend::Record => Arc::new(RecordCertInfoStore::new(
                db,
                &config.provider_name,
                config.default_hostname_limit,
            )),
            CertInfoBackend::Tree => Arc::new(TreeCertInfoStore::new(
                Arc::new(SqliteCoordinationTree::new(db)),
                config.default_hostname_limit,
            )),
        };
        Ok(store)
    }

    async fn checkpoint(&self, db: &Database) -> Result<(), CanopyError> {
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, CanopyError> {
        let db = self.database()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CanopyError> {
        if let Some(db) = self.db.get() {
            self.checkpoint(db).await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), CanopyError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| CanopyError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), CanopyError> {
        self.checkpoint(self.database()?).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
        assert!(storage.initialize().await.is_err(), "second initialize should fail");
    }

    #[tokio::test]
    async fn health_check_requires_initialize() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("health.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert!(storage.health_check().await.is_err());
        assert!(storage.coordination_queue("/q").is_err());

        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn backends_share_the_database() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("shared.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();

        let queue = storage.coordination_queue("/mod_san_queue").unwrap();
        queue.put("payload".into()).await.unwrap();
        let again = storage.coordination_queue("/mod_san_queue").unwrap();
        assert_eq!(again.len().await.unwrap(), 1);

        for backend in [CertInfoBackend::Record, CertInfoBackend::Tree] {
            let config = CertInfoConfig {
                backend,
                ..CertInfoConfig::default()
            };
            let store = storage.cert_info_store(&config).unwrap();
            assert_eq!(store.get_san_cert_hostname_limit().await.unwrap(), 80);
        }

        storage.shutdown().await.unwrap();
        storage.close().await.unwrap();
    }
}
