// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed coordination primitives.
//!
//! Processes that share one database file share these queues and trees.

use async_trait::async_trait;

use canopy_core::{CanopyError, CoordinationQueue, CoordinationTree};

use crate::database::Database;
use crate::queries;

/// Locking FIFO queue rooted at one coordination path.
#[derive(Debug, Clone)]
pub struct SqliteCoordinationQueue {
    db: Database,
    path: String,
}

impl SqliteCoordinationQueue {
    pub fn new(db: Database, path: impl Into<String>) -> Self {
        Self {
            db,
            path: path.into(),
        }
    }

    /// Coordination path this queue is rooted at.
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl CoordinationQueue for SqliteCoordinationQueue {
    async fn put(&self, item: String) -> Result<(), CanopyError> {
        queries::queue::put(&self.db, &self.path, &item).await
    }

    async fn put_all(&self, items: Vec<String>) -> Result<(), CanopyError> {
        queries::queue::put_all(&self.db, &self.path, items).await
    }

    async fn get(&self) -> Result<Option<String>, CanopyError> {
        queries::queue::peek(&self.db, &self.path).await
    }

    async fn consume(&self) -> Result<Option<String>, CanopyError> {
        queries::queue::consume(&self.db, &self.path).await
    }

    async fn len(&self) -> Result<usize, CanopyError> {
        queries::queue::len(&self.db, &self.path).await
    }
}

/// Key tree stored in the `coordination_tree` table.
#[derive(Debug, Clone)]
pub struct SqliteCoordinationTree {
    db: Database,
}

impl SqliteCoordinationTree {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CoordinationTree for SqliteCoordinationTree {
    async fn ensure_path(&self, path: &str) -> Result<(), CanopyError> {
        queries::tree::ensure_path(&self.db, path).await
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, CanopyError> {
        queries::tree::get(&self.db, path).await
    }

    async fn set(&self, path: &str, value: Vec<u8>) -> Result<(), CanopyError> {
        queries::tree::set(&self.db, path, value).await
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>, CanopyError> {
        queries::tree::get_children(&self.db, path).await
    }

    async fn delete_recursive(&self, path: &str) -> Result<(), CanopyError> {
        queries::tree::delete_recursive(&self.db, path).await
    }
}
