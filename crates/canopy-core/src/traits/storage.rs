// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;

use crate::error::CanopyError;
use crate::traits::adapter::PluginAdapter;

/// Adapter for storage and persistence backends.
///
/// Storage adapters own the database connection that the coordination
/// queue, the certificate info store and the task runtime share.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), CanopyError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), CanopyError>;
}
