// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hierarchical key-value tree offered by the coordination backend.

use async_trait::async_trait;

use crate::error::CanopyError;

/// A ZooKeeper-style tree of `/`-separated paths holding byte values.
#[async_trait]
pub trait CoordinationTree: Send + Sync {
    /// Create `path` and any missing ancestors with empty values.
    async fn ensure_path(&self, path: &str) -> Result<(), CanopyError>;

    /// Value stored at `path`, or `None` when the node does not exist.
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, CanopyError>;

    /// Store `value` at `path`, creating the node and its ancestors if needed.
    async fn set(&self, path: &str, value: Vec<u8>) -> Result<(), CanopyError>;

    /// Names of the direct children of `path`, sorted.
    async fn get_children(&self, path: &str) -> Result<Vec<String>, CanopyError>;

    /// Remove `path` and all of its descendants.
    async fn delete_recursive(&self, path: &str) -> Result<(), CanopyError>;
}
