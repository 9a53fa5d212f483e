// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Locking-queue primitive offered by the coordination backend.

use async_trait::async_trait;

use crate::error::CanopyError;

/// A shared FIFO queue of opaque payloads living in a coordination service.
///
/// Every call is a fallible round trip to the backend and fails with
/// [`CanopyError::CoordinationUnavailable`] when the backend is unreachable.
/// Only single-item operations are atomic: [`consume`](Self::consume) never
/// hands the same item to two callers, but nothing spans multiple calls.
#[async_trait]
pub trait CoordinationQueue: Send + Sync {
    /// Append one payload at the tail.
    async fn put(&self, item: String) -> Result<(), CanopyError>;

    /// Append payloads at the tail, preserving their order.
    async fn put_all(&self, items: Vec<String>) -> Result<(), CanopyError>;

    /// Return the head without removing it.
    async fn get(&self) -> Result<Option<String>, CanopyError>;

    /// Remove and return the head.
    async fn consume(&self) -> Result<Option<String>, CanopyError>;

    /// Number of payloads currently queued.
    async fn len(&self) -> Result<usize, CanopyError>;

    /// Whether the queue currently holds no payloads.
    async fn is_empty(&self) -> Result<bool, CanopyError> {
        Ok(self.len().await? == 0)
    }
}
