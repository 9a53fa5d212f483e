// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable mapping queue over a coordination queue.
//!
//! None of the multi-item operations are atomic. A producer enqueueing
//! while a traverse is in flight may see its item reordered behind the
//! re-appended snapshot, or dropped by a concurrent replace.

use std::sync::Arc;

use tracing::debug;

use canopy_core::{CanopyError, CoordinationQueue, MappingRequest};

/// FIFO queue of serialized [`MappingRequest`] payloads.
#[derive(Clone)]
pub struct MappingQueue {
    backend: Arc<dyn CoordinationQueue>,
}

impl MappingQueue {
    pub fn new(backend: Arc<dyn CoordinationQueue>) -> Self {
        Self { backend }
    }

    /// Append one payload. Duplicates are accepted.
    pub async fn enqueue(&self, item: String) -> Result<(), CanopyError> {
        self.backend.put(item).await
    }

    /// Serialize and append a request.
    pub async fn enqueue_request(&self, request: &MappingRequest) -> Result<(), CanopyError> {
        self.enqueue(request.to_json()?).await
    }

    /// Drain every item head first.
    ///
    /// With `consume == false` the snapshot is appended back in order, so the
    /// queue ends up holding what it held before. With `consume == true` the
    /// caller owns the items and the queue is left empty.
    pub async fn traverse_queue(&self, consume: bool) -> Result<Vec<String>, CanopyError> {
        let mut items = Vec::new();
        while let Some(item) = self.backend.consume().await? {
            items.push(item);
        }
        if !consume && !items.is_empty() {
            self.backend.put_all(items.clone()).await?;
        }
        debug!(count = items.len(), consume, "traversed mapping queue");
        Ok(items)
    }

    /// Replace the whole queue with `items`, returning them.
    pub async fn put_queue_data(&self, items: Vec<String>) -> Result<Vec<String>, CanopyError> {
        self.swap_queue_data(items.clone()).await?;
        Ok(items)
    }

    /// Replace the whole queue with `items`, returning what it held before.
    pub async fn swap_queue_data(&self, items: Vec<String>) -> Result<Vec<String>, CanopyError> {
        let previous = self.traverse_queue(true).await?;
        let current = items.len();
        self.backend.put_all(items).await?;
        debug!(
            previous = previous.len(),
            current,
            "replaced mapping queue"
        );
        Ok(previous)
    }

    /// Remove and return the head with `consume`, otherwise peek at it.
    pub async fn dequeue(&self, consume: bool) -> Result<Option<String>, CanopyError> {
        if consume {
            self.backend.consume().await
        } else {
            self.backend.get().await
        }
    }

    pub async fn len(&self) -> Result<usize, CanopyError> {
        self.backend.len().await
    }

    pub async fn is_empty(&self) -> Result<bool, CanopyError> {
        self.backend.is_empty().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_test_utils::MemoryCoordinationQueue;
    use proptest::prelude::*;

    fn queue() -> (MappingQueue, Arc<MemoryCoordinationQueue>) {
        let backend = Arc::new(MemoryCoordinationQueue::new());
        (MappingQueue::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn traverse_without_consume_preserves_contents() {
        let (q, backend) = queue();
        for item in ["a", "b", "c"] {
            q.enqueue(item.to_string()).await.unwrap();
        }
        assert_eq!(q.traverse_queue(false).await.unwrap(), vec!["a", "b", "c"]);
        assert_eq!(backend.snapshot(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn traverse_with_consume_empties_queue() {
        let (q, _) = queue();
        q.enqueue("a".into()).await.unwrap();
        assert_eq!(q.traverse_queue(true).await.unwrap(), vec!["a"]);
        assert!(q.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn swap_returns_previous_contents_in_one_drain() {
        let (q, backend) = queue();
        q.enqueue("a".into()).await.unwrap();
        q.enqueue("b".into()).await.unwrap();
        let previous = q.swap_queue_data(vec!["c".into()]).await.unwrap();
        assert_eq!(previous, vec!["a", "b"]);
        assert_eq!(backend.snapshot(), vec!["c"]);
        assert_eq!(backend.drains(), 1);
    }

    #[tokio::test]
    async fn dequeue_peek_and_consume() {
        let (q, _) = queue();
        assert_eq!(q.dequeue(true).await.unwrap(), None);
        q.enqueue("a".into()).await.unwrap();
        q.enqueue("b".into()).await.unwrap();
        assert_eq!(q.dequeue(false).await.unwrap().as_deref(), Some("a"));
        assert_eq!(q.len().await.unwrap(), 2);
        assert_eq!(q.dequeue(true).await.unwrap().as_deref(), Some("a"));
        assert_eq!(q.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unreachable_backend_surfaces_error() {
        let (q, backend) = queue();
        backend.fail_puts(1);
        let err = q.enqueue("a".into()).await.unwrap_err();
        assert!(matches!(err, CanopyError::CoordinationUnavailable { .. }));
        q.enqueue("a".into()).await.unwrap();
        assert_eq!(q.len().await.unwrap(), 1);
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread().build().unwrap()
    }

    proptest! {
        #[test]
        fn enqueue_order_survives_traverse(items in prop::collection::vec("[a-z0-9]{1,8}", 0..20)) {
            let rt = runtime();
            let (q, backend) = queue();
            let seen = rt.block_on(async {
                for item in &items {
                    q.enqueue(item.clone()).await.unwrap();
                }
                q.traverse_queue(false).await.unwrap()
            });
            prop_assert_eq!(&seen, &items);
            prop_assert_eq!(backend.snapshot(), items);
        }

        #[test]
        fn replace_is_total(
            before in prop::collection::vec("[a-z]{1,4}", 0..10),
            after in prop::collection::vec("[a-z]{1,4}", 0..10),
        ) {
            let rt = runtime();
            let (q, _) = queue();
            let seen = rt.block_on(async {
                for item in &before {
                    q.enqueue(item.clone()).await.unwrap();
                }
                let returned = q.put_queue_data(after.clone()).await.unwrap();
                assert_eq!(returned, after);
                q.traverse_queue(false).await.unwrap()
            });
            prop_assert_eq!(seen, after);
        }
    }
}
