// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory coordination queue for deterministic testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use canopy_core::{CanopyError, CoordinationQueue};

use crate::take_failure;

/// FIFO queue whose writes and consumes can be made to fail on demand.
///
/// Each `put`/`put_all` call uses up one unit of the put failure budget and
/// each `consume` one unit of the consume budget. A failed call changes
/// nothing.
#[derive(Default)]
pub struct MemoryCoordinationQueue {
    items: Mutex<VecDeque<String>>,
    put_failures: AtomicUsize,
    consume_failures: AtomicUsize,
    drains: AtomicUsize,
}

impl MemoryCoordinationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue pre-loaded with `items`, head first.
    pub fn with_items<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queue = Self::new();
        queue.lock().extend(items.into_iter().map(Into::into));
        queue
    }

    /// Fail the next `n` put calls.
    pub fn fail_puts(&self, n: usize) {
        self.put_failures.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` consume calls.
    pub fn fail_consumes(&self, n: usize) {
        self.consume_failures.store(n, Ordering::SeqCst);
    }

    /// How many `consume` calls have come back empty.
    pub fn drains(&self) -> usize {
        self.drains.load(Ordering::SeqCst)
    }

    /// Current contents, head first.
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<String>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn unavailable(op: &str) -> CanopyError {
    CanopyError::CoordinationUnavailable {
        source: format!("injected {op} failure").into(),
    }
}

#[async_trait]
impl CoordinationQueue for MemoryCoordinationQueue {
    async fn put(&self, item: String) -> Result<(), CanopyError> {
        if take_failure(&self.put_failures) {
            return Err(unavailable("put"));
        }
        self.lock().push_back(item);
        Ok(())
    }

    async fn put_all(&self, items: Vec<String>) -> Result<(), CanopyError> {
        if take_failure(&self.put_failures) {
            return Err(unavailable("put"));
        }
        self.lock().extend(items);
        Ok(())
    }

    async fn get(&self) -> Result<Option<String>, CanopyError> {
        Ok(self.lock().front().cloned())
    }

    async fn consume(&self) -> Result<Option<String>, CanopyError> {
        if take_failure(&self.consume_failures) {
            return Err(unavailable("consume"));
        }
        let head = self.lock().pop_front();
        if head.is_none() {
            self.drains.fetch_add(1, Ordering::SeqCst);
        }
        Ok(head)
    }

    async fn len(&self) -> Result<usize, CanopyError> {
        Ok(self.lock().len())
    }
}
