// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Canopy integration tests.
//!
//! Provides in-memory doubles for the coordination queue, certificate info
//! store, task submitter and service catalog, plus a [`TestHarness`] that
//! wires real SQLite-backed components over a temp database.
//!
//! # Components
//!
//! - [`MemoryCoordinationQueue`] - FIFO queue with injectable backend failures
//! - [`MemoryCertInfoStore`] - certificate info table held in memory
//! - [`RecordingSubmitter`] - records submitted flows, can be told to fail
//! - [`StaticServiceCatalog`] - fixed set of known `(project, domain)` pairs

pub mod harness;
pub mod mock_cert_info;
pub mod mock_queue;
pub mod mock_services;
pub mod mock_submitter;

pub use harness::TestHarness;
pub use mock_cert_info::MemoryCertInfoStore;
pub use mock_queue::MemoryCoordinationQueue;
pub use mock_services::StaticServiceCatalog;
pub use mock_submitter::RecordingSubmitter;

use std::sync::atomic::{AtomicUsize, Ordering};

/// Take one unit from a failure budget, returning whether it was available.
pub(crate) fn take_failure(budget: &AtomicUsize) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}
