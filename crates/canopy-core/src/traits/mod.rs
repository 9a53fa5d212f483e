// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions at the seams between the job controller and its backends.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod cert_info;
pub mod queue;
pub mod service;
pub mod storage;
pub mod task;
pub mod tree;

pub use adapter::PluginAdapter;
pub use cert_info::{CertInfoStore, DEFAULT_SAN_CERT_HOSTNAME_LIMIT};
pub use queue::CoordinationQueue;
pub use service::ServiceCatalog;
pub use storage::StorageAdapter;
pub use task::TaskSubmitter;
pub use tree::CoordinationTree;
