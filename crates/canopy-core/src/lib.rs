// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Canopy SAN certificate control plane.
//!
//! This crate provides the trait definitions, error type, and domain types
//! shared by the mapping queue, the certificate info store, the task runtime
//! and the background job controller.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CanopyError;
pub use types::{
    AKAMAI_PROVIDER, AdapterType, CHECK_CERT_STATUS_AND_UPDATE_FLOW, CertType, CertificateRecord,
    HealthStatus, HostnameUpdate, JobType, MappingRequest, SanInfo, SanRetryEntry, TaskArgs,
    UPDATE_PROPERTY_FLOW,
};

pub use traits::{
    CertInfoStore, CoordinationQueue, CoordinationTree, PluginAdapter, ServiceCatalog,
    StorageAdapter, TaskSubmitter, DEFAULT_SAN_CERT_HOSTNAME_LIMIT,
};
