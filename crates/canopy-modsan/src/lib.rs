// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mod-SAN provisioning core.
//!
//! Domains waiting to be mapped onto a shared SAN certificate sit in a
//! durable [`MappingQueue`]. The [`BackgroundJobController`] periodically
//! drains it, either to batch hostname remaps into one property update or
//! to hand activated domains to the certificate status flow. Operators
//! inspect and replace the queue through [`SanRetryAdmin`].

pub mod admin;
pub mod controller;
pub mod queue;
pub mod scheduler;

pub use admin::{ListUpdate, SanRetryAdmin};
pub use controller::{BackgroundJobController, IgnoredEntry, JobOutcome, LostItem};
pub use queue::MappingQueue;
pub use scheduler::JobScheduler;
