// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Canopy control plane.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-writer concurrency model via `tokio-rusqlite`. On top of it sit the
//! coordination primitives (a locking FIFO queue and a hierarchical key
//! tree) and the two certificate info backends.

pub mod adapter;
pub mod cert_info;
pub mod coordination;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use cert_info::{RecordCertInfoStore, TreeCertInfoStore};
pub use coordination::{SqliteCoordinationQueue, SqliteCoordinationTree};
pub use database::Database;
