// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task runtime for the Canopy control plane.
//!
//! Submitting a flow writes a logbook and flow detail, then posts a job to a
//! named board. Conductors claim jobs for the workflows they have registered,
//! run them, and record the outcome. A claim held by a worker that stopped
//! responding expires and the job becomes claimable again, so every posted
//! job runs at least once.

pub mod board;
pub mod conductor;
pub mod persistence;
pub mod submitter;
pub mod workflow;

pub use board::{ClaimedJob, Job, JobBoard, JobState};
pub use conductor::Conductor;
pub use persistence::FlowRecord;
pub use submitter::TaskflowSubmitter;
pub use workflow::{Workflow, WorkflowRegistry};

use canopy_core::CanopyError;

pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> CanopyError {
    CanopyError::Storage {
        source: Box::new(e),
    }
}
