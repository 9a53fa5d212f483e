// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task submitter double that records every submission.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use canopy_core::{CanopyError, TaskArgs, TaskSubmitter};

use crate::take_failure;

/// Records `(flow_name, args)` for each successful submission.
#[derive(Default)]
pub struct RecordingSubmitter {
    calls: Mutex<Vec<(String, TaskArgs)>>,
    failures: AtomicUsize,
}

impl RecordingSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` submissions with `SubmissionFailed`.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Successful submissions so far, in order.
    pub fn calls(&self) -> Vec<(String, TaskArgs)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl TaskSubmitter for RecordingSubmitter {
    async fn submit_task(&self, flow_name: &str, args: TaskArgs) -> Result<(), CanopyError> {
        if take_failure(&self.failures) {
            return Err(CanopyError::SubmissionFailed {
                flow: flow_name.to_string(),
                source: "job board unreachable".into(),
            });
        }
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((flow_name.to_string(), args));
        Ok(())
    }
}
