// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task submission trait for the distributed workflow runtime.

use async_trait::async_trait;

use crate::error::CanopyError;
use crate::types::TaskArgs;

/// Hands named workflows to the task runtime for asynchronous execution.
///
/// A successful return means the job was durably posted, not that it ran.
/// Implementations do not retry; failures surface as
/// [`CanopyError::SubmissionFailed`].
#[async_trait]
pub trait TaskSubmitter: Send + Sync {
    async fn submit_task(&self, flow_name: &str, args: TaskArgs) -> Result<(), CanopyError>;
}
