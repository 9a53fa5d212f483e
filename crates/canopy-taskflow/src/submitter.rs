// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`TaskSubmitter`] that persists a flow and posts it to a job board.

use async_trait::async_trait;
use tracing::info;

use canopy_config::model::TaskflowConfig;
use canopy_core::{CanopyError, TaskArgs, TaskSubmitter};
use canopy_storage::Database;

use crate::board::JobBoard;
use crate::persistence;

/// Submits flows to one named board. Failures are not retried here.
#[derive(Debug, Clone)]
pub struct TaskflowSubmitter {
    board: JobBoard,
}

impl TaskflowSubmitter {
    pub fn new(db: Database, board_name: impl Into<String>) -> Self {
        Self {
            board: JobBoard::new(db, board_name),
        }
    }

    pub fn from_config(db: Database, config: &TaskflowConfig) -> Self {
        Self::new(db, config.board_name.clone())
    }

    pub fn board(&self) -> &JobBoard {
        &self.board
    }
}

fn submission_failed(flow_name: &str, source: CanopyError) -> CanopyError {
    CanopyError::SubmissionFailed {
        flow: flow_name.to_string(),
        source: Box::new(source),
    }
}

#[async_trait]
impl TaskSubmitter for TaskflowSubmitter {
    async fn submit_task(&self, flow_name: &str, args: TaskArgs) -> Result<(), CanopyError> {
        let flow = persistence::save_flow(self.board.database(), flow_name)
            .await
            .map_err(|e| submission_failed(flow_name, e))?;
        let job_id = self
            .board
            .post(flow_name, &flow, &args)
            .await
            .map_err(|e| submission_failed(flow_name, e))?;
        info!(
            flow = flow_name,
            job_id = %job_id,
            board = %self.board.name(),
            "flow posted to job board"
        );
        Ok(())
    }
}
