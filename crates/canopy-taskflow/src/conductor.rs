// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conductor: claims jobs from a board and runs them.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use canopy_config::model::TaskflowConfig;
use canopy_core::CanopyError;
use canopy_storage::Database;

use crate::board::{JobBoard, JobState};
use crate::persistence;
use crate::workflow::WorkflowRegistry;

/// A worker that consumes one job board.
pub struct Conductor {
    name: String,
    board: JobBoard,
    registry: WorkflowRegistry,
    poll_interval: Duration,
    claim_timeout: Duration,
}

impl Conductor {
    pub fn new(name: impl Into<String>, board: JobBoard, registry: WorkflowRegistry) -> Self {
        Self {
            name: name.into(),
            board,
            registry,
            poll_interval: Duration::from_secs(5),
            claim_timeout: Duration::from_secs(300),
        }
    }

    /// Conductor for the configured board, named after `conductor_name`.
    pub fn from_config(db: Database, config: &TaskflowConfig, registry: WorkflowRegistry) -> Self {
        Self::new(
            config.conductor_name.clone(),
            JobBoard::new(db, config.board_name.clone()),
            registry,
        )
        .with_poll_interval(Duration::from_secs(config.poll_interval_secs))
        .with_claim_timeout(Duration::from_secs(config.claim_timeout_secs))
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_claim_timeout(mut self, timeout: Duration) -> Self {
        self.claim_timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Claim and run at most one job.
    ///
    /// Returns the state the job ended in, or `None` when nothing was claimable.
    pub async fn run_once(&self) -> Result<Option<JobState>, CanopyError> {
        let Some(job) = self
            .board
            .claim(&self.name, &self.registry.names(), self.claim_timeout)
            .await?
        else {
            return Ok(None);
        };

        let Some(flow) = self.registry.get(&job.flow_name) else {
            // Claimed by name, so only reachable if the registry changed underneath us.
            self.board
                .fail(&job.id, &self.name, "no workflow registered")
                .await?;
            return Ok(Some(JobState::Failed));
        };

        debug!(job_id = %job.id, flow = %job.flow_name, attempt = job.attempts, "running job");
        let (state, held) = match flow.execute(job.details).await {
            Ok(()) => {
                persistence::set_flow_state(self.board.database(), &job.flow_detail_id, "SUCCESS")
                    .await?;
                (JobState::Complete, self.board.complete(&job.id, &self.name).await?)
            }
            Err(e) => {
                error!(job_id = %job.id, flow = %job.flow_name, error = %e, "job failed");
                persistence::set_flow_state(self.board.database(), &job.flow_detail_id, "FAILURE")
                    .await?;
                (
                    JobState::Failed,
                    self.board.fail(&job.id, &self.name, &e.to_string()).await?,
                )
            }
        };

        if !held {
            warn!(job_id = %job.id, conductor = %self.name, "claim expired before the job finished");
        }
        Ok(Some(state))
    }

    /// Run jobs until `cancel` fires, sleeping `poll_interval` whenever the
    /// board has nothing claimable.
    pub async fn run_task_worker(&self, cancel: CancellationToken) -> Result<(), CanopyError> {
        if self.registry.is_empty() {
            return Err(CanopyError::Config(
                "conductor has no registered workflows".to_string(),
            ));
        }
        info!(
            conductor = %self.name,
            board = %self.board.name(),
            flows = ?self.registry.names(),
            "task worker started"
        );

        while !cancel.is_cancelled() {
            match self.run_once().await {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => warn!(error = %e, "job board poll failed"),
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!(conductor = %self.name, "task worker stopped");
        Ok(())
    }
}
