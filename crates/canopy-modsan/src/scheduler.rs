// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic trigger for the background job controller.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use canopy_config::model::SchedulerConfig;
use canopy_core::{CanopyError, JobType};

use crate::controller::BackgroundJobController;

/// Runs the configured job types, in order, once per interval.
pub struct JobScheduler {
    controller: Arc<BackgroundJobController>,
    jobs: Vec<JobType>,
    interval: Duration,
}

impl JobScheduler {
    pub fn new(controller: Arc<BackgroundJobController>, jobs: Vec<JobType>, interval: Duration) -> Self {
        Self {
            controller,
            jobs,
            interval,
        }
    }

    pub fn from_config(
        controller: Arc<BackgroundJobController>,
        config: &SchedulerConfig,
    ) -> Result<Self, CanopyError> {
        let jobs = config
            .jobs
            .iter()
            .map(|job| {
                JobType::from_str(job)
                    .map_err(|_| CanopyError::Config(format!("unknown scheduler job `{job}`")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(
            controller,
            jobs,
            Duration::from_secs(config.interval_secs),
        ))
    }

    /// Run every configured job once. Returns how many succeeded.
    pub async fn run_cycle(&self) -> usize {
        let mut succeeded = 0;
        for job in &self.jobs {
            match self.controller.post_job(&job.to_string(), json!({})).await {
                Ok(outcome) => {
                    succeeded += 1;
                    info!(
                        job = %job,
                        run = outcome.run_list.len(),
                        ignored = outcome.ignore_list.len(),
                        lost = outcome.lost.len(),
                        raw_fallbacks = outcome.raw_fallbacks,
                        "scheduled job finished"
                    );
                    if !outcome.lost.is_empty() {
                        warn!(job = %job, lost = outcome.lost.len(), "queue items lost this cycle");
                    }
                }
                Err(e) => warn!(job = %job, error = %e, "scheduled job failed (non-fatal)"),
            }
        }
        succeeded
    }

    /// Tick until `cancel` fires. The first cycle runs immediately.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            jobs = ?self.jobs,
            "job scheduler started"
        );
        let mut interval = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_cycle().await;
                }
                _ = cancel.cancelled() => {
                    info!("job scheduler shutting down");
                    break;
                }
            }
        }
    }
}
