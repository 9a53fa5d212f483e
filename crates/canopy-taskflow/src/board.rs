// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Named job board backed by the `jobs` table.
//!
//! A job moves `unclaimed -> claimed -> complete | failed`. A claim carries
//! an expiry; once it passes, any conductor may claim the job again.

use std::time::Duration;

use rusqlite::{OptionalExtension, TransactionBehavior, params};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use canopy_core::{CanopyError, TaskArgs};
use canopy_storage::Database;

use crate::map_tr_err;
use crate::persistence::FlowRecord;

/// Lifecycle state of a posted job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobState {
    Unclaimed,
    Claimed,
    Complete,
    Failed,
}

/// A job as stored on the board.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: String,
    pub flow_name: String,
    pub details: TaskArgs,
    pub state: JobState,
    pub owner: Option<String>,
    pub attempts: u32,
    pub error: Option<String>,
}

/// A job claimed by one conductor.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimedJob {
    pub id: String,
    pub flow_name: String,
    pub flow_detail_id: String,
    pub details: TaskArgs,
    pub attempts: u32,
}

fn parse_state(raw: &str) -> Result<JobState, rusqlite::Error> {
    raw.parse().map_err(|e: strum::ParseError| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_details(raw: &str) -> Result<TaskArgs, rusqlite::Error> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Handle to one named board.
#[derive(Debug, Clone)]
pub struct JobBoard {
    db: Database,
    name: String,
}

impl JobBoard {
    pub fn new(db: Database, name: impl Into<String>) -> Self {
        Self {
            db,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Post a job for `flow_name` and return its id.
    pub async fn post(
        &self,
        flow_name: &str,
        flow: &FlowRecord,
        details: &TaskArgs,
    ) -> Result<String, CanopyError> {
        let id = Uuid::new_v4().to_string();
        let details = serde_json::to_string(details)?;
        let board = self.name.clone();
        let flow_name = flow_name.to_string();
        let flow = flow.clone();
        let job_id = id.clone();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO jobs (id, board, flow_name, logbook_id, flow_detail_id, details)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        job_id,
                        board,
                        flow_name,
                        flow.logbook_id,
                        flow.flow_detail_id,
                        details
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(id)
    }

    /// Claim the oldest claimable job whose flow is in `flow_names`.
    ///
    /// Claimable means unclaimed, or claimed with an expired claim.
    pub async fn claim(
        &self,
        owner: &str,
        flow_names: &[String],
        claim_timeout: Duration,
    ) -> Result<Option<ClaimedJob>, CanopyError> {
        if flow_names.is_empty() {
            return Ok(None);
        }
        let board = self.name.clone();
        let owner = owner.to_string();
        let names = serde_json::to_string(flow_names)?;
        let expiry = format!("+{:.3} seconds", claim_timeout.as_secs_f64());
        self.db
            .connection()
            .call(move |conn| -> Result<Option<ClaimedJob>, rusqlite::Error> {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let candidate = tx
                    .query_row(
                        "SELECT id, flow_name, flow_detail_id, details, attempts FROM jobs
                         WHERE board = ?1
                           AND flow_name IN (SELECT value FROM json_each(?2))
                           AND (state = 'unclaimed'
                                OR (state = 'claimed'
                                    AND claim_expires_at < strftime('%Y-%m-%dT%H:%M:%fZ', 'now')))
                         ORDER BY created_at ASC, rowid ASC
                         LIMIT 1",
                        params![board, names],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, String>(2)?,
                                row.get::<_, String>(3)?,
                                row.get::<_, u32>(4)?,
                            ))
                        },
                    )
                    .optional()?;

                let Some((id, flow_name, flow_detail_id, details, attempts)) = candidate else {
                    tx.commit()?;
                    return Ok(None);
                };

                tx.execute(
                    "UPDATE jobs SET state = 'claimed', owner = ?2,
                     claim_expires_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?3),
                     attempts = attempts + 1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?1",
                    params![id, owner, expiry],
                )?;
                tx.commit()?;

                Ok(Some(ClaimedJob {
                    id,
                    flow_name,
                    flow_detail_id,
                    details: parse_details(&details)?,
                    attempts: attempts + 1,
                }))
            })
            .await
            .map_err(map_tr_err)
    }

    /// Mark a claimed job complete. Returns `false` if `owner` no longer holds the claim.
    pub async fn complete(&self, job_id: &str, owner: &str) -> Result<bool, CanopyError> {
        self.finish(job_id, owner, JobState::Complete, None).await
    }

    /// Mark a claimed job failed. Returns `false` if `owner` no longer holds the claim.
    pub async fn fail(&self, job_id: &str, owner: &str, error: &str) -> Result<bool, CanopyError> {
        self.finish(job_id, owner, JobState::Failed, Some(error.to_string()))
            .await
    }

    async fn finish(
        &self,
        job_id: &str,
        owner: &str,
        state: JobState,
        error: Option<String>,
    ) -> Result<bool, CanopyError> {
        let job_id = job_id.to_string();
        let owner = owner.to_string();
        let state = state.to_string();
        let updated = self
            .db
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "UPDATE jobs SET state = ?3, error = ?4, claim_expires_at = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?1 AND owner = ?2 AND state = 'claimed'",
                    params![job_id, owner, state, error],
                )
            })
            .await
            .map_err(map_tr_err)?;
        Ok(updated == 1)
    }

    /// Jobs on this board, oldest first, optionally filtered by state.
    pub async fn jobs(&self, state: Option<JobState>) -> Result<Vec<Job>, CanopyError> {
        let board = self.name.clone();
        let state = state.map(|s| s.to_string());
        self.db
            .connection()
            .call(move |conn| -> Result<Vec<Job>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, flow_name, details, state, owner, attempts, error FROM jobs
                     WHERE board = ?1 AND (?2 IS NULL OR state = ?2)
                     ORDER BY created_at ASC, rowid ASC",
                )?;
                let rows = stmt.query_map(params![board, state], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, u32>(5)?,
                        row.get::<_, Option<String>>(6)?,
                    ))
                })?;
                let mut jobs = Vec::new();
                for row in rows {
                    let (id, flow_name, details, state, owner, attempts, error) = row?;
                    jobs.push(Job {
                        id,
                        flow_name,
                        details: parse_details(&details)?,
                        state: parse_state(&state)?,
                        owner,
                        attempts,
                        error,
                    });
                }
                Ok(jobs)
            })
            .await
            .map_err(map_tr_err)
    }
}
