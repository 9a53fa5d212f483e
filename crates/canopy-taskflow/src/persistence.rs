// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logbook and flow detail persistence.

use canopy_core::CanopyError;
use canopy_storage::Database;
use rusqlite::params;
use uuid::Uuid;

use crate::map_tr_err;

/// Identifiers of the persisted logbook and flow detail for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRecord {
    pub logbook_id: String,
    pub flow_detail_id: String,
}

/// Create a logbook named after `flow_name` holding one pending flow detail.
pub async fn save_flow(db: &Database, flow_name: &str) -> Result<FlowRecord, CanopyError> {
    let record = FlowRecord {
        logbook_id: Uuid::new_v4().to_string(),
        flow_detail_id: Uuid::new_v4().to_string(),
    };
    let flow_name = flow_name.to_string();
    let ids = record.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO logbooks (id, name) VALUES (?1, ?2)",
                params![ids.logbook_id, flow_name],
            )?;
            tx.execute(
                "INSERT INTO flow_details (id, logbook_id, flow_name) VALUES (?1, ?2, ?3)",
                params![ids.flow_detail_id, ids.logbook_id, flow_name],
            )?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)?;
    Ok(record)
}

/// Record the terminal state of a flow detail (`SUCCESS`, `FAILURE`, ...).
pub async fn set_flow_state(
    db: &Database,
    flow_detail_id: &str,
    state: &str,
) -> Result<(), CanopyError> {
    let flow_detail_id = flow_detail_id.to_string();
    let state = state.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE flow_details SET state = ?2,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![flow_detail_id, state],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Current state of a flow detail, if it exists.
pub async fn flow_state(db: &Database, flow_detail_id: &str) -> Result<Option<String>, CanopyError> {
    use rusqlite::OptionalExtension;

    let flow_detail_id = flow_detail_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT state FROM flow_details WHERE id = ?1",
                params![flow_detail_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
