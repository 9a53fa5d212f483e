// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Locking FIFO queue operations, scoped by coordination path.
//!
//! Every mutation runs inside an immediate transaction so concurrent
//! processes sharing the database file observe each put or consume whole.

use canopy_core::CanopyError;
use rusqlite::{OptionalExtension, TransactionBehavior, params};

use crate::database::{Database, map_coord_err};

/// Append one payload to the tail of the queue at `path`.
pub async fn put(db: &Database, path: &str, payload: &str) -> Result<(), CanopyError> {
    put_all(db, path, vec![payload.to_string()]).await
}

/// Append payloads in order, atomically.
pub async fn put_all(db: &Database, path: &str, payloads: Vec<String>) -> Result<(), CanopyError> {
    if payloads.is_empty() {
        return Ok(());
    }
    let path = path.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO coordination_queue (path, payload) VALUES (?1, ?2)",
                )?;
                for payload in &payloads {
                    stmt.execute(params![path, payload])?;
                }
            }
            tx.commit()
        })
        .await
        .map_err(map_coord_err)
}

/// Return the head payload without removing it.
pub async fn peek(db: &Database, path: &str) -> Result<Option<String>, CanopyError> {
    let path = path.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT payload FROM coordination_queue
                 WHERE path = ?1
                 ORDER BY id ASC
                 LIMIT 1",
                params![path],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_coord_err)
}

/// Remove and return the head payload.
pub async fn consume(db: &Database, path: &str) -> Result<Option<String>, CanopyError> {
    let path = path.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let head: Option<(i64, String)> = tx
                .query_row(
                    "SELECT id, payload FROM coordination_queue
                     WHERE path = ?1
                     ORDER BY id ASC
                     LIMIT 1",
                    params![path],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            if let Some((id, _)) = &head {
                tx.execute("DELETE FROM coordination_queue WHERE id = ?1", params![id])?;
            }
            tx.commit()?;
            Ok(head.map(|(_, payload)| payload))
        })
        .await
        .map_err(map_coord_err)
}

/// Number of payloads queued at `path`.
pub async fn len(db: &Database, path: &str) -> Result<usize, CanopyError> {
    let path = path.to_string();
    let count = db
        .connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM coordination_queue WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_coord_err)?;
    Ok(usize::try_from(count).unwrap_or_default())
}
