// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use canopy_core::CanopyError;
use tracing::debug;

/// Handle to the Canopy SQLite database.
///
/// Cloning is cheap: every clone talks to the same background connection.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and apply migrations.
    pub async fn open(path: &str) -> Result<Self, CanopyError> {
        Self::open_with(path, true).await
    }

    /// Open the database, choosing whether to switch the journal to WAL.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, CanopyError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| CanopyError::Storage {
                source: Box::new(e),
            })?;
        Self::setup(conn, wal_mode).await
    }

    /// Open a private in-memory database. Used by tests and dry runs.
    pub async fn open_in_memory() -> Result<Self, CanopyError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| CanopyError::Storage {
                source: Box::new(e),
            })?;
        Self::setup(conn, false).await
    }

    async fn setup(conn: tokio_rusqlite::Connection, wal_mode: bool) -> Result<Self, CanopyError> {
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if wal_mode {
                let mode: String =
                    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
                debug!(journal_mode = %mode, "journal mode set");
            }
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        let applied = conn
            .call(crate::migrations::run_migrations)
            .await
            .map_err(|e| CanopyError::Storage {
                source: Box::new(e),
            })?;
        if applied > 0 {
            debug!(applied, "database migrations applied");
        }

        Ok(Self { conn })
    }

    /// The shared tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), CanopyError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(|e| CanopyError::Storage {
            source: Box::new(e),
        })
    }
}

/// Map a record-store failure into [`CanopyError::Storage`].
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> CanopyError {
    CanopyError::Storage {
        source: Box::new(e),
    }
}

/// Map a coordination failure into [`CanopyError::CoordinationUnavailable`].
pub(crate) fn map_coord_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> CanopyError {
    CanopyError::CoordinationUnavailable {
        source: Box::new(e),
    }
}
