// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reads and writes of the `provider_info` record table.
//!
//! Both columns hold JSON text; callers own the encoding.

use canopy_core::CanopyError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Raw columns of one provider row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfoRow {
    pub san_info: String,
    pub settings: Option<String>,
}

/// Fetch the row for `provider`, or `None` if it was never written.
pub async fn get(db: &Database, provider: &str) -> Result<Option<ProviderInfoRow>, CanopyError> {
    let provider = provider.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ProviderInfoRow>, rusqlite::Error> {
            conn.query_row(
                "SELECT san_info, settings FROM provider_info WHERE provider_name = ?1",
                params![provider],
                |row| {
                    Ok(ProviderInfoRow {
                        san_info: row.get(0)?,
                        settings: row.get(1)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite the `san_info` column, creating the row if needed.
pub async fn put_san_info(db: &Database, provider: &str, san_info: String) -> Result<(), CanopyError> {
    let provider = provider.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO provider_info (provider_name, san_info) VALUES (?1, ?2)
                 ON CONFLICT(provider_name) DO UPDATE SET san_info = excluded.san_info",
                params![provider, san_info],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite the `settings` column, creating the row if needed.
pub async fn put_settings(db: &Database, provider: &str, settings: String) -> Result<(), CanopyError> {
    let provider = provider.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO provider_info (provider_name, settings) VALUES (?1, ?2)
                 ON CONFLICT(provider_name) DO UPDATE SET settings = excluded.settings",
                params![provider, settings],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
