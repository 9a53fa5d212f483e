// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hierarchical key tree operations.
//!
//! Paths are absolute and slash-separated (`/cert_info/host/spsId`). Each
//! node stores its parent path so children can be listed without scanning.

use canopy_core::CanopyError;
use rusqlite::{OptionalExtension, TransactionBehavior, params};

use crate::database::{Database, map_coord_err};

/// Split `path` into `(node, parent)` pairs from the root downwards.
///
/// `/a/b` yields `[("/a", "/"), ("/a/b", "/a")]`.
pub fn lineage(path: &str) -> Result<Vec<(String, String)>, CanopyError> {
    let Some(rest) = path.strip_prefix('/') else {
        return Err(CanopyError::validation(format!(
            "tree path `{path}` must start with `/`"
        )));
    };
    let mut nodes = Vec::new();
    let mut parent = "/".to_string();
    for segment in rest.split('/') {
        if segment.is_empty() {
            return Err(CanopyError::validation(format!(
                "tree path `{path}` contains an empty segment"
            )));
        }
        let node = if parent == "/" {
            format!("/{segment}")
        } else {
            format!("{parent}/{segment}")
        };
        nodes.push((node.clone(), parent));
        parent = node;
    }
    Ok(nodes)
}

fn create_lineage(
    tx: &rusqlite::Transaction<'_>,
    nodes: &[(String, String)],
) -> Result<(), rusqlite::Error> {
    let mut stmt = tx.prepare_cached(
        "INSERT OR IGNORE INTO coordination_tree (path, parent) VALUES (?1, ?2)",
    )?;
    for (node, parent) in nodes {
        stmt.execute(params![node, parent])?;
    }
    Ok(())
}

/// Create `path` and any missing ancestors with empty values.
pub async fn ensure_path(db: &Database, path: &str) -> Result<(), CanopyError> {
    let nodes = lineage(path)?;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            create_lineage(&tx, &nodes)?;
            tx.commit()
        })
        .await
        .map_err(map_coord_err)
}

/// Read the value at `path`, or `None` if the node does not exist.
pub async fn get(db: &Database, path: &str) -> Result<Option<Vec<u8>>, CanopyError> {
    let path = path.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Vec<u8>>, rusqlite::Error> {
            conn.query_row(
                "SELECT value FROM coordination_tree WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_coord_err)
}

/// Write `value` at `path`, creating ancestors as needed.
pub async fn set(db: &Database, path: &str, value: Vec<u8>) -> Result<(), CanopyError> {
    let nodes = lineage(path)?;
    let path = path.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            create_lineage(&tx, &nodes)?;
            tx.execute(
                "UPDATE coordination_tree
                 SET value = ?2, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE path = ?1",
                params![path, value],
            )?;
            tx.commit()
        })
        .await
        .map_err(map_coord_err)
}

/// Names (last segment only) of the direct children of `path`, sorted.
pub async fn get_children(db: &Database, path: &str) -> Result<Vec<String>, CanopyError> {
    let path = path.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT path FROM coordination_tree WHERE parent = ?1 ORDER BY path ASC",
            )?;
            let rows = stmt.query_map(params![path], |row| row.get::<_, String>(0))?;
            let mut names = Vec::new();
            for row in rows {
                let full = row?;
                let name = full.rsplit('/').next().unwrap_or_default().to_string();
                names.push(name);
            }
            Ok(names)
        })
        .await
        .map_err(map_coord_err)
}

/// Delete `path` and everything beneath it. Missing paths are not an error.
pub async fn delete_recursive(db: &Database, path: &str) -> Result<(), CanopyError> {
    lineage(path)?;
    let path = path.to_string();
    let prefix = format!("{path}/");
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "DELETE FROM coordination_tree
                 WHERE path = ?1 OR substr(path, 1, length(?2)) = ?2",
                params![path, prefix],
            )?;
            Ok(())
        })
        .await
        .map_err(map_coord_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lineage_lists_ancestors_top_down() {
        let nodes = lineage("/a/b/c").unwrap();
        assert_eq!(
            nodes,
            vec![
                ("/a".to_string(), "/".to_string()),
                ("/a/b".to_string(), "/a".to_string()),
                ("/a/b/c".to_string(), "/a/b".to_string()),
            ]
        );
    }

    #[test]
    fn lineage_rejects_malformed_paths() {
        assert!(lineage("relative").is_err());
        assert!(lineage("/a//b").is_err());
        assert!(lineage("/a/").is_err());
    }

    #[tokio::test]
    async fn set_creates_ancestors_and_get_reads_back() {
        let db = Database::open_in_memory().await.unwrap();
        set(&db, "/cert_info/san1.example.net/spsId", b"42".to_vec())
            .await
            .unwrap();

        assert_eq!(
            get(&db, "/cert_info/san1.example.net/spsId").await.unwrap(),
            Some(b"42".to_vec())
        );
        assert_eq!(
            get(&db, "/cert_info/san1.example.net").await.unwrap(),
            Some(Vec::new())
        );
        assert_eq!(get(&db, "/missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn ensure_path_keeps_existing_value() {
        let db = Database::open_in_memory().await.unwrap();
        set(&db, "/settings/limit", b"80".to_vec()).await.unwrap();
        ensure_path(&db, "/settings/limit").await.unwrap();
        assert_eq!(get(&db, "/settings/limit").await.unwrap(), Some(b"80".to_vec()));
    }

    #[tokio::test]
    async fn children_are_direct_only() {
        let db = Database::open_in_memory().await.unwrap();
        set(&db, "/cert_info/b.net/issuer", b"\"x\"".to_vec()).await.unwrap();
        set(&db, "/cert_info/a.net/issuer", b"\"y\"".to_vec()).await.unwrap();

        assert_eq!(
            get_children(&db, "/cert_info").await.unwrap(),
            vec!["a.net".to_string(), "b.net".to_string()]
        );
        assert_eq!(
            get_children(&db, "/cert_info/a.net").await.unwrap(),
            vec!["issuer".to_string()]
        );
        assert!(get_children(&db, "/nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_recursive_removes_subtree_only() {
        let db = Database::open_in_memory().await.unwrap();
        set(&db, "/cert_info/a.net/issuer", b"1".to_vec()).await.unwrap();
        set(&db, "/cert_info_settings/limit", b"2".to_vec()).await.unwrap();

        delete_recursive(&db, "/cert_info").await.unwrap();

        assert_eq!(get(&db, "/cert_info").await.unwrap(), None);
        assert_eq!(get(&db, "/cert_info/a.net/issuer").await.unwrap(), None);
        assert_eq!(
            get(&db, "/cert_info_settings/limit").await.unwrap(),
            Some(b"2".to_vec())
        );
        delete_recursive(&db, "/cert_info").await.unwrap();
    }
}
