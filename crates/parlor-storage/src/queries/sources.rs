// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge source bookkeeping for ingestion.
//!
//! A source is one ingested document. When its checksum changes the old
//! chunks are dropped in the same transaction that records the new
//! checksum, so readers never see a mix of generations.

use parlor_core::{new_id, KnowledgeSource, ParlorError};
use rusqlite::params;

use crate::database::{map_tr_err, Database};

/// Look up a source by its unique name.
pub async fn get_source_by_name(
    db: &Database,
    name: &str,
) -> Result<Option<KnowledgeSource>, ParlorError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, checksum, last_indexed_at FROM knowledge_sources WHERE name = ?1",
            )?;
            let result = stmt.query_row(params![name], |row| {
                Ok(KnowledgeSource {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    checksum: row.get(2)?,
                    last_indexed_at: row.get(3)?,
                })
            });
            match result {
                Ok(source) => Ok(Some(source)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Outcome of [`upsert_source`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub source_id: String,
    /// True when the source was new or its checksum changed, meaning its
    /// chunks were (or must be) re-ingested.
    pub changed: bool,
}

/// Register a source or refresh its checksum.
///
/// If the checksum is unchanged this is a no-op apart from returning the
/// existing id. If it changed, the stale chunks are deleted atomically
/// with the checksum update.
pub async fn upsert_source(
    db: &Database,
    name: &str,
    checksum: &str,
    indexed_at: &str,
) -> Result<UpsertOutcome, ParlorError> {
    let name = name.to_string();
    let checksum = checksum.to_string();
    let indexed_at = indexed_at.to_string();
    let fresh_id = new_id();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let existing: Option<(String, Option<String>)> = {
                let mut stmt = tx.prepare(
                    "SELECT id, checksum FROM knowledge_sources WHERE name = ?1",
                )?;
                match stmt.query_row(params![name], |row| Ok((row.get(0)?, row.get(1)?))) {
                    Ok(pair) => Some(pair),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                }
            };
            let outcome = match existing {
                Some((id, Some(old))) if old == checksum => UpsertOutcome {
                    source_id: id,
                    changed: false,
                },
                Some((id, _)) => {
                    tx.execute(
                        "DELETE FROM content_chunks WHERE source_id = ?1",
                        params![id],
                    )?;
                    tx.execute(
                        "UPDATE knowledge_sources SET checksum = ?1, last_indexed_at = ?2 WHERE id = ?3",
                        params![checksum, indexed_at, id],
                    )?;
                    UpsertOutcome {
                        source_id: id,
                        changed: true,
                    }
                }
                None => {
                    tx.execute(
                        "INSERT INTO knowledge_sources (id, name, checksum, last_indexed_at)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![fresh_id, name, checksum, indexed_at],
                    )?;
                    UpsertOutcome {
                        source_id: fresh_id,
                        changed: true,
                    }
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)
}

/// List all registered sources.
pub async fn list_sources(db: &Database) -> Result<Vec<KnowledgeSource>, ParlorError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, checksum, last_indexed_at FROM knowledge_sources ORDER BY name",
            )?;
            let sources = stmt
                .query_map([], |row| {
                    Ok(KnowledgeSource {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        checksum: row.get(2)?,
                        last_indexed_at: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(sources)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_is_stable_for_same_checksum() {
        let db = Database::open_in_memory().await.unwrap();
        let first = upsert_source(&db, "resume.md", "abc", "2026-01-01T00:00:00.000Z")
            .await
            .unwrap();
        assert!(first.changed);

        let second = upsert_source(&db, "resume.md", "abc", "2026-01-02T00:00:00.000Z")
            .await
            .unwrap();
        assert!(!second.changed);
        assert_eq!(first.source_id, second.source_id);
    }

    #[tokio::test]
    async fn changed_checksum_keeps_id_and_flags_reingest() {
        let db = Database::open_in_memory().await.unwrap();
        let first = upsert_source(&db, "about.md", "v1", "2026-01-01T00:00:00.000Z")
            .await
            .unwrap();
        let second = upsert_source(&db, "about.md", "v2", "2026-01-02T00:00:00.000Z")
            .await
            .unwrap();
        assert!(second.changed);
        assert_eq!(first.source_id, second.source_id);

        let source = get_source_by_name(&db, "about.md").await.unwrap().unwrap();
        assert_eq!(source.checksum.as_deref(), Some("v2"));
        assert_eq!(
            source.last_indexed_at.as_deref(),
            Some("2026-01-02T00:00:00.000Z")
        );
    }

    #[tokio::test]
    async fn list_orders_by_name() {
        let db = Database::open_in_memory().await.unwrap();
        upsert_source(&db, "b.md", "x", "2026-01-01T00:00:00.000Z")
            .await
            .unwrap();
        upsert_source(&db, "a.md", "y", "2026-01-01T00:00:00.000Z")
            .await
            .unwrap();
        let names: Vec<_> = list_sources(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["a.md", "b.md"]);
    }
}
