// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content chunk storage and vector search.
//!
//! Embeddings are stored as little-endian f32 BLOBs and ranked in
//! process by cosine distance. The corpus is small enough (hundreds of
//! chunks) that a linear scan beats maintaining an ANN index.

use parlor_core::vector::{blob_to_vec, cosine_distance, vec_to_blob};
use parlor_core::{ContentChunk, ContentType, EmbeddingKind, ParlorError};
use rusqlite::params;

use crate::database::{map_tr_err, Database};

const CHUNK_COLS: &str = "id, source_id, content_type, title, full_text, chunk_text, chunk_index, embedding, embedding_kind, metadata";

fn row_to_chunk(row: &rusqlite::Row<'_>) -> Result<ContentChunk, rusqlite::Error> {
    let content_type: String = row.get(2)?;
    let blob: Vec<u8> = row.get(7)?;
    let kind: String = row.get(8)?;
    Ok(ContentChunk {
        id: row.get(0)?,
        source_id: row.get(1)?,
        content_type: ContentType::from_str_value(&content_type),
        title: row.get(3)?,
        full_text: row.get(4)?,
        chunk_text: row.get(5)?,
        chunk_index: row.get(6)?,
        embedding: blob_to_vec(&blob),
        embedding_kind: EmbeddingKind::from_str_value(&kind),
        metadata: row.get(9)?,
    })
}

/// Insert a chunk. Violating the (source_id, chunk_index, embedding_kind)
/// uniqueness constraint is a caller bug surfaced as a storage error.
pub async fn insert_chunk(db: &Database, chunk: &ContentChunk) -> Result<(), ParlorError> {
    let c = chunk.clone();
    let blob = vec_to_blob(&c.embedding);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO content_chunks (id, source_id, content_type, title, full_text, chunk_text, chunk_index, embedding, embedding_kind, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    c.id,
                    c.source_id,
                    c.content_type.as_str(),
                    c.title,
                    c.full_text,
                    c.chunk_text,
                    c.chunk_index,
                    blob,
                    c.embedding_kind.as_str(),
                    c.metadata,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Rank chunks of one embedding kind by cosine distance to `query`,
/// optionally restricted to the given content types.
///
/// Returns at most `limit` (chunk, distance) pairs, nearest first.
pub async fn search_by_kind(
    db: &Database,
    query: &[f32],
    kind: EmbeddingKind,
    content_types: Option<&[ContentType]>,
    limit: usize,
) -> Result<Vec<(ContentChunk, f32)>, ParlorError> {
    let query = query.to_vec();
    // Content type values are closed-set enum strings, safe to inline.
    let type_filter = content_types.map(|types| {
        let list = types
            .iter()
            .map(|t| format!("'{}'", t.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        format!(" AND content_type IN ({list})")
    });
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {CHUNK_COLS} FROM content_chunks WHERE embedding_kind = ?1{}",
                type_filter.as_deref().unwrap_or("")
            );
            let mut stmt = conn.prepare(&sql)?;
            let chunks = stmt
                .query_map(params![kind.as_str()], row_to_chunk)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(chunks)
        })
        .await
        .map_err(map_tr_err)
        .map(|chunks| {
            let mut scored: Vec<(ContentChunk, f32)> = chunks
                .into_iter()
                .map(|chunk| {
                    let distance = cosine_distance(&query, &chunk.embedding);
                    (chunk, distance)
                })
                .collect();
            scored.sort_by(|a, b| a.1.total_cmp(&b.1));
            scored.truncate(limit);
            scored
        })
}

/// Chunks adjacent to a seed: same source and kind, chunk_index within
/// `window` of `center` but not the center itself. Ordered by index.
pub async fn get_nearby_chunks(
    db: &Database,
    source_id: &str,
    center: i64,
    window: i64,
    kind: EmbeddingKind,
    limit: usize,
) -> Result<Vec<ContentChunk>, ParlorError> {
    let source_id = source_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CHUNK_COLS} FROM content_chunks
                 WHERE source_id = ?1 AND embedding_kind = ?2
                   AND chunk_index BETWEEN ?3 AND ?4 AND chunk_index != ?5
                 ORDER BY chunk_index ASC LIMIT ?6"
            ))?;
            let chunks = stmt
                .query_map(
                    params![
                        source_id,
                        kind.as_str(),
                        center - window,
                        center + window,
                        center,
                        limit as i64
                    ],
                    row_to_chunk,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(chunks)
        })
        .await
        .map_err(map_tr_err)
}

/// Distinct (title, metadata) pairs for project chunks. Feeds query
/// expansion with project names, tech stacks, and URLs.
pub async fn list_project_metadata(
    db: &Database,
) -> Result<Vec<(String, Option<String>)>, ParlorError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT title, metadata FROM content_chunks
                 WHERE content_type = 'project' ORDER BY title",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::sources::upsert_source;
    use parlor_core::new_id;

    async fn setup() -> (Database, String) {
        let db = Database::open_in_memory().await.unwrap();
        let outcome = upsert_source(&db, "projects.md", "sum", "2026-01-01T00:00:00.000Z")
            .await
            .unwrap();
        (db, outcome.source_id)
    }

    fn make_chunk(
        source_id: &str,
        index: i64,
        embedding: Vec<f32>,
        kind: EmbeddingKind,
    ) -> ContentChunk {
        ContentChunk {
            id: new_id(),
            source_id: source_id.to_string(),
            content_type: ContentType::Project,
            title: "Orbit Tracker".to_string(),
            full_text: "full document text".to_string(),
            chunk_text: format!("chunk body {index}"),
            chunk_index: index,
            embedding,
            embedding_kind: kind,
            metadata: Some(r#"{"tech_stack": ["rust"]}"#.to_string()),
        }
    }

    #[tokio::test]
    async fn search_ranks_by_cosine_distance() {
        let (db, source_id) = setup().await;
        insert_chunk(
            &db,
            &make_chunk(&source_id, 0, vec![1.0, 0.0, 0.0], EmbeddingKind::Semantic),
        )
        .await
        .unwrap();
        insert_chunk(
            &db,
            &make_chunk(&source_id, 1, vec![0.0, 1.0, 0.0], EmbeddingKind::Semantic),
        )
        .await
        .unwrap();
        insert_chunk(
            &db,
            &make_chunk(&source_id, 2, vec![0.9, 0.1, 0.0], EmbeddingKind::Semantic),
        )
        .await
        .unwrap();

        let results = search_by_kind(&db, &[1.0, 0.0, 0.0], EmbeddingKind::Semantic, None, 2)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.chunk_index, 0);
        assert_eq!(results[1].0.chunk_index, 2);
        assert!(results[0].1 <= results[1].1);
    }

    #[tokio::test]
    async fn search_is_scoped_to_embedding_kind() {
        let (db, source_id) = setup().await;
        insert_chunk(
            &db,
            &make_chunk(&source_id, 0, vec![1.0, 0.0], EmbeddingKind::Semantic),
        )
        .await
        .unwrap();
        insert_chunk(
            &db,
            &make_chunk(&source_id, 0, vec![1.0, 0.0], EmbeddingKind::Pure),
        )
        .await
        .unwrap();

        let results = search_by_kind(&db, &[1.0, 0.0], EmbeddingKind::Pure, None, 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.embedding_kind, EmbeddingKind::Pure);
    }

    #[tokio::test]
    async fn content_type_filter_applies() {
        let (db, source_id) = setup().await;
        let mut about = make_chunk(&source_id, 0, vec![1.0, 0.0], EmbeddingKind::Semantic);
        about.content_type = ContentType::About;
        insert_chunk(&db, &about).await.unwrap();
        insert_chunk(
            &db,
            &make_chunk(&source_id, 1, vec![1.0, 0.0], EmbeddingKind::Semantic),
        )
        .await
        .unwrap();

        let results = search_by_kind(
            &db,
            &[1.0, 0.0],
            EmbeddingKind::Semantic,
            Some(&[ContentType::About]),
            10,
        )
        .await
        .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.content_type, ContentType::About);
    }

    #[tokio::test]
    async fn nearby_chunks_exclude_the_seed() {
        let (db, source_id) = setup().await;
        for i in 0..6 {
            insert_chunk(
                &db,
                &make_chunk(&source_id, i, vec![1.0, 0.0], EmbeddingKind::Semantic),
            )
            .await
            .unwrap();
        }

        let nearby = get_nearby_chunks(&db, &source_id, 3, 2, EmbeddingKind::Semantic, 5)
            .await
            .unwrap();
        let indices: Vec<_> = nearby.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![1, 2, 4, 5]);
    }

    #[tokio::test]
    async fn duplicate_position_is_rejected() {
        let (db, source_id) = setup().await;
        insert_chunk(
            &db,
            &make_chunk(&source_id, 0, vec![1.0], EmbeddingKind::Semantic),
        )
        .await
        .unwrap();
        let dup = insert_chunk(
            &db,
            &make_chunk(&source_id, 0, vec![1.0], EmbeddingKind::Semantic),
        )
        .await;
        assert!(dup.is_err());
    }

    #[tokio::test]
    async fn project_metadata_is_deduplicated() {
        let (db, source_id) = setup().await;
        insert_chunk(
            &db,
            &make_chunk(&source_id, 0, vec![1.0], EmbeddingKind::Semantic),
        )
        .await
        .unwrap();
        insert_chunk(
            &db,
            &make_chunk(&source_id, 1, vec![1.0], EmbeddingKind::Semantic),
        )
        .await
        .unwrap();

        let meta = list_project_metadata(&db).await.unwrap();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].0, "Orbit Tracker");
    }
}
