// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The retrieval engine: classify, pick a strategy, search, expand.
//!
//! Single-kind strategies rank one embedding kind and expand with
//! neighbors. Hybrid over-fetches both kinds at 2x the limit and
//! interleaves them, deduplicating on a chunk-text prefix hash, before
//! the same neighbor expansion.

use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};

use parlor_config::RetrievalConfig;
use parlor_core::{ContentChunk, ContentType, EmbeddingKind, ParlorError};
use parlor_storage::queries::content::{get_nearby_chunks, list_project_metadata, search_by_kind};
use parlor_storage::Database;

use crate::classifier::{classify, QueryCategory};
use crate::strategy::{strategy_for, SearchStrategy};
use crate::triggers;

/// Rows fetched per seed during neighbor expansion.
const NEIGHBOR_FETCH_LIMIT: usize = 5;

pub struct RetrievalEngine {
    db: Database,
    config: RetrievalConfig,
}

impl RetrievalEngine {
    pub fn new(db: Database, config: RetrievalConfig) -> Self {
        Self { db, config }
    }

    /// Whether this message should trigger retrieval at all.
    pub fn needs_search(&self, message: &str) -> bool {
        triggers::needs_search(message, &self.config.trigger_keywords)
    }

    /// Result budget for this message.
    pub fn search_limit(&self, message: &str) -> usize {
        triggers::search_limit(
            message,
            self.config.focused_limit,
            self.config.comprehensive_limit,
        )
    }

    /// Keyword-derived content type filter.
    pub fn detect_content_types(&self, message: &str) -> Option<Vec<ContentType>> {
        triggers::detect_content_types(message)
    }

    /// Run the adaptive search for an already-embedded query.
    pub async fn search(
        &self,
        query_embedding: &[f32],
        content_types: Option<&[ContentType]>,
        limit: usize,
        query_text: &str,
    ) -> Result<Vec<ContentChunk>, ParlorError> {
        let category = self.classify_query(query_text).await;
        let strategy = strategy_for(category);
        tracing::info!(
            category = category.as_str(),
            strategy = strategy.as_str(),
            limit,
            "retrieval strategy selected"
        );

        let seeds = match strategy {
            SearchStrategy::Semantic => {
                self.single_kind(query_embedding, EmbeddingKind::Semantic, content_types, limit)
                    .await?
            }
            SearchStrategy::PureContent => {
                self.single_kind(query_embedding, EmbeddingKind::Pure, content_types, limit)
                    .await?
            }
            SearchStrategy::Hybrid => {
                self.hybrid(query_embedding, content_types, limit).await?
            }
        };

        self.expand_with_neighbors(seeds, limit).await
    }

    /// Classify against the currently known project titles. A metadata
    /// lookup failure degrades to classification without project names.
    pub async fn classify_query(&self, query_text: &str) -> QueryCategory {
        let project_names = match list_project_metadata(&self.db).await {
            Ok(metadata) => metadata.into_iter().map(|(title, _)| title).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "project title lookup failed; classifying without them");
                Vec::new()
            }
        };
        let default = QueryCategory::from_str_value(&self.config.default_category);
        classify(query_text, &project_names, default)
    }

    async fn single_kind(
        &self,
        query_embedding: &[f32],
        kind: EmbeddingKind,
        content_types: Option<&[ContentType]>,
        limit: usize,
    ) -> Result<Vec<ContentChunk>, ParlorError> {
        let ranked = search_by_kind(&self.db, query_embedding, kind, content_types, limit).await?;
        Ok(ranked.into_iter().map(|(chunk, _)| chunk).collect())
    }

    async fn hybrid(
        &self,
        query_embedding: &[f32],
        content_types: Option<&[ContentType]>,
        limit: usize,
    ) -> Result<Vec<ContentChunk>, ParlorError> {
        let semantic = search_by_kind(
            &self.db,
            query_embedding,
            EmbeddingKind::Semantic,
            content_types,
            limit * 2,
        )
        .await?;
        let pure = search_by_kind(
            &self.db,
            query_embedding,
            EmbeddingKind::Pure,
            content_types,
            limit * 2,
        )
        .await?;
        Ok(merge_interleaved(
            semantic.into_iter().map(|(c, _)| c).collect(),
            pure.into_iter().map(|(c, _)| c).collect(),
            limit,
        ))
    }

    /// Pull siblings around each seed for document flow. Seeds always
    /// survive; neighbor additions stop at twice the limit.
    async fn expand_with_neighbors(
        &self,
        seeds: Vec<ContentChunk>,
        limit: usize,
    ) -> Result<Vec<ContentChunk>, ParlorError> {
        if seeds.is_empty() {
            return Ok(seeds);
        }
        let mut seen: HashSet<(String, i64)> = HashSet::new();
        let mut expanded = Vec::new();

        for seed in seeds {
            let key = (seed.source_id.clone(), seed.chunk_index);
            let source_id = seed.source_id.clone();
            let center = seed.chunk_index;
            let kind = seed.embedding_kind;
            if seen.insert(key) {
                expanded.push(seed);
            }

            let nearby = get_nearby_chunks(
                &self.db,
                &source_id,
                center,
                self.config.neighbor_window,
                kind,
                NEIGHBOR_FETCH_LIMIT,
            )
            .await?;
            for chunk in nearby {
                if expanded.len() >= limit * 2 {
                    break;
                }
                let key = (chunk.source_id.clone(), chunk.chunk_index);
                if seen.insert(key) {
                    expanded.push(chunk);
                }
            }
        }
        Ok(expanded)
    }
}

/// Round-robin interleave, semantic first, skipping chunks whose text
/// prefix was already taken, stopping at `limit`.
fn merge_interleaved(
    semantic: Vec<ContentChunk>,
    pure: Vec<ContentChunk>,
    limit: usize,
) -> Vec<ContentChunk> {
    let mut merged: Vec<ContentChunk> = Vec::new();
    let mut seen: HashSet<u64> = HashSet::new();
    let rounds = semantic.len().max(pure.len());
    let mut semantic = semantic.into_iter();
    let mut pure = pure.into_iter();

    for _ in 0..rounds {
        if let Some(chunk) = semantic.next() {
            if merged.len() < limit && seen.insert(prefix_hash(&chunk.chunk_text)) {
                merged.push(chunk);
            }
        }
        if let Some(chunk) = pure.next() {
            if merged.len() < limit && seen.insert(prefix_hash(&chunk.chunk_text)) {
                merged.push(chunk);
            }
        }
        if merged.len() >= limit {
            break;
        }
    }
    merged
}

/// Hash of the first 100 characters; enough to catch the same chunk
/// text arriving under both embedding kinds.
fn prefix_hash(text: &str) -> u64 {
    let prefix: String = text.chars().take(100).collect();
    let mut hasher = DefaultHasher::new();
    prefix.hash(&mut hasher);
    hasher.finish()
}
