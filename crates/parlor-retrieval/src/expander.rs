// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query expansion: append contextual terms before embedding so the
//! vector lands nearer the relevant chunks.
//!
//! Best effort throughout. First matching source wins (live project
//! metadata, then the static technology table, then career terms), and
//! any failure returns the query unmodified.

use parlor_storage::queries::content::list_project_metadata;
use parlor_storage::Database;

const TECH_EXPANSIONS: &[(&str, &[&str])] = &[
    (
        "react",
        &["React 18", "TypeScript", "component architecture", "hooks"],
    ),
    ("fastapi", &["FastAPI", "Python", "async", "REST API"]),
    (
        "database",
        &["PostgreSQL", "SQLite", "data modeling", "schema design"],
    ),
    ("api", &["REST API", "endpoints", "backend", "server"]),
    (
        "frontend",
        &["user interface", "React", "TypeScript", "responsive design"],
    ),
    ("backend", &["server", "API", "database", "Rust"]),
];

const CAREER_TRIGGERS: &[&str] = &["experience", "career", "background", "work history"];

const CAREER_KEYWORDS: &[&str] = &[
    "leadership",
    "team management",
    "technical transition",
    "career change",
];

pub struct QueryExpander {
    db: Database,
}

impl QueryExpander {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Expand `query` with contextual terms. Never fails; the original
    /// query is always the prefix of the result.
    pub async fn expand(&self, query: &str) -> String {
        let query_lower = query.to_lowercase();
        let mut parts = vec![query.to_string()];

        let project_terms = self.project_terms(&query_lower).await;
        if !project_terms.is_empty() {
            tracing::debug!(count = project_terms.len(), "expanded query from project metadata");
            parts.extend(project_terms);
            return parts.join(" ");
        }

        for (tech, keywords) in TECH_EXPANSIONS {
            if query_lower.contains(tech) {
                tracing::debug!(tech, "expanded query from technology table");
                parts.extend(keywords.iter().take(3).map(|s| s.to_string()));
                return parts.join(" ");
            }
        }

        if CAREER_TRIGGERS.iter().any(|t| query_lower.contains(t)) {
            tracing::debug!("expanded query with career keywords");
            parts.extend(CAREER_KEYWORDS.iter().map(|s| s.to_string()));
            return parts.join(" ");
        }

        query.to_string()
    }

    /// Tech stack and URL terms for the first project whose title
    /// appears in the query. Empty on any miss or failure.
    async fn project_terms(&self, query_lower: &str) -> Vec<String> {
        let metadata = match list_project_metadata(&self.db).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(error = %e, "project metadata lookup failed; skipping expansion");
                return Vec::new();
            }
        };

        for (title, meta_json) in metadata {
            let title_lower = title.to_lowercase();
            if title_lower.is_empty() || !query_lower.contains(&title_lower) {
                continue;
            }
            let Some(meta_json) = meta_json else {
                return Vec::new();
            };
            let Ok(meta) = serde_json::from_str::<serde_json::Value>(&meta_json) else {
                return Vec::new();
            };

            let mut terms = Vec::new();
            // tech stack: frontend and backend categories only
            for category in ["frontend", "backend"] {
                match meta.pointer(&format!("/tech_stack/{category}")) {
                    Some(serde_json::Value::Array(values)) => {
                        terms.extend(values.iter().filter_map(|v| v.as_str()).map(String::from));
                    }
                    Some(serde_json::Value::String(value)) => terms.push(value.clone()),
                    _ => {}
                }
            }
            for field in ["live_url", "github_repo"] {
                if let Some(url) = meta.get(field).and_then(|v| v.as_str()) {
                    if !url.trim().is_empty() {
                        terms.push(url.trim().to_string());
                    }
                }
            }
            terms.retain(|t| t.trim().len() > 1);
            return terms;
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_core::{new_id, ContentChunk, ContentType, EmbeddingKind};
    use parlor_storage::queries::content::insert_chunk;
    use parlor_storage::queries::sources::upsert_source;

    async fn seed_project(db: &Database, title: &str, metadata: &str) {
        let outcome = upsert_source(db, &format!("{title}.md"), "sum", "2026-01-01T00:00:00.000Z")
            .await
            .unwrap();
        let chunk = ContentChunk {
            id: new_id(),
            source_id: outcome.source_id,
            content_type: ContentType::Project,
            title: title.to_string(),
            full_text: "text".to_string(),
            chunk_text: "text".to_string(),
            chunk_index: 0,
            embedding: vec![1.0],
            embedding_kind: EmbeddingKind::Semantic,
            metadata: Some(metadata.to_string()),
        };
        insert_chunk(db, &chunk).await.unwrap();
    }

    #[tokio::test]
    async fn project_metadata_expansion_wins() {
        let db = Database::open_in_memory().await.unwrap();
        seed_project(
            &db,
            "Orbit Tracker",
            r#"{"tech_stack": {"frontend": ["React", "TypeScript"], "backend": ["Rust", "axum"]},
                "live_url": "https://orbit.example.com",
                "github_repo": "https://github.com/example/orbit"}"#,
        )
        .await;

        let expander = QueryExpander::new(db);
        let expanded = expander.expand("tell me about orbit tracker").await;
        assert!(expanded.starts_with("tell me about orbit tracker"));
        assert!(expanded.contains("React"));
        assert!(expanded.contains("axum"));
        assert!(expanded.contains("https://orbit.example.com"));
    }

    #[tokio::test]
    async fn tech_table_fires_when_no_project_matches() {
        let db = Database::open_in_memory().await.unwrap();
        let expander = QueryExpander::new(db);
        let expanded = expander.expand("how does the backend work").await;
        assert!(expanded.starts_with("how does the backend work"));
        assert!(expanded.contains("server"));
    }

    #[tokio::test]
    async fn career_terms_are_the_last_resort() {
        let db = Database::open_in_memory().await.unwrap();
        let expander = QueryExpander::new(db);
        let expanded = expander.expand("what is your work history").await;
        assert!(expanded.contains("leadership"));
        assert!(expanded.contains("career change"));
    }

    #[tokio::test]
    async fn unmatched_query_passes_through() {
        let db = Database::open_in_memory().await.unwrap();
        let expander = QueryExpander::new(db);
        assert_eq!(expander.expand("hello there").await, "hello there");
    }
}
