// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword-weighted query classification.
//!
//! Each category accumulates (occurrences × weight) over its term
//! bucket; the highest score wins. Project-name hits dominate by
//! construction: a single project mention outscores double keyword
//! hits in any other bucket.

use serde::{Deserialize, Serialize};

/// What kind of answer the query is after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryCategory {
    TechnicalConceptual,
    BroadOverview,
    SpecificContent,
    PersonalBackground,
    General,
}

impl QueryCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryCategory::TechnicalConceptual => "technical_conceptual",
            QueryCategory::BroadOverview => "broad_overview",
            QueryCategory::SpecificContent => "specific_content",
            QueryCategory::PersonalBackground => "personal_background",
            QueryCategory::General => "general",
        }
    }

    pub fn from_str_value(s: &str) -> Self {
        match s {
            "technical_conceptual" => QueryCategory::TechnicalConceptual,
            "broad_overview" => QueryCategory::BroadOverview,
            "specific_content" => QueryCategory::SpecificContent,
            "personal_background" => QueryCategory::PersonalBackground,
            _ => QueryCategory::General,
        }
    }
}

const PROJECT_NAME_WEIGHT: u32 = 5;
const URL_TERM_WEIGHT: u32 = 3;
const BUCKET_WEIGHT: u32 = 2;

const URL_TERMS: &[&str] = &["url", "link", "demo", "github", "repository", "source"];

const TECH_TERMS: &[&str] = &[
    "fastapi",
    "react",
    "typescript",
    "python",
    "rust",
    "architecture",
    "design",
    "patterns",
    "approach",
    "philosophy",
    "methodology",
    "framework",
    "library",
    "technology",
    "database",
    "api",
    "backend",
    "frontend",
    "fullstack",
    "development",
    "engineering",
];

const OVERVIEW_TERMS: &[&str] = &[
    "overview",
    "summary",
    "about",
    "tell me about",
    "what is",
    "describe",
    "explain",
    "general",
    "broad",
    "high level",
    "introduction",
];

const PERSONAL_TERMS: &[&str] = &[
    "background",
    "experience",
    "career",
    "personal",
    "journey",
    "story",
    "interests",
    "hobbies",
    "passion",
    "motivation",
    "transition",
    "leadership",
    "team",
    "management",
];

fn bucket_score(query: &str, terms: &[&str], weight: u32) -> u32 {
    terms.iter().filter(|term| query.contains(*term)).count() as u32 * weight
}

/// Classify a query given the currently known project names.
///
/// Ties break by fixed priority: specific_content, then
/// technical_conceptual, then personal_background, then broad_overview.
/// A zero across all buckets yields `default`.
pub fn classify(query: &str, project_names: &[String], default: QueryCategory) -> QueryCategory {
    let query = query.to_lowercase();

    let project_hits = project_names
        .iter()
        .filter(|name| {
            let name = name.to_lowercase();
            !name.is_empty() && query.contains(&name)
        })
        .count() as u32;

    let specific =
        project_hits * PROJECT_NAME_WEIGHT + bucket_score(&query, URL_TERMS, URL_TERM_WEIGHT);
    let technical = bucket_score(&query, TECH_TERMS, BUCKET_WEIGHT);
    let personal = bucket_score(&query, PERSONAL_TERMS, BUCKET_WEIGHT);
    let overview = bucket_score(&query, OVERVIEW_TERMS, BUCKET_WEIGHT);

    // Priority order doubles as the tie-break.
    let ranked = [
        (specific, QueryCategory::SpecificContent),
        (technical, QueryCategory::TechnicalConceptual),
        (personal, QueryCategory::PersonalBackground),
        (overview, QueryCategory::BroadOverview),
    ];
    let (best_score, best) = ranked
        .iter()
        .copied()
        .max_by_key(|(score, _)| *score)
        .unwrap_or((0, default));

    if best_score == 0 {
        tracing::debug!(query = %query, "no classifier bucket scored; using default");
        return default;
    }
    // max_by_key returns the last maximum; re-scan in priority order.
    let winner = ranked
        .iter()
        .find(|(score, _)| *score == best_score)
        .map(|(_, category)| *category)
        .unwrap_or(best);
    tracing::debug!(query = %query, category = winner.as_str(), score = best_score, "classified query");
    winner
}
