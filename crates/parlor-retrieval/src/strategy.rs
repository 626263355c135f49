// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Category → search strategy mapping.

use crate::classifier::QueryCategory;

/// How the engine queries the chunk store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Contextual embeddings only. Best for concepts and patterns.
    Semantic,
    /// Raw chunk-text embeddings only. Best for direct content matches.
    PureContent,
    /// Both kinds, interleaved. Best for comprehensive coverage.
    Hybrid,
}

impl SearchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchStrategy::Semantic => "semantic",
            SearchStrategy::PureContent => "pure_content",
            SearchStrategy::Hybrid => "hybrid",
        }
    }
}

pub fn strategy_for(category: QueryCategory) -> SearchStrategy {
    match category {
        QueryCategory::TechnicalConceptual => SearchStrategy::Semantic,
        QueryCategory::PersonalBackground => SearchStrategy::Semantic,
        QueryCategory::SpecificContent => SearchStrategy::PureContent,
        QueryCategory::BroadOverview => SearchStrategy::Hybrid,
        QueryCategory::General => SearchStrategy::Hybrid,
    }
}
