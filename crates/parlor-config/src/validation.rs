// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation.

use parlor_core::ParlorError;
use regex::Regex;

use crate::model::ParlorConfig;

const KNOWN_CATEGORIES: &[&str] = &[
    "technical_conceptual",
    "broad_overview",
    "specific_content",
    "personal_background",
    "general",
];

/// Validate constraints serde cannot express.
pub fn validate_config(config: &ParlorConfig) -> Result<(), ParlorError> {
    if config.retrieval.embedding_dimensions == 0 {
        return Err(ParlorError::Config(
            "retrieval.embedding_dimensions must be positive".into(),
        ));
    }
    if config.retrieval.focused_limit == 0 || config.retrieval.comprehensive_limit == 0 {
        return Err(ParlorError::Config(
            "retrieval limits must be positive".into(),
        ));
    }
    if config.retrieval.neighbor_window < 0 {
        return Err(ParlorError::Config(
            "retrieval.neighbor_window must be non-negative".into(),
        ));
    }
    if !KNOWN_CATEGORIES.contains(&config.retrieval.default_category.as_str()) {
        return Err(ParlorError::Config(format!(
            "retrieval.default_category '{}' is not one of {:?}",
            config.retrieval.default_category, KNOWN_CATEGORIES
        )));
    }
    if config.cache.recent_messages_max == 0 {
        return Err(ParlorError::Config(
            "cache.recent_messages_max must be positive".into(),
        ));
    }
    if config.rate_limit.daily_points <= 0
        || config.rate_limit.on_topic_cost <= 0
        || config.rate_limit.off_topic_cost <= 0
    {
        return Err(ParlorError::Config(
            "rate_limit points and costs must be positive".into(),
        ));
    }
    for pattern in &config.agent.safety_patterns {
        Regex::new(pattern).map_err(|e| {
            ParlorError::Config(format!("invalid safety pattern '{pattern}': {e}"))
        })?;
    }
    Ok(())
}
