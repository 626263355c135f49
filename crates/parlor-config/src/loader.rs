// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Merge order: compiled defaults -> `./parlor.toml` -> `PARLOR_*`
//! environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ParlorConfig;

/// Load configuration from `./parlor.toml` with env var overrides.
pub fn load_config() -> Result<ParlorConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParlorConfig::default()))
        .merge(Toml::file("parlor.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (tests and embedding).
pub fn load_config_from_str(toml_content: &str) -> Result<ParlorConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParlorConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ParlorConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParlorConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Env provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so underscore-bearing
/// key names stay intact: `PARLOR_RATE_LIMIT_DAILY_POINTS` must map to
/// `rate_limit.daily_points`, not `rate.limit.daily.points`.
fn env_provider() -> Env {
    Env::prefixed("PARLOR_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("rate_limit_", "rate_limit.", 1)
            .replacen("agent_", "agent.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("cache_", "cache.", 1)
            .replacen("retrieval_", "retrieval.", 1)
            .replacen("provider_", "provider.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_any_file() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.agent.name, "parlor");
        assert_eq!(config.cache.conversation_ttl_secs, 3600);
        assert_eq!(config.cache.visitor_ttl_secs, 7 * 24 * 3600);
        assert_eq!(config.retrieval.focused_limit, 5);
        assert_eq!(config.retrieval.comprehensive_limit, 14);
        assert_eq!(config.rate_limit.daily_points, 100);
        assert!(config.provider.api_key.is_none());
        assert_eq!(config.provider.base_url, "https://api.openai.com/v1");
        assert_eq!(config.provider.chat_model, "gpt-4o-mini");
        assert_eq!(config.provider.embedding_model, "text-embedding-3-small");
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
            [gateway]
            host = "0.0.0.0"
            port = 9000

            [retrieval]
            neighbor_window = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.gateway.host, "0.0.0.0");
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.retrieval.neighbor_window, 4);
        // Untouched sections keep defaults.
        assert_eq!(config.storage.path, "parlor.db");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = load_config_from_str(
            r#"
            [agent]
            nmae = "typo"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_section_is_rejected() {
        let result = load_config_from_str(
            r#"
            [telemetry]
            enabled = true
            "#,
        );
        assert!(result.is_err());
    }
}
