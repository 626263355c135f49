// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Parlor.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject
//! unrecognized config keys at startup. The loaded value is immutable
//! and handed to each component at construction time.

use serde::{Deserialize, Serialize};

/// Top-level Parlor configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParlorConfig {
    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Assistant identity and turn behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the assistant.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Log level for the default tracing filter.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// System prompt for the completion call.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Assistant greeting that seeds every new transcript.
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Fixed degraded reply when the completion call fails.
    #[serde(default = "default_apology")]
    pub apology_message: String,

    /// Reply substituted when the safety filter blocks a message.
    #[serde(default = "default_safety_message")]
    pub safety_message: String,

    /// Case-insensitive regex deny-list checked before any provider call.
    #[serde(default)]
    pub safety_patterns: Vec<String>,

    /// Reply substituted when the daily point budget is exhausted.
    #[serde(default = "default_rate_limited_message")]
    pub rate_limited_message: String,

    /// Maximum accepted message length in characters.
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    /// Maximum tokens requested from the completion call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: default_system_prompt(),
            greeting: default_greeting(),
            apology_message: default_apology(),
            safety_message: default_safety_message(),
            safety_patterns: Vec::new(),
            rate_limited_message: default_rate_limited_message(),
            max_message_chars: default_max_message_chars(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// HTTP/WebSocket gateway binding.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Durable store settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// SQLite database path.
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            path: default_db_path(),
        }
    }
}

/// TTL policy for the cache tier.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// TTL for conversation entries, refreshed on every touch.
    #[serde(default = "default_hour_secs")]
    pub conversation_ttl_secs: u64,

    /// TTL for message hashes and per-conversation message lists.
    #[serde(default = "default_hour_secs")]
    pub message_ttl_secs: u64,

    /// TTL for visitor identity entries (longer horizon).
    #[serde(default = "default_week_secs")]
    pub visitor_ttl_secs: u64,

    /// Bounded size of the per-conversation recent-message list.
    #[serde(default = "default_recent_messages_max")]
    pub recent_messages_max: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            conversation_ttl_secs: default_hour_secs(),
            message_ttl_secs: default_hour_secs(),
            visitor_ttl_secs: default_week_secs(),
            recent_messages_max: default_recent_messages_max(),
        }
    }
}

/// Retrieval engine knobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Fixed embedding vector dimension.
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    /// Result limit for focused queries.
    #[serde(default = "default_focused_limit")]
    pub focused_limit: usize,

    /// Result limit for comprehensive ("all/every/overview") queries.
    #[serde(default = "default_comprehensive_limit")]
    pub comprehensive_limit: usize,

    /// Neighbor-chunk expansion window (chunks before and after a seed).
    #[serde(default = "default_neighbor_window")]
    pub neighbor_window: i64,

    /// Category used when no classifier bucket scores above zero.
    #[serde(default = "default_category")]
    pub default_category: String,

    /// Keyword-membership trigger: retrieval runs only when the raw
    /// message contains one of these.
    #[serde(default = "default_trigger_keywords")]
    pub trigger_keywords: Vec<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        RetrievalConfig {
            embedding_dimensions: default_embedding_dimensions(),
            focused_limit: default_focused_limit(),
            comprehensive_limit: default_comprehensive_limit(),
            neighbor_window: default_neighbor_window(),
            default_category: default_category(),
            trigger_keywords: default_trigger_keywords(),
        }
    }
}

/// Points-based daily rate limiting.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    #[serde(default = "default_daily_points")]
    pub daily_points: i64,

    #[serde(default = "default_on_topic_cost")]
    pub on_topic_cost: i64,

    #[serde(default = "default_off_topic_cost")]
    pub off_topic_cost: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            daily_points: default_daily_points(),
            on_topic_cost: default_on_topic_cost(),
            off_topic_cost: default_off_topic_cost(),
        }
    }
}

/// OpenAI-compatible provider settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// API key; falls back to `PARLOR_PROVIDER_API_KEY` via the env layer.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            api_key: None,
            base_url: default_base_url(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_agent_name() -> String {
    "parlor".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_system_prompt() -> String {
    "You are a knowledgeable assistant for this portfolio site. Answer \
     from the provided content; when content is supplied with a message, \
     ground your reply in it and include a short rag_summary of what you \
     used. Reply as JSON with fields: reply, off_topic, rag_summary, \
     visitor_notes_update."
        .to_string()
}

fn default_greeting() -> String {
    "Hi! Ask me anything about the projects and experience showcased here.".to_string()
}

fn default_apology() -> String {
    "I'm sorry, I ran into a problem processing that message. Please try again.".to_string()
}

fn default_safety_message() -> String {
    "I can't help with that here, but I'm happy to talk about the work on this site.".to_string()
}

fn default_rate_limited_message() -> String {
    "We've covered a lot today! Come back tomorrow if you have more questions.".to_string()
}

fn default_max_message_chars() -> usize {
    4000
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8490
}

fn default_db_path() -> String {
    "parlor.db".to_string()
}

fn default_hour_secs() -> u64 {
    3600
}

fn default_week_secs() -> u64 {
    7 * 24 * 3600
}

fn default_recent_messages_max() -> usize {
    100
}

fn default_embedding_dimensions() -> usize {
    1536
}

fn default_focused_limit() -> usize {
    5
}

fn default_comprehensive_limit() -> usize {
    14
}

fn default_neighbor_window() -> i64 {
    2
}

fn default_category() -> String {
    "broad_overview".to_string()
}

fn default_trigger_keywords() -> Vec<String> {
    [
        "project", "projects", "portfolio", "built", "build", "app", "application", "experience",
        "background", "career", "skill", "skills", "tech", "technology", "technologies", "stack",
        "work", "about", "resume", "url", "link", "github", "demo", "repository",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_daily_points() -> i64 {
    100
}

fn default_on_topic_cost() -> i64 {
    1
}

fn default_off_topic_cost() -> i64 {
    10
}
