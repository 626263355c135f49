// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parlor serve` command implementation.
//!
//! Wires the durable store, cache tier, retrieval engine, session
//! services, rate limiter, provider client, and orchestrator together,
//! then serves the HTTP/WebSocket gateway until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use parlor_agent::{Orchestrator, RateLimiter};
use parlor_cache::MemoryCache;
use parlor_config::ParlorConfig;
use parlor_core::ParlorError;
use parlor_gateway::GatewayState;
use parlor_openai::OpenAiClient;
use parlor_retrieval::{QueryExpander, RetrievalEngine};
use parlor_session::{ConversationService, MessageService, VisitorService};
use parlor_storage::Database;

/// How often the idle-conversation sweeper runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// Runs the `parlor serve` command.
pub async fn run_serve(config: ParlorConfig) -> Result<(), ParlorError> {
    init_tracing(&config.agent.log_level);

    info!("starting parlor serve");

    let db = Database::open(&config.storage.path).await?;
    info!(path = %config.storage.path, "store ready");

    let cache = Arc::new(MemoryCache::new());

    let visitors = VisitorService::new(db.clone(), cache.clone(), &config.cache);
    let conversations = ConversationService::new(db.clone(), cache.clone(), &config.cache);
    let messages = MessageService::new(db.clone(), cache.clone(), &config.cache);

    let api_key = config
        .provider
        .api_key
        .as_deref()
        .ok_or_else(|| ParlorError::Config("provider.api_key is not set".into()))?;
    let client = Arc::new(OpenAiClient::new(
        api_key,
        &config.provider.base_url,
        &config.provider.chat_model,
        &config.provider.embedding_model,
    )?);

    let orchestrator = Arc::new(Orchestrator::new(
        config.agent.clone(),
        config.provider.chat_model.clone(),
        RetrievalEngine::new(db.clone(), config.retrieval.clone()),
        QueryExpander::new(db.clone()),
        client.clone(),
        client,
        visitors,
        conversations,
        messages,
        RateLimiter::new(cache.clone(), config.rate_limit.clone()),
    )?);

    spawn_idle_sweeper(orchestrator.clone(), config.cache.conversation_ttl_secs);

    let state = GatewayState::new(orchestrator);
    let gateway_config = config.gateway.clone();
    tokio::select! {
        result = parlor_gateway::start_server(&gateway_config, state) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    }
}

/// Periodically ends conversations with no activity past the horizon
/// and drops their in-memory transcripts.
fn spawn_idle_sweeper(orchestrator: Arc<Orchestrator>, idle_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let cutoff = (chrono::Utc::now()
                - chrono::Duration::seconds(idle_secs as i64))
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
            match orchestrator.conversations().sweep_idle(&cutoff).await {
                Ok(swept) => {
                    for conversation_id in &swept {
                        orchestrator.forget_transcript(conversation_id);
                    }
                    if !swept.is_empty() {
                        info!(count = swept.len(), "ended idle conversations");
                    }
                }
                Err(e) => warn!(error = %e, "idle sweep failed"),
            }
        }
    });
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parlor={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
