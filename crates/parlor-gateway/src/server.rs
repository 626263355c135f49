// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use parlor_agent::Orchestrator;
use parlor_config::GatewayConfig;
use parlor_core::ParlorError;

use crate::handlers;
use crate::registry::ConnectionRegistry;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Per-turn conversation orchestrator.
    pub orchestrator: Arc<Orchestrator>,
    /// Live WebSocket connection registry.
    pub registry: ConnectionRegistry,
    /// Process start time for uptime reporting.
    pub start_time: Instant,
}

impl GatewayState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        GatewayState {
            orchestrator,
            registry: ConnectionRegistry::new(),
            start_time: Instant::now(),
        }
    }
}

/// Build the gateway router.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/ws/stats", get(handlers::get_ws_stats))
        .route("/ws/chat", get(ws::ws_handler))
        .route("/v1/visitors/identify", post(handlers::post_identify))
        .route(
            "/v1/conversations/{id}/messages",
            post(handlers::post_messages).get(handlers::get_messages),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the gateway HTTP/WebSocket server.
///
/// Binds to the configured host:port and serves until shutdown:
/// - POST /v1/visitors/identify
/// - POST/GET /v1/conversations/{id}/messages
/// - GET /ws/chat (upgrade), GET /ws/stats
/// - GET /health
pub async fn start_server(
    config: &GatewayConfig,
    state: GatewayState,
) -> Result<(), ParlorError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ParlorError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| ParlorError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
