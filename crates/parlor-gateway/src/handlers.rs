// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Handles visitor identification, the non-streaming message endpoint,
//! message history, connection stats, and health.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use parlor_core::{Message, ParlorError};

use crate::server::GatewayState;

/// Request body for POST /v1/visitors/identify.
#[derive(Debug, Deserialize)]
pub struct IdentifyRequest {
    /// Browser fingerprint or other stable client identifier.
    pub fingerprint: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub ip_hash: Option<String>,
}

/// Response body for POST /v1/visitors/identify.
#[derive(Debug, Serialize)]
pub struct IdentifyResponse {
    pub visitor_id: String,
    pub is_new: bool,
}

/// Request body for POST /v1/conversations/{id}/messages.
#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub visitor_id: String,
    pub content: String,
}

/// A message as rendered on the wire.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub id: String,
    pub content: String,
    pub sender_type: &'static str,
    pub timestamp: String,
}

impl MessageBody {
    pub fn from_message(message: &Message) -> Self {
        MessageBody {
            id: message.id.clone(),
            content: message.content.clone(),
            sender_type: message.sender_type.as_str(),
            timestamp: message.timestamp.clone(),
        }
    }
}

/// Response body for POST /v1/conversations/{id}/messages.
#[derive(Debug, Serialize)]
pub struct PostMessageResponse {
    pub user_message: MessageBody,
    pub assistant_message: MessageBody,
}

/// Query parameters for GET /v1/conversations/{id}/messages.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    50
}

/// Response body for GET /v1/conversations/{id}/messages.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<MessageBody>,
}

/// Response body for GET /ws/stats.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub active_connections: usize,
    pub active_conversations: usize,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(e: ParlorError) -> Response {
    let status = match &e {
        ParlorError::Validation(_) => StatusCode::BAD_REQUEST,
        ParlorError::NotFound { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %e, "request failed");
    }
    (status, Json(ErrorResponse { error: e.to_string() })).into_response()
}

/// POST /v1/visitors/identify
pub async fn post_identify(
    State(state): State<GatewayState>,
    Json(body): Json<IdentifyRequest>,
) -> Response {
    if body.fingerprint.trim().is_empty() {
        return error_response(ParlorError::Validation("fingerprint is empty".into()));
    }
    match state
        .orchestrator
        .visitors()
        .identify(
            &body.fingerprint,
            body.user_agent.as_deref(),
            body.ip_hash.as_deref(),
        )
        .await
    {
        Ok((visitor, is_new)) => (
            StatusCode::OK,
            Json(IdentifyResponse {
                visitor_id: visitor.id,
                is_new,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /v1/conversations/{id}/messages
///
/// Runs one full turn and returns both persisted messages.
pub async fn post_messages(
    State(state): State<GatewayState>,
    Path(conversation_id): Path<String>,
    Json(body): Json<PostMessageRequest>,
) -> Response {
    let outcome = state
        .orchestrator
        .handle_message(&conversation_id, &body.visitor_id, &body.content)
        .await;
    match outcome {
        Ok(outcome) => (
            StatusCode::OK,
            Json(PostMessageResponse {
                user_message: MessageBody::from_message(&outcome.user_message),
                assistant_message: MessageBody::from_message(&outcome.assistant_message),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /v1/conversations/{id}/messages?limit=
pub async fn get_messages(
    State(state): State<GatewayState>,
    Path(conversation_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    if query.limit == 0 {
        return error_response(ParlorError::Validation("limit must be positive".into()));
    }
    match state
        .orchestrator
        .messages()
        .list(&conversation_id, query.limit)
        .await
    {
        Ok(messages) => (
            StatusCode::OK,
            Json(HistoryResponse {
                messages: messages.iter().map(MessageBody::from_message).collect(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /ws/stats
pub async fn get_ws_stats(State(state): State<GatewayState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        active_connections: state.registry.connection_count(),
        active_conversations: state.registry.conversation_count(),
    })
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
