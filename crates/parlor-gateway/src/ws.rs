// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket chat handler.
//!
//! Client -> Server (JSON):
//! ```json
//! {"type": "user_message", "content": "what projects have you built?"}
//! {"type": "heartbeat"}
//! ```
//!
//! Server -> Client (JSON):
//! ```json
//! {"type": "message_received", "message": {...}}
//! {"type": "typing"}
//! {"type": "ai_response", "message": {...}}
//! {"type": "heartbeat_ack", "timestamp": "..."}
//! {"type": "error", "error": "..."}
//! ```

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use parlor_core::now_rfc3339;

use crate::handlers::MessageBody;
use crate::server::GatewayState;

/// Query parameters for the /ws/chat upgrade.
#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub visitor_id: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// WebSocket frame from the client.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Incoming {
    UserMessage { content: String },
    Heartbeat,
}

/// WebSocket frame to the client.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Outgoing {
    MessageReceived { message: MessageBody },
    Typing,
    AiResponse { message: MessageBody },
    HeartbeatAck { timestamp: String },
    Error { error: String },
}

impl Outgoing {
    fn to_frame(&self) -> String {
        // serialization of these variants cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// WebSocket upgrade handler for GET /ws/chat.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<ChatQuery>,
    State(state): State<GatewayState>,
) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state, query))
}

/// Drive one WebSocket connection until it closes.
///
/// Resolves the conversation, registers the connection, spawns a
/// sender task for outbound frames, and loops over inbound frames.
async fn handle_socket(socket: WebSocket, state: GatewayState, query: ChatQuery) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let connection_id = uuid::Uuid::new_v4().to_string();

    let conversation = match state
        .orchestrator
        .conversations()
        .get_or_create(
            &query.visitor_id,
            query.conversation_id.as_deref(),
            &connection_id,
        )
        .await
    {
        Ok(conversation) => conversation,
        Err(e) => {
            tracing::warn!(visitor_id = %query.visitor_id, error = %e, "ws setup failed");
            let frame = Outgoing::Error {
                error: e.to_string(),
            }
            .to_frame();
            let _ = ws_sender.send(WsMessage::Text(frame.into())).await;
            return;
        }
    };
    let conversation_id = conversation.id.clone();

    let (tx, mut rx) = mpsc::channel::<String>(64);
    state.registry.register(&connection_id, &conversation_id, tx);
    tracing::info!(
        connection_id,
        conversation_id,
        visitor_id = %query.visitor_id,
        "websocket connected"
    );

    let sender_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(WsMessage::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            WsMessage::Text(text) => {
                let incoming: Incoming = match serde_json::from_str(&text) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::debug!(connection_id, error = %e, "unparseable ws frame");
                        let frame = Outgoing::Error {
                            error: "invalid frame".to_string(),
                        }
                        .to_frame();
                        state.registry.send_to(&connection_id, frame).await;
                        continue;
                    }
                };
                match incoming {
                    Incoming::UserMessage { content } => {
                        handle_user_message(
                            &state,
                            &connection_id,
                            &conversation_id,
                            &query.visitor_id,
                            &content,
                        )
                        .await;
                    }
                    Incoming::Heartbeat => {
                        let frame = Outgoing::HeartbeatAck {
                            timestamp: now_rfc3339(),
                        }
                        .to_frame();
                        state.registry.send_to(&connection_id, frame).await;
                    }
                }
            }
            WsMessage::Close(_) => break,
            _ => {} // binary and ping/pong frames are ignored
        }
    }

    state.registry.unregister(&connection_id);
    sender_task.abort();
    if let Err(e) = state
        .orchestrator
        .conversations()
        .mark_disconnected(&conversation_id)
        .await
    {
        tracing::warn!(conversation_id, error = %e, "disconnect update failed");
    }
    tracing::info!(connection_id, conversation_id, "websocket disconnected");
}

/// Run one chat turn and fan the resulting frames out to every
/// connection attached to the conversation.
async fn handle_user_message(
    state: &GatewayState,
    connection_id: &str,
    conversation_id: &str,
    visitor_id: &str,
    content: &str,
) {
    state
        .registry
        .send_to_conversation(conversation_id, &Outgoing::Typing.to_frame(), None)
        .await;

    let outcome = state
        .orchestrator
        .handle_message(conversation_id, visitor_id, content)
        .await;
    match outcome {
        Ok(outcome) => {
            let received = Outgoing::MessageReceived {
                message: MessageBody::from_message(&outcome.user_message),
            }
            .to_frame();
            state
                .registry
                .send_to_conversation(conversation_id, &received, None)
                .await;

            let response = Outgoing::AiResponse {
                message: MessageBody::from_message(&outcome.assistant_message),
            }
            .to_frame();
            state
                .registry
                .send_to_conversation(conversation_id, &response, None)
                .await;
        }
        Err(e) => {
            let frame = Outgoing::Error {
                error: e.to_string(),
            }
            .to_frame();
            state.registry.send_to(connection_id, frame).await;
        }
    }
}

/// WebSocket frame type constants for server -> client messages.
pub mod message_types {
    /// Echo of the persisted user message.
    pub const MESSAGE_RECEIVED: &str = "message_received";
    /// Assistant is working.
    pub const TYPING: &str = "typing";
    /// Completed assistant message.
    pub const AI_RESPONSE: &str = "ai_response";
    /// Heartbeat acknowledgement.
    pub const HEARTBEAT_ACK: &str = "heartbeat_ack";
    /// Turn-level error.
    pub const ERROR: &str = "error";
}
