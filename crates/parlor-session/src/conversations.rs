// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation lifecycle management.
//!
//! Status only moves forward (active_ai -> escalated -> active_human ->
//! ended). Transport-level connect/disconnect lives in the metadata
//! JSON and never touches status.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parlor_cache::MemoryCache;
use parlor_config::CacheConfig;
use parlor_core::{new_id, now_rfc3339, Conversation, ConversationStatus, ParlorError};
use parlor_storage::queries::conversations as conversation_queries;
use parlor_storage::Database;

fn cache_key(conversation_id: &str) -> String {
    format!("active_conv:{conversation_id}")
}

fn to_fields(conversation: &Conversation) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    fields.insert("id".into(), conversation.id.clone());
    fields.insert("visitor_id".into(), conversation.visitor_id.clone());
    fields.insert("started_at".into(), conversation.started_at.clone());
    fields.insert("last_message_at".into(), conversation.last_message_at.clone());
    fields.insert("status".into(), conversation.status.as_str().to_string());
    if let Some(ended_at) = &conversation.ended_at {
        fields.insert("ended_at".into(), ended_at.clone());
    }
    if let Some(model_used) = &conversation.model_used {
        fields.insert("model_used".into(), model_used.clone());
    }
    if let Some(metadata) = &conversation.metadata {
        fields.insert("metadata".into(), metadata.clone());
    }
    fields
}

fn from_fields(fields: &HashMap<String, String>) -> Option<Conversation> {
    Some(Conversation {
        id: fields.get("id")?.clone(),
        visitor_id: fields.get("visitor_id")?.clone(),
        started_at: fields.get("started_at")?.clone(),
        last_message_at: fields.get("last_message_at")?.clone(),
        ended_at: fields.get("ended_at").cloned(),
        status: ConversationStatus::from_str_value(fields.get("status")?),
        model_used: fields.get("model_used").cloned(),
        metadata: fields.get("metadata").cloned(),
    })
}

#[derive(Clone)]
pub struct ConversationService {
    db: Database,
    cache: Arc<MemoryCache>,
    ttl: Duration,
}

impl ConversationService {
    pub fn new(db: Database, cache: Arc<MemoryCache>, config: &CacheConfig) -> Self {
        Self {
            db,
            cache,
            ttl: Duration::from_secs(config.conversation_ttl_secs),
        }
    }

    /// Resolve the conversation for a connecting visitor.
    ///
    /// An explicit id is reused only when it exists, belongs to this
    /// visitor, and is still open; otherwise (and when no id is given)
    /// the visitor's most recent open conversation is resumed, or a
    /// fresh one is created. The winning conversation gets its metadata
    /// stamped with the connection.
    pub async fn get_or_create(
        &self,
        visitor_id: &str,
        conversation_id: Option<&str>,
        connection_id: &str,
    ) -> Result<Conversation, ParlorError> {
        if let Some(id) = conversation_id {
            match self.get(id).await {
                Ok(conversation)
                    if conversation.visitor_id == visitor_id
                        && conversation.status.is_open() =>
                {
                    return self.mark_connected(conversation, connection_id).await;
                }
                Ok(conversation) => {
                    tracing::warn!(
                        conversation_id = id,
                        visitor_id,
                        owner = %conversation.visitor_id,
                        status = conversation.status.as_str(),
                        "requested conversation not reusable; starting fresh"
                    );
                }
                Err(ParlorError::NotFound { .. }) => {
                    tracing::debug!(conversation_id = id, "requested conversation unknown");
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(open) =
            conversation_queries::latest_open_for_visitor(&self.db, visitor_id).await?
        {
            return self.mark_connected(open, connection_id).await;
        }

        let now = now_rfc3339();
        let conversation = Conversation {
            id: new_id(),
            visitor_id: visitor_id.to_string(),
            started_at: now.clone(),
            last_message_at: now,
            ended_at: None,
            status: ConversationStatus::ActiveAi,
            model_used: None,
            metadata: None,
        };
        conversation_queries::create_conversation(&self.db, &conversation).await?;
        tracing::info!(conversation_id = %conversation.id, visitor_id, "conversation created");
        self.mark_connected(conversation, connection_id).await
    }

    /// Cache-aside read. A hit refreshes the entry's TTL.
    pub async fn get(&self, conversation_id: &str) -> Result<Conversation, ParlorError> {
        let key = cache_key(conversation_id);
        if let Some(fields) = self.cache.hgetall(&key) {
            if let Some(conversation) = from_fields(&fields) {
                self.cache.expire(&key, self.ttl);
                return Ok(conversation);
            }
            self.cache.delete(&key);
        }

        let conversation = conversation_queries::get_conversation(&self.db, conversation_id)
            .await?
            .ok_or_else(|| ParlorError::NotFound {
                entity: "conversation",
                id: conversation_id.to_string(),
            })?;
        self.cache_put(&conversation);
        Ok(conversation)
    }

    /// Record the live connection in the conversation metadata,
    /// leaving unrelated metadata fields alone.
    async fn mark_connected(
        &self,
        mut conversation: Conversation,
        connection_id: &str,
    ) -> Result<Conversation, ParlorError> {
        let mut meta = conversation
            .metadata
            .as_deref()
            .and_then(|m| serde_json::from_str::<serde_json::Value>(m).ok())
            .unwrap_or_else(|| serde_json::json!({}));
        meta["current_connection_id"] = serde_json::Value::String(connection_id.to_string());
        meta["connection_status"] = serde_json::Value::String("connected".to_string());
        let metadata = meta.to_string();
        conversation_queries::update_metadata(&self.db, &conversation.id, Some(&metadata)).await?;
        conversation.metadata = Some(metadata);
        self.cache_put(&conversation);
        Ok(conversation)
    }

    /// Record the disconnect. Status is untouched: a dropped socket is
    /// not an ended conversation.
    pub async fn mark_disconnected(&self, conversation_id: &str) -> Result<(), ParlorError> {
        let mut conversation = self.get(conversation_id).await?;
        let mut meta = conversation
            .metadata
            .as_deref()
            .and_then(|m| serde_json::from_str::<serde_json::Value>(m).ok())
            .unwrap_or_else(|| serde_json::json!({}));
        meta["connection_status"] = serde_json::Value::String("disconnected".to_string());
        let metadata = meta.to_string();
        conversation_queries::update_metadata(&self.db, conversation_id, Some(&metadata)).await?;
        conversation.metadata = Some(metadata);
        self.cache_put(&conversation);
        Ok(())
    }

    /// Move a conversation to `next`, rejecting backward transitions.
    pub async fn transition(
        &self,
        conversation_id: &str,
        next: ConversationStatus,
    ) -> Result<Conversation, ParlorError> {
        let mut conversation = self.get(conversation_id).await?;
        if !conversation.status.can_transition_to(next) {
            return Err(ParlorError::Validation(format!(
                "illegal status transition {} -> {}",
                conversation.status.as_str(),
                next.as_str()
            )));
        }
        let now = now_rfc3339();
        conversation_queries::update_status(&self.db, conversation_id, next, &now).await?;
        conversation.status = next;
        if next == ConversationStatus::Ended {
            conversation.ended_at = Some(now);
            self.cache.delete(&cache_key(conversation_id));
        } else {
            self.cache_put(&conversation);
        }
        Ok(conversation)
    }

    /// End a conversation.
    pub async fn end(&self, conversation_id: &str) -> Result<Conversation, ParlorError> {
        self.transition(conversation_id, ConversationStatus::Ended)
            .await
    }

    /// End every open conversation whose last activity predates `cutoff`.
    /// Returns the ids that were closed.
    pub async fn sweep_idle(&self, cutoff: &str) -> Result<Vec<String>, ParlorError> {
        let idle = conversation_queries::list_idle_open(&self.db, cutoff).await?;
        let mut swept = Vec::with_capacity(idle.len());
        for conversation in idle {
            self.end(&conversation.id).await?;
            swept.push(conversation.id);
        }
        if !swept.is_empty() {
            tracing::info!(count = swept.len(), cutoff, "idle conversations swept");
        }
        Ok(swept)
    }

    fn cache_put(&self, conversation: &Conversation) {
        self.cache.hset_all(
            &cache_key(&conversation.id),
            to_fields(conversation),
            Some(self.ttl),
        );
    }
}
