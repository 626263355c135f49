// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message persistence with a cache of the recent window.
//!
//! The durable insert always happens first; only then is the cache
//! updated (`message:{id}` hash plus a timestamp-scored set of recent
//! ids per conversation, trimmed to the configured window). Reads
//! prefer the cache and fall back to the store on any gap.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parlor_cache::MemoryCache;
use parlor_config::CacheConfig;
use parlor_core::{new_id, now_rfc3339, Message, ParlorError, SenderType};
use parlor_storage::queries::{conversations as conversation_queries, messages as message_queries};
use parlor_storage::Database;

fn message_key(message_id: &str) -> String {
    format!("message:{message_id}")
}

fn index_key(conversation_id: &str) -> String {
    format!("conv_messages:{conversation_id}")
}

fn to_fields(message: &Message) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    fields.insert("id".into(), message.id.clone());
    fields.insert("conversation_id".into(), message.conversation_id.clone());
    fields.insert("sender_type".into(), message.sender_type.as_str().to_string());
    fields.insert("content".into(), message.content.clone());
    fields.insert("timestamp".into(), message.timestamp.clone());
    if let Some(human_agent_id) = &message.human_agent_id {
        fields.insert("human_agent_id".into(), human_agent_id.clone());
    }
    if let Some(metadata) = &message.metadata {
        fields.insert("metadata".into(), metadata.clone());
    }
    fields
}

fn from_fields(fields: &HashMap<String, String>) -> Option<Message> {
    Some(Message {
        id: fields.get("id")?.clone(),
        conversation_id: fields.get("conversation_id")?.clone(),
        sender_type: SenderType::from_str_value(fields.get("sender_type")?),
        human_agent_id: fields.get("human_agent_id").cloned(),
        content: fields.get("content")?.clone(),
        timestamp: fields.get("timestamp")?.clone(),
        metadata: fields.get("metadata").cloned(),
    })
}

fn timestamp_score(timestamp: &str) -> f64 {
    chrono::DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.timestamp_millis() as f64)
        .unwrap_or(0.0)
}

#[derive(Clone)]
pub struct MessageService {
    db: Database,
    cache: Arc<MemoryCache>,
    ttl: Duration,
    window: usize,
}

impl MessageService {
    pub fn new(db: Database, cache: Arc<MemoryCache>, config: &CacheConfig) -> Self {
        Self {
            db,
            cache,
            ttl: Duration::from_secs(config.message_ttl_secs),
            window: config.recent_messages_max,
        }
    }

    /// Append a message to an open conversation.
    pub async fn append(
        &self,
        conversation_id: &str,
        sender_type: SenderType,
        content: &str,
        human_agent_id: Option<&str>,
        metadata: Option<&str>,
    ) -> Result<Message, ParlorError> {
        let conversation = conversation_queries::get_conversation(&self.db, conversation_id)
            .await?
            .ok_or_else(|| ParlorError::NotFound {
                entity: "conversation",
                id: conversation_id.to_string(),
            })?;
        if !conversation.status.is_open() {
            return Err(ParlorError::Validation(format!(
                "conversation {conversation_id} is ended"
            )));
        }

        let message = Message {
            id: new_id(),
            conversation_id: conversation_id.to_string(),
            sender_type,
            human_agent_id: human_agent_id.map(String::from),
            content: content.to_string(),
            timestamp: now_rfc3339(),
            metadata: metadata.map(String::from),
        };
        // durable first; the cache is best-effort after
        message_queries::insert_message(&self.db, &message).await?;
        conversation_queries::bump_last_message_at(&self.db, conversation_id, &message.timestamp)
            .await?;
        self.cache_put(&message);
        // keep the cached conversation hash in step
        self.cache.hset(
            &format!("active_conv:{conversation_id}"),
            "last_message_at",
            &message.timestamp,
        );
        Ok(message)
    }

    /// The most recent `limit` messages, oldest first.
    ///
    /// Served from the cache when the recent window fully covers the
    /// request; any gap falls back to the store and repopulates.
    pub async fn list(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, ParlorError> {
        if let Some(messages) = self.list_from_cache(conversation_id, limit) {
            tracing::debug!(conversation_id, count = messages.len(), "message cache hit");
            return Ok(messages);
        }

        // repopulate the full window so later larger reads hit too
        let messages =
            message_queries::recent_messages(&self.db, conversation_id, limit.max(self.window))
                .await?;
        for message in &messages {
            self.cache_put(message);
        }
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }

    fn list_from_cache(&self, conversation_id: &str, limit: usize) -> Option<Vec<Message>> {
        let index = index_key(conversation_id);
        let ids = self.cache.zrange_all(&index)?;
        // a shorter index than the request may be a partial window;
        // only an index that covers the request can serve it
        if ids.is_empty() || ids.len() < limit {
            return None;
        }
        let start = ids.len().saturating_sub(limit);
        let mut messages = Vec::with_capacity(ids.len() - start);
        for id in &ids[start..] {
            let fields = self.cache.hgetall(&message_key(id))?;
            self.cache.expire(&message_key(id), self.ttl);
            messages.push(from_fields(&fields)?);
        }
        self.cache.expire(&index, self.ttl);
        Some(messages)
    }

    pub async fn count(&self, conversation_id: &str) -> Result<i64, ParlorError> {
        message_queries::count_messages(&self.db, conversation_id).await
    }

    fn cache_put(&self, message: &Message) {
        self.cache
            .hset_all(&message_key(&message.id), to_fields(message), Some(self.ttl));
        let index = index_key(&message.conversation_id);
        self.cache
            .zadd(&index, timestamp_score(&message.timestamp), &message.id);
        self.cache.ztrim_keep_last(&index, self.window);
        self.cache.expire(&index, self.ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversations::ConversationService;
    use crate::visitors::VisitorService;

    async fn setup() -> (MessageService, ConversationService, String) {
        let db = Database::open_in_memory().await.unwrap();
        let cache = Arc::new(MemoryCache::new());
        let config = CacheConfig::default();
        let visitors = VisitorService::new(db.clone(), cache.clone(), &config);
        let conversations = ConversationService::new(db.clone(), cache.clone(), &config);
        let (visitor, _) = visitors.identify("fp-msg", None, None).await.unwrap();
        let conversation = conversations
            .get_or_create(&visitor.id, None, "conn-1")
            .await
            .unwrap();
        (
            MessageService::new(db, cache, &config),
            conversations,
            conversation.id,
        )
    }

    #[tokio::test]
    async fn two_appends_update_count_and_activity() {
        let (svc, conversations, conversation_id) = setup().await;
        let first = svc
            .append(&conversation_id, SenderType::Visitor, "hello", None, None)
            .await
            .unwrap();
        let second = svc
            .append(&conversation_id, SenderType::Ai, "hi there", None, None)
            .await
            .unwrap();

        assert_eq!(svc.count(&conversation_id).await.unwrap(), 2);
        assert!(second.timestamp >= first.timestamp);

        let conversation = conversations.get(&conversation_id).await.unwrap();
        assert_eq!(conversation.last_message_at, second.timestamp);
    }

    #[tokio::test]
    async fn list_is_ordered_from_cache() {
        let (svc, _, conversation_id) = setup().await;
        for content in ["one", "two", "three"] {
            svc.append(&conversation_id, SenderType::Visitor, content, None, None)
                .await
                .unwrap();
        }

        let messages = svc.list(&conversation_id, 3).await.unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
        for pair in messages.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn list_falls_back_to_store_after_cache_loss() {
        let (svc, _, conversation_id) = setup().await;
        for content in ["one", "two"] {
            svc.append(&conversation_id, SenderType::Visitor, content, None, None)
                .await
                .unwrap();
        }
        svc.cache.delete(&index_key(&conversation_id));

        let messages = svc.list(&conversation_id, 10).await.unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two"]);

        // repopulated: the next covering read is served from cache
        assert!(svc.list_from_cache(&conversation_id, 2).is_some());
    }

    #[tokio::test]
    async fn partial_index_never_truncates_larger_reads() {
        let (svc, _, conversation_id) = setup().await;
        for content in ["one", "two", "three", "four", "five"] {
            svc.append(&conversation_id, SenderType::Visitor, content, None, None)
                .await
                .unwrap();
        }
        svc.cache.delete(&index_key(&conversation_id));

        // a small read after cache loss must not pin later reads to
        // its own window
        let tail = svc.list(&conversation_id, 2).await.unwrap();
        let contents: Vec<_> = tail.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["four", "five"]);

        let all = svc.list(&conversation_id, 10).await.unwrap();
        let contents: Vec<_> = all.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three", "four", "five"]);
    }

    #[tokio::test]
    async fn cache_hit_refreshes_the_index_deadline() {
        let (svc, _, conversation_id) = setup().await;
        for content in ["one", "two"] {
            svc.append(&conversation_id, SenderType::Visitor, content, None, None)
                .await
                .unwrap();
        }

        // shrink the deadline, then a hit restores the full TTL
        let index = index_key(&conversation_id);
        assert!(svc.cache.expire(&index, Duration::from_secs(5)));
        svc.list(&conversation_id, 2).await.unwrap();
        assert!(svc.cache.ttl(&index).unwrap() > Duration::from_secs(5));
    }

    #[tokio::test]
    async fn list_limit_returns_newest_window() {
        let (svc, _, conversation_id) = setup().await;
        for content in ["one", "two", "three", "four"] {
            svc.append(&conversation_id, SenderType::Visitor, content, None, None)
                .await
                .unwrap();
        }

        let messages = svc.list(&conversation_id, 2).await.unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["three", "four"]);
    }

    #[tokio::test]
    async fn append_to_ended_conversation_is_rejected() {
        let (svc, conversations, conversation_id) = setup().await;
        conversations.end(&conversation_id).await.unwrap();

        let err = svc
            .append(&conversation_id, SenderType::Visitor, "late", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ParlorError::Validation(_)));
    }

    #[tokio::test]
    async fn recent_window_is_trimmed() {
        let db = Database::open_in_memory().await.unwrap();
        let cache = Arc::new(MemoryCache::new());
        let mut config = CacheConfig::default();
        config.recent_messages_max = 3;
        let visitors = VisitorService::new(db.clone(), cache.clone(), &config);
        let conversations = ConversationService::new(db.clone(), cache.clone(), &config);
        let (visitor, _) = visitors.identify("fp-trim", None, None).await.unwrap();
        let conversation = conversations
            .get_or_create(&visitor.id, None, "conn-1")
            .await
            .unwrap();
        let svc = MessageService::new(db, cache.clone(), &config);

        for i in 0..5 {
            svc.append(&conversation.id, SenderType::Visitor, &format!("m{i}"), None, None)
                .await
                .unwrap();
        }
        assert_eq!(cache.zcard(&index_key(&conversation.id)), 3);

        // full history still lives in the store
        assert_eq!(svc.count(&conversation.id).await.unwrap(), 5);
    }
}
