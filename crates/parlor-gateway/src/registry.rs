// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection registry for WebSocket fan-out.
//!
//! Tracks live connections and their conversation membership so frames
//! can be addressed to one connection or to every connection attached
//! to a conversation. A failed send drops the connection from the
//! registry; the socket task notices its channel closing and exits.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    /// connection_id -> outbound frame channel.
    connections: Arc<DashMap<String, mpsc::Sender<String>>>,
    /// connection_id -> conversation_id.
    connection_conversations: Arc<DashMap<String, String>>,
    /// conversation_id -> member connection ids.
    conversation_connections: Arc<DashMap<String, HashSet<String>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        connection_id: &str,
        conversation_id: &str,
        sender: mpsc::Sender<String>,
    ) {
        self.connections.insert(connection_id.to_string(), sender);
        self.connection_conversations
            .insert(connection_id.to_string(), conversation_id.to_string());
        self.conversation_connections
            .entry(conversation_id.to_string())
            .or_default()
            .insert(connection_id.to_string());
    }

    pub fn unregister(&self, connection_id: &str) {
        self.connections.remove(connection_id);
        let conversation_id = self
            .connection_conversations
            .remove(connection_id)
            .map(|(_, v)| v);
        if let Some(conversation_id) = conversation_id {
            let emptied = match self.conversation_connections.get_mut(&conversation_id) {
                Some(mut members) => {
                    members.remove(connection_id);
                    members.is_empty()
                }
                None => false,
            };
            if emptied {
                self.conversation_connections.remove(&conversation_id);
            }
        }
    }

    pub fn conversation_of(&self, connection_id: &str) -> Option<String> {
        self.connection_conversations
            .get(connection_id)
            .map(|v| v.clone())
    }

    /// Deliver a frame to one connection. Dead connections are evicted.
    pub async fn send_to(&self, connection_id: &str, frame: String) {
        let sender = self.connections.get(connection_id).map(|s| s.clone());
        if let Some(sender) = sender {
            if sender.send(frame).await.is_err() {
                tracing::warn!(connection_id, "send failed; evicting connection");
                self.unregister(connection_id);
            }
        }
    }

    /// Deliver a frame to every connection in a conversation.
    pub async fn send_to_conversation(
        &self,
        conversation_id: &str,
        frame: &str,
        exclude_connection: Option<&str>,
    ) {
        let members: Vec<String> = self
            .conversation_connections
            .get(conversation_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        for connection_id in members {
            if exclude_connection == Some(connection_id.as_str()) {
                continue;
            }
            self.send_to(&connection_id, frame.to_string()).await;
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn conversation_count(&self) -> usize {
        self.conversation_connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_and_deliver() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::channel(4);
        registry.register("c1", "conv-1", tx);

        registry.send_to("c1", "hello".to_string()).await;
        assert_eq!(rx.recv().await.as_deref(), Some("hello"));
        assert_eq!(registry.connection_count(), 1);
        assert_eq!(registry.conversation_of("c1").as_deref(), Some("conv-1"));
    }

    #[tokio::test]
    async fn unregister_clears_empty_conversation() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(4);
        registry.register("c1", "conv-1", tx);
        assert_eq!(registry.conversation_count(), 1);

        registry.unregister("c1");
        assert_eq!(registry.connection_count(), 0);
        assert_eq!(registry.conversation_count(), 0);
        assert!(registry.conversation_of("c1").is_none());
    }

    #[tokio::test]
    async fn conversation_fanout_respects_exclusion() {
        let registry = ConnectionRegistry::new();
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        registry.register("c1", "conv-1", tx1);
        registry.register("c2", "conv-1", tx2);

        registry
            .send_to_conversation("conv-1", "frame", Some("c1"))
            .await;
        assert_eq!(rx2.recv().await.as_deref(), Some("frame"));
        assert!(rx1.try_recv().is_err());
    }

    #[tokio::test]
    async fn dead_connection_is_evicted_on_send() {
        let registry = ConnectionRegistry::new();
        let (tx, rx) = mpsc::channel(1);
        registry.register("c1", "conv-1", tx);
        drop(rx);

        registry.send_to("c1", "frame".to_string()).await;
        assert_eq!(registry.connection_count(), 0);
    }
}
