// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message persistence. Messages are append-only; ordering is by the
//! RFC 3339 `timestamp` column, which sorts lexicographically.

use parlor_core::{Message, ParlorError, SenderType};
use rusqlite::params;

use crate::database::{map_tr_err, Database};

const MESSAGE_COLS: &str =
    "id, conversation_id, sender_type, human_agent_id, content, timestamp, metadata";

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<Message, rusqlite::Error> {
    let sender: String = row.get(2)?;
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_type: SenderType::from_str_value(&sender),
        human_agent_id: row.get(3)?,
        content: row.get(4)?,
        timestamp: row.get(5)?,
        metadata: row.get(6)?,
    })
}

/// Insert a message.
pub async fn insert_message(db: &Database, message: &Message) -> Result<(), ParlorError> {
    let m = message.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, conversation_id, sender_type, human_agent_id, content, timestamp, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    m.id,
                    m.conversation_id,
                    m.sender_type.as_str(),
                    m.human_agent_id,
                    m.content,
                    m.timestamp,
                    m.metadata,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The most recent `limit` messages of a conversation, in chronological
/// order (oldest of the window first).
pub async fn recent_messages(
    db: &Database,
    conversation_id: &str,
    limit: usize,
) -> Result<Vec<Message>, ParlorError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLS} FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY timestamp DESC, rowid DESC LIMIT ?2"
            ))?;
            let mut rows = stmt
                .query_map(params![conversation_id, limit as i64], row_to_message)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.reverse();
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Count messages in a conversation.
pub async fn count_messages(db: &Database, conversation_id: &str) -> Result<i64, ParlorError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
                params![conversation_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::conversations::create_conversation;
    use crate::queries::visitors::create_visitor;
    use parlor_core::{new_id, now_rfc3339, Conversation, ConversationStatus, Visitor};

    async fn setup() -> (Database, String) {
        let db = Database::open_in_memory().await.unwrap();
        let now = now_rfc3339();
        let visitor = Visitor {
            id: new_id(),
            fingerprint: "fp-msg".to_string(),
            first_seen_at: now.clone(),
            last_seen_at: now.clone(),
            user_agent: None,
            ip_hash: None,
            profile_data: None,
            agent_notes: None,
        };
        create_visitor(&db, &visitor).await.unwrap();
        let conv = Conversation {
            id: new_id(),
            visitor_id: visitor.id,
            started_at: now.clone(),
            last_message_at: now,
            ended_at: None,
            status: ConversationStatus::ActiveAi,
            model_used: None,
            metadata: None,
        };
        create_conversation(&db, &conv).await.unwrap();
        (db, conv.id)
    }

    fn make_message(conversation_id: &str, content: &str, timestamp: &str) -> Message {
        Message {
            id: new_id(),
            conversation_id: conversation_id.to_string(),
            sender_type: SenderType::Visitor,
            human_agent_id: None,
            content: content.to_string(),
            timestamp: timestamp.to_string(),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn recent_messages_are_chronological() {
        let (db, conv_id) = setup().await;
        for (content, ts) in [
            ("first", "2026-03-01T10:00:00.000Z"),
            ("second", "2026-03-01T10:00:01.000Z"),
            ("third", "2026-03-01T10:00:02.000Z"),
        ] {
            insert_message(&db, &make_message(&conv_id, content, ts))
                .await
                .unwrap();
        }

        let all = recent_messages(&db, &conv_id, 10).await.unwrap();
        let contents: Vec<_> = all.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn limit_keeps_the_newest_window() {
        let (db, conv_id) = setup().await;
        for i in 0..5 {
            let ts = format!("2026-03-01T10:00:0{i}.000Z");
            insert_message(&db, &make_message(&conv_id, &format!("m{i}"), &ts))
                .await
                .unwrap();
        }

        let window = recent_messages(&db, &conv_id, 2).await.unwrap();
        let contents: Vec<_> = window.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4"]);
        assert_eq!(count_messages(&db, &conv_id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn deleting_a_conversation_cascades_to_its_messages() {
        let (db, conv_id) = setup().await;
        insert_message(
            &db,
            &make_message(&conv_id, "gone with the parent", "2026-03-01T10:00:00.000Z"),
        )
        .await
        .unwrap();

        let id = conv_id.clone();
        db.connection()
            .call(move |conn| {
                conn.execute("DELETE FROM conversations WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
            .unwrap();

        assert_eq!(count_messages(&db, &conv_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_conversation_lists_nothing() {
        let (db, conv_id) = setup().await;
        assert!(recent_messages(&db, &conv_id, 10).await.unwrap().is_empty());
        assert_eq!(count_messages(&db, &conv_id).await.unwrap(), 0);
    }
}
