// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD operations.

use parlor_core::{Conversation, ConversationStatus, ParlorError};
use rusqlite::params;

use crate::database::{map_tr_err, Database};

const CONVERSATION_COLS: &str =
    "id, visitor_id, started_at, last_message_at, ended_at, status, model_used, metadata";

fn row_to_conversation(row: &rusqlite::Row<'_>) -> Result<Conversation, rusqlite::Error> {
    let status: String = row.get(5)?;
    Ok(Conversation {
        id: row.get(0)?,
        visitor_id: row.get(1)?,
        started_at: row.get(2)?,
        last_message_at: row.get(3)?,
        ended_at: row.get(4)?,
        status: ConversationStatus::from_str_value(&status),
        model_used: row.get(6)?,
        metadata: row.get(7)?,
    })
}

/// Insert a new conversation row.
pub async fn create_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), ParlorError> {
    let c = conversation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations (id, visitor_id, started_at, last_message_at, ended_at, status, model_used, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    c.id,
                    c.visitor_id,
                    c.started_at,
                    c.last_message_at,
                    c.ended_at,
                    c.status.as_str(),
                    c.model_used,
                    c.metadata,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a conversation by ID.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, ParlorError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLS} FROM conversations WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], row_to_conversation);
            match result {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// The visitor's most recent conversation that still accepts messages,
/// if any.
pub async fn latest_open_for_visitor(
    db: &Database,
    visitor_id: &str,
) -> Result<Option<Conversation>, ParlorError> {
    let visitor_id = visitor_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLS} FROM conversations
                 WHERE visitor_id = ?1 AND status != 'ended'
                 ORDER BY last_message_at DESC LIMIT 1"
            ))?;
            let result = stmt.query_row(params![visitor_id], row_to_conversation);
            match result {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Set a conversation's status. Caller is responsible for checking the
/// transition is legal; `ended` also stamps ended_at.
pub async fn update_status(
    db: &Database,
    id: &str,
    status: ConversationStatus,
    at: &str,
) -> Result<(), ParlorError> {
    let id = id.to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            if status == ConversationStatus::Ended {
                conn.execute(
                    "UPDATE conversations SET status = ?1, ended_at = ?2 WHERE id = ?3",
                    params![status.as_str(), at, id],
                )?;
            } else {
                conn.execute(
                    "UPDATE conversations SET status = ?1 WHERE id = ?2",
                    params![status.as_str(), id],
                )?;
            }
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Replace a conversation's metadata JSON.
pub async fn update_metadata(
    db: &Database,
    id: &str,
    metadata: Option<&str>,
) -> Result<(), ParlorError> {
    let id = id.to_string();
    let metadata = metadata.map(|m| m.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET metadata = ?1 WHERE id = ?2",
                params![metadata, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Bump last_message_at after appending a message.
pub async fn bump_last_message_at(
    db: &Database,
    id: &str,
    at: &str,
) -> Result<(), ParlorError> {
    let id = id.to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET last_message_at = ?1 WHERE id = ?2",
                params![at, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// List conversations still open whose last activity predates `cutoff`.
/// Feeds the idle sweep.
pub async fn list_idle_open(
    db: &Database,
    cutoff: &str,
) -> Result<Vec<Conversation>, ParlorError> {
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLS} FROM conversations
                 WHERE status != 'ended' AND last_message_at < ?1
                 ORDER BY last_message_at ASC"
            ))?;
            let rows = stmt
                .query_map(params![cutoff], row_to_conversation)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}
