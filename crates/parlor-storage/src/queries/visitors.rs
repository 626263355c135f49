// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Visitor CRUD operations.

use parlor_core::{ParlorError, Visitor};
use rusqlite::params;

use crate::database::{map_tr_err, Database};

fn row_to_visitor(row: &rusqlite::Row<'_>) -> Result<Visitor, rusqlite::Error> {
    Ok(Visitor {
        id: row.get(0)?,
        fingerprint: row.get(1)?,
        first_seen_at: row.get(2)?,
        last_seen_at: row.get(3)?,
        user_agent: row.get(4)?,
        ip_hash: row.get(5)?,
        profile_data: row.get(6)?,
        agent_notes: row.get(7)?,
    })
}

const VISITOR_COLS: &str =
    "id, fingerprint, first_seen_at, last_seen_at, user_agent, ip_hash, profile_data, agent_notes";

/// Insert a new visitor row.
///
/// Fails with a constraint violation if the fingerprint already exists;
/// callers racing on the same fingerprint recover by re-reading.
pub async fn create_visitor(db: &Database, visitor: &Visitor) -> Result<(), ParlorError> {
    let visitor = visitor.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO visitors (id, fingerprint, first_seen_at, last_seen_at, user_agent, ip_hash, profile_data, agent_notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    visitor.id,
                    visitor.fingerprint,
                    visitor.first_seen_at,
                    visitor.last_seen_at,
                    visitor.user_agent,
                    visitor.ip_hash,
                    visitor.profile_data,
                    visitor.agent_notes,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a visitor by ID.
pub async fn get_visitor(db: &Database, id: &str) -> Result<Option<Visitor>, ParlorError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {VISITOR_COLS} FROM visitors WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], row_to_visitor);
            match result {
                Ok(visitor) => Ok(Some(visitor)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Look up a visitor by fingerprint.
pub async fn get_visitor_by_fingerprint(
    db: &Database,
    fingerprint: &str,
) -> Result<Option<Visitor>, ParlorError> {
    let fingerprint = fingerprint.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {VISITOR_COLS} FROM visitors WHERE fingerprint = ?1"
            ))?;
            let result = stmt.query_row(params![fingerprint], row_to_visitor);
            match result {
                Ok(visitor) => Ok(Some(visitor)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Bump a visitor's last_seen_at.
pub async fn touch_visitor(db: &Database, id: &str, seen_at: &str) -> Result<(), ParlorError> {
    let id = id.to_string();
    let seen_at = seen_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE visitors SET last_seen_at = ?1 WHERE id = ?2",
                params![seen_at, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Replace a visitor's agent_notes.
pub async fn update_agent_notes(
    db: &Database,
    id: &str,
    notes: &str,
) -> Result<(), ParlorError> {
    let id = id.to_string();
    let notes = notes.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE visitors SET agent_notes = ?1 WHERE id = ?2",
                params![notes, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Replace a visitor's profile_data JSON.
pub async fn update_profile_data(
    db: &Database,
    id: &str,
    profile_data: &str,
) -> Result<(), ParlorError> {
    let id = id.to_string();
    let profile_data = profile_data.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE visitors SET profile_data = ?1 WHERE id = ?2",
                params![profile_data, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_core::{new_id, now_rfc3339};

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn make_visitor(fingerprint: &str) -> Visitor {
        let now = now_rfc3339();
        Visitor {
            id: new_id(),
            fingerprint: fingerprint.to_string(),
            first_seen_at: now.clone(),
            last_seen_at: now,
            user_agent: Some("test-agent".to_string()),
            ip_hash: None,
            profile_data: None,
            agent_notes: None,
        }
    }

    #[tokio::test]
    async fn create_and_lookup_by_fingerprint() {
        let db = setup_db().await;
        let visitor = make_visitor("fp-1");
        create_visitor(&db, &visitor).await.unwrap();

        let found = get_visitor_by_fingerprint(&db, "fp-1").await.unwrap();
        assert_eq!(found.unwrap().id, visitor.id);

        let missing = get_visitor_by_fingerprint(&db, "fp-2").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn duplicate_fingerprint_is_rejected() {
        let db = setup_db().await;
        create_visitor(&db, &make_visitor("fp-dup")).await.unwrap();
        let err = create_visitor(&db, &make_visitor("fp-dup")).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn touch_updates_last_seen() {
        let db = setup_db().await;
        let visitor = make_visitor("fp-touch");
        create_visitor(&db, &visitor).await.unwrap();

        touch_visitor(&db, &visitor.id, "2027-01-01T00:00:00.000Z")
            .await
            .unwrap();
        let found = get_visitor(&db, &visitor.id).await.unwrap().unwrap();
        assert_eq!(found.last_seen_at, "2027-01-01T00:00:00.000Z");
        assert_eq!(found.first_seen_at, visitor.first_seen_at);
    }

    #[tokio::test]
    async fn notes_update_persists() {
        let db = setup_db().await;
        let visitor = make_visitor("fp-notes");
        create_visitor(&db, &visitor).await.unwrap();

        update_agent_notes(&db, &visitor.id, "prefers async examples")
            .await
            .unwrap();
        let found = get_visitor(&db, &visitor.id).await.unwrap().unwrap();
        assert_eq!(
            found.agent_notes.as_deref(),
            Some("prefers async examples")
        );
    }
}
