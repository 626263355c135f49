// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use parlor_core::ParlorError;
use tokio_rusqlite::Connection;

use crate::migrations::run_migrations;

/// Convert tokio_rusqlite errors into ParlorError::Storage.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> ParlorError {
    ParlorError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the single SQLite connection shared by the whole process.
#[derive(Clone, Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run
    /// any pending migrations.
    pub async fn open(path: &str) -> Result<Self, ParlorError> {
        let conn = Connection::open(path).await.map_err(ParlorError::storage)?;
        Self::initialize(conn).await
    }

    /// Open a private in-memory database. Used by tests and tooling.
    pub async fn open_in_memory() -> Result<Self, ParlorError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(ParlorError::storage)?;
        Self::initialize(conn).await
    }

    async fn initialize(conn: Connection) -> Result<Self, ParlorError> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )
            .map_err(ParlorError::storage)?;
            run_migrations(conn)
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Error(e) => e,
            e => ParlorError::storage(e),
        })?;
        tracing::debug!("database opened, migrations applied");
        Ok(Database { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Flush and close the connection.
    pub async fn close(self) -> Result<(), ParlorError> {
        self.conn
            .close()
            .await
            .map_err(|e| ParlorError::Storage {
                source: Box::new(e),
            })
    }
}
