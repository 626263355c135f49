// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Parlor conversational backend.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed CRUD
//! operations for visitors, conversations, messages, and the embedded
//! knowledge base (sources and content chunks with vector BLOBs).

pub mod database;
pub mod migrations;
pub mod queries;

pub use database::Database;
