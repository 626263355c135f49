// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cache-aside session state.
//!
//! The store is always the system of record; the cache only
//! accelerates reads of hot state. Every cache miss, parse failure, or
//! stale entry falls back to the store and repopulates, so losing the
//! cache costs latency, never data.

pub mod conversations;
pub mod messages;
pub mod visitors;

pub use conversations::ConversationService;
pub use messages::MessageService;
pub use visitors::VisitorService;
