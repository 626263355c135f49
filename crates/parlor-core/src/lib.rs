// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parlor conversational retrieval backend.
//!
//! This crate provides the shared error type, domain model types,
//! vector helpers, and the adapter traits that the rest of the
//! workspace builds on.

pub mod error;
pub mod traits;
pub mod types;
pub mod vector;

// Re-export key items at crate root for ergonomic imports.
pub use error::ParlorError;
pub use traits::{CompletionAdapter, EmbeddingAdapter};
pub use types::{
    new_id, now_rfc3339, AgentReply, CompletionRequest, ContentChunk, ContentType, Conversation,
    ConversationStatus, EmbeddingInput, EmbeddingKind, EmbeddingOutput, KnowledgeSource, Message,
    SenderType, Turn, TurnRole, Visitor,
};
