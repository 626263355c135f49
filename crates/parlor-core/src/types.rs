// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Parlor workspace.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Current UTC time as an RFC 3339 string at millisecond precision.
///
/// All timestamps in the store and cache use this format so that
/// lexicographic ordering matches chronological ordering.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Generate a fresh v4 UUID string id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Which vectorization strategy produced a chunk's embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmbeddingKind {
    /// Contextual embedding: chunk text enriched with document context.
    Semantic,
    /// Raw embedding of the chunk text alone.
    Pure,
}

impl EmbeddingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingKind::Semantic => "semantic",
            EmbeddingKind::Pure => "pure",
        }
    }

    pub fn from_str_value(s: &str) -> Self {
        match s {
            "semantic" => EmbeddingKind::Semantic,
            _ => EmbeddingKind::Pure,
        }
    }
}

/// Coarse category of a content chunk's source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Project,
    Experience,
    About,
    Resume,
    General,
    Skill,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Project => "project",
            ContentType::Experience => "experience",
            ContentType::About => "about",
            ContentType::Resume => "resume",
            ContentType::General => "general",
            ContentType::Skill => "skill",
        }
    }

    pub fn from_str_value(s: &str) -> Self {
        match s {
            "project" => ContentType::Project,
            "experience" => ContentType::Experience,
            "about" => ContentType::About,
            "resume" => ContentType::Resume,
            "skill" => ContentType::Skill,
            _ => ContentType::General,
        }
    }
}

/// A bounded slice of a source document stored with its own embedding.
///
/// Immutable once written: re-ingestion deletes and re-creates all
/// chunks for a source whose checksum changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentChunk {
    pub id: String,
    pub source_id: String,
    pub content_type: ContentType,
    pub title: String,
    pub full_text: String,
    pub chunk_text: String,
    /// Position within the source document, monotonic per source.
    pub chunk_index: i64,
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub embedding_kind: EmbeddingKind,
    /// Free-form JSON (section_title, section_type, word_count, tech_stack, URLs...).
    pub metadata: Option<String>,
}

/// One row per ingested document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSource {
    pub id: String,
    pub name: String,
    pub checksum: Option<String>,
    pub last_indexed_at: Option<String>,
}

/// A visitor identified by a stable client-supplied fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visitor {
    pub id: String,
    pub fingerprint: String,
    pub first_seen_at: String,
    pub last_seen_at: String,
    pub user_agent: Option<String>,
    pub ip_hash: Option<String>,
    /// Free-form JSON profile data extracted from chat.
    pub profile_data: Option<String>,
    /// Running notes accumulated by the agent.
    pub agent_notes: Option<String>,
}

/// Conversation lifecycle status. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationStatus {
    ActiveAi,
    Escalated,
    ActiveHuman,
    Ended,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::ActiveAi => "active_ai",
            ConversationStatus::Escalated => "escalated",
            ConversationStatus::ActiveHuman => "active_human",
            ConversationStatus::Ended => "ended",
        }
    }

    pub fn from_str_value(s: &str) -> Self {
        match s {
            "escalated" => ConversationStatus::Escalated,
            "active_human" => ConversationStatus::ActiveHuman,
            "ended" => ConversationStatus::Ended,
            _ => ConversationStatus::ActiveAi,
        }
    }

    /// Whether `self -> next` is a legal forward transition.
    pub fn can_transition_to(&self, next: ConversationStatus) -> bool {
        use ConversationStatus::*;
        match (self, next) {
            (ActiveAi, Escalated) | (ActiveAi, ActiveHuman) | (ActiveAi, Ended) => true,
            (Escalated, ActiveHuman) | (Escalated, Ended) => true,
            (ActiveHuman, Ended) => true,
            _ => false,
        }
    }

    /// Statuses in which a conversation accepts new messages.
    pub fn is_open(&self) -> bool {
        !matches!(self, ConversationStatus::Ended)
    }
}

/// A conversation between one visitor and the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub visitor_id: String,
    pub started_at: String,
    pub last_message_at: String,
    pub ended_at: Option<String>,
    pub status: ConversationStatus,
    pub model_used: Option<String>,
    /// Free-form JSON (current_connection_id, connection_status...).
    pub metadata: Option<String>,
}

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SenderType {
    Visitor,
    Ai,
    HumanAgent,
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::Visitor => "visitor",
            SenderType::Ai => "ai",
            SenderType::HumanAgent => "human_agent",
        }
    }

    pub fn from_str_value(s: &str) -> Self {
        match s {
            "ai" => SenderType::Ai,
            "human_agent" => SenderType::HumanAgent,
            _ => SenderType::Visitor,
        }
    }
}

/// An append-only chat message, ordered by `timestamp` within its conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_type: SenderType,
    pub human_agent_id: Option<String>,
    pub content: String,
    pub timestamp: String,
    pub metadata: Option<String>,
}

/// Input to an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Output of an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}

/// Role of a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One turn of in-memory conversation transcript sent to the completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Turn {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Turn {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// A completion request: system prompt, prior transcript, and the
/// (possibly retrieval-augmented) current input.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub transcript: Vec<Turn>,
    pub input: String,
    pub model: String,
    pub max_tokens: u32,
}

/// Structured result of a completion call.
///
/// Only `reply` is required; every other field defaults when the model
/// omits it. Absence is never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReply {
    pub reply: String,
    /// True when the turn strayed from the assistant's subject matter.
    #[serde(default)]
    pub off_topic: bool,
    /// Condensed summary of retrieved material actually used, when any.
    #[serde(default)]
    pub rag_summary: Option<String>,
    /// New notes to append to the visitor's profile, when any.
    #[serde(default)]
    pub visitor_notes_update: Option<String>,
}

impl AgentReply {
    /// A plain reply with all optional fields defaulted.
    pub fn text(reply: impl Into<String>) -> Self {
        AgentReply {
            reply: reply.into(),
            off_topic: false,
            rag_summary: None,
            visitor_notes_update: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_sort_lexicographically() {
        let a = now_rfc3339();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = now_rfc3339();
        assert!(a < b, "{a} should sort before {b}");
        assert!(a.ends_with('Z'));
    }

    #[test]
    fn embedding_kind_roundtrip() {
        assert_eq!(EmbeddingKind::Semantic.as_str(), "semantic");
        assert_eq!(EmbeddingKind::Pure.as_str(), "pure");
        assert_eq!(
            EmbeddingKind::from_str_value("semantic"),
            EmbeddingKind::Semantic
        );
        assert_eq!(EmbeddingKind::from_str_value("pure"), EmbeddingKind::Pure);
    }

    #[test]
    fn status_transitions_only_move_forward() {
        use ConversationStatus::*;
        assert!(ActiveAi.can_transition_to(Escalated));
        assert!(ActiveAi.can_transition_to(ActiveHuman));
        assert!(Escalated.can_transition_to(ActiveHuman));
        assert!(ActiveHuman.can_transition_to(Ended));
        assert!(!Ended.can_transition_to(ActiveAi));
        assert!(!ActiveHuman.can_transition_to(ActiveAi));
        assert!(!Escalated.can_transition_to(ActiveAi));
    }

    #[test]
    fn ended_conversations_are_closed() {
        assert!(ConversationStatus::ActiveAi.is_open());
        assert!(ConversationStatus::Escalated.is_open());
        assert!(!ConversationStatus::Ended.is_open());
    }

    #[test]
    fn agent_reply_optional_fields_default() {
        let reply: AgentReply = serde_json::from_str(r#"{"reply": "hello"}"#).unwrap();
        assert_eq!(reply.reply, "hello");
        assert!(!reply.off_topic);
        assert!(reply.rag_summary.is_none());
        assert!(reply.visitor_notes_update.is_none());
    }

    #[test]
    fn sender_type_roundtrip() {
        for sender in [SenderType::Visitor, SenderType::Ai, SenderType::HumanAgent] {
            assert_eq!(SenderType::from_str_value(sender.as_str()), sender);
        }
    }
}
