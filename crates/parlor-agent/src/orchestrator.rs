// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-turn conversation orchestrator.
//!
//! A turn moves through: validate -> persist user message -> gates
//! (safety, rate limit) -> optional retrieval -> completion ->
//! persist assistant message -> transcript update. Retrieval context is
//! prepended to the completion input only; the stored user message and
//! the in-memory transcript always carry the original text, and the
//! assistant turn folds in the retrieval summary instead, so context
//! blocks never compound across turns.

use std::sync::Arc;

use dashmap::DashMap;
use parlor_core::{
    AgentReply, CompletionAdapter, CompletionRequest, ContentChunk, EmbeddingAdapter,
    EmbeddingInput, Message, ParlorError, SenderType, Turn,
};
use parlor_retrieval::{QueryExpander, RetrievalEngine};
use parlor_session::{ConversationService, MessageService, VisitorService};
use parlor_config::AgentConfig;

use crate::rate_limit::RateLimiter;
use crate::safety::SafetyFilter;

/// Everything produced by one handled turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub user_message: Message,
    pub assistant_message: Message,
    pub reply: AgentReply,
}

pub struct Orchestrator {
    config: AgentConfig,
    chat_model: String,
    engine: RetrievalEngine,
    expander: QueryExpander,
    embedder: Arc<dyn EmbeddingAdapter>,
    completer: Arc<dyn CompletionAdapter>,
    visitors: VisitorService,
    messages: MessageService,
    conversations: ConversationService,
    rate_limiter: RateLimiter,
    safety: SafetyFilter,
    /// conversation_id -> in-memory transcript for the completion call.
    transcripts: DashMap<String, Vec<Turn>>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: AgentConfig,
        chat_model: String,
        engine: RetrievalEngine,
        expander: QueryExpander,
        embedder: Arc<dyn EmbeddingAdapter>,
        completer: Arc<dyn CompletionAdapter>,
        visitors: VisitorService,
        conversations: ConversationService,
        messages: MessageService,
        rate_limiter: RateLimiter,
    ) -> Result<Self, ParlorError> {
        let safety = SafetyFilter::new(&config.safety_patterns)?;
        Ok(Self {
            config,
            chat_model,
            engine,
            expander,
            embedder,
            completer,
            visitors,
            conversations,
            messages,
            rate_limiter,
            safety,
            transcripts: DashMap::new(),
        })
    }

    /// The assistant's opening line, also seeded into the transcript.
    pub fn greeting(&self) -> &str {
        &self.config.greeting
    }

    pub fn visitors(&self) -> &VisitorService {
        &self.visitors
    }

    pub fn conversations(&self) -> &ConversationService {
        &self.conversations
    }

    pub fn messages(&self) -> &MessageService {
        &self.messages
    }

    /// Handle one visitor turn end to end.
    pub async fn handle_message(
        &self,
        conversation_id: &str,
        visitor_id: &str,
        content: &str,
    ) -> Result<TurnOutcome, ParlorError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ParlorError::Validation("message is empty".into()));
        }
        if content.len() > self.config.max_message_chars {
            return Err(ParlorError::Validation(format!(
                "message exceeds {} characters",
                self.config.max_message_chars
            )));
        }

        // durable user message first, always the original text
        let user_message = self
            .messages
            .append(conversation_id, SenderType::Visitor, content, None, None)
            .await?;

        let reply = self.produce_reply(conversation_id, visitor_id, content).await;
        self.rate_limiter.charge(visitor_id, reply.off_topic);

        let assistant_message = self
            .messages
            .append(conversation_id, SenderType::Ai, &reply.reply, None, None)
            .await?;

        self.update_transcript(conversation_id, content, &reply);

        if let Some(notes) = &reply.visitor_notes_update {
            if let Err(e) = self.visitors.append_notes(visitor_id, notes).await {
                tracing::warn!(visitor_id, error = %e, "visitor notes update failed");
            }
        }

        Ok(TurnOutcome {
            user_message,
            assistant_message,
            reply,
        })
    }

    /// Gates, retrieval, and the completion call. Degrades instead of
    /// failing: every error path yields a usable canned reply.
    async fn produce_reply(
        &self,
        conversation_id: &str,
        visitor_id: &str,
        content: &str,
    ) -> AgentReply {
        if self.safety.is_blocked(content) {
            tracing::warn!(conversation_id, "message blocked by safety filter");
            let mut reply = AgentReply::text(&self.config.safety_message);
            reply.off_topic = true;
            return reply;
        }

        if self.rate_limiter.is_limited(visitor_id) {
            tracing::info!(visitor_id, "rate limited; substituting canned reply");
            return AgentReply::text(&self.config.rate_limited_message);
        }

        let input = match self.retrieve_context(content).await {
            Some(context) => format!("{context}\n\n{content}"),
            None => content.to_string(),
        };

        let transcript = self.transcript_for(conversation_id);
        let request = CompletionRequest {
            system_prompt: self.config.system_prompt.clone(),
            transcript,
            input,
            model: self.chat_model.clone(),
            max_tokens: self.config.max_tokens,
        };
        match self.completer.complete(request).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(conversation_id, error = %e, "completion failed; apologizing");
                AgentReply::text(&self.config.apology_message)
            }
        }
    }

    /// Expand, embed, search. `None` when the message doesn't warrant a
    /// search or when any retrieval stage fails.
    async fn retrieve_context(&self, content: &str) -> Option<String> {
        if !self.engine.needs_search(content) {
            return None;
        }

        let expanded = self.expander.expand(content).await;
        let embedding = match self
            .embedder
            .embed(EmbeddingInput {
                texts: vec![expanded.clone()],
            })
            .await
        {
            Ok(output) => output.embeddings.into_iter().next()?,
            Err(e) => {
                tracing::warn!(error = %e, "embedding failed; answering without retrieval");
                return None;
            }
        };

        // Classification keys off the raw message; only the embedding sees
        // the expanded text.
        let limit = self.engine.search_limit(content);
        let content_types = self.engine.detect_content_types(content);
        let chunks = match self
            .engine
            .search(&embedding, content_types.as_deref(), limit, content)
            .await
        {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!(error = %e, "search failed; answering without retrieval");
                return None;
            }
        };
        if chunks.is_empty() {
            return None;
        }
        Some(context_block(&chunks))
    }

    /// Snapshot of the transcript, seeding the greeting on first use.
    fn transcript_for(&self, conversation_id: &str) -> Vec<Turn> {
        self.transcripts
            .entry(conversation_id.to_string())
            .or_insert_with(|| vec![Turn::assistant(self.config.greeting.clone())])
            .clone()
    }

    /// Append the turn pair. The user turn is the original message; the
    /// assistant turn absorbs the retrieval summary when there was one.
    fn update_transcript(&self, conversation_id: &str, content: &str, reply: &AgentReply) {
        let assistant_content = match &reply.rag_summary {
            Some(summary) => format!("{}\n\n[Context used: {summary}]", reply.reply),
            None => reply.reply.clone(),
        };
        let mut transcript = self
            .transcripts
            .entry(conversation_id.to_string())
            .or_insert_with(|| vec![Turn::assistant(self.config.greeting.clone())]);
        transcript.push(Turn::user(content));
        transcript.push(Turn::assistant(assistant_content));
    }

    /// Drop the in-memory transcript (conversation ended).
    pub fn forget_transcript(&self, conversation_id: &str) {
        self.transcripts.remove(conversation_id);
    }
}

/// Render retrieved chunks as a context block for the completion input.
fn context_block(chunks: &[ContentChunk]) -> String {
    let mut block = String::from("Relevant knowledge base content:\n");
    for chunk in chunks {
        block.push_str(&format!("- [{}] {}\n", chunk.title, chunk.chunk_text));
    }
    block
}
