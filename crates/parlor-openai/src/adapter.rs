// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait implementations over [`OpenAiClient`].
//!
//! The completion adapter asks for a JSON object reply and parses it
//! into [`AgentReply`]. A model that ignores the format instruction
//! still produces a usable turn: the raw text becomes the reply.

use async_trait::async_trait;
use parlor_core::{
    AgentReply, CompletionAdapter, CompletionRequest, EmbeddingAdapter, EmbeddingInput,
    EmbeddingOutput, ParlorError, TurnRole,
};

use crate::client::OpenAiClient;
use crate::types::{ChatMessage, ChatRequest, EmbeddingsRequest, ResponseFormat};

#[async_trait]
impl EmbeddingAdapter for OpenAiClient {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, ParlorError> {
        if input.texts.is_empty() {
            return Ok(EmbeddingOutput {
                embeddings: Vec::new(),
                dimensions: 0,
            });
        }
        let count = input.texts.len();
        let response = self
            .embeddings(&EmbeddingsRequest {
                model: self.embedding_model().to_string(),
                input: input.texts,
            })
            .await?;

        let mut data = response.data;
        if data.len() != count {
            return Err(ParlorError::Provider {
                message: format!(
                    "embeddings response had {} vectors for {count} inputs",
                    data.len()
                ),
                source: None,
            });
        }
        data.sort_by_key(|d| d.index);
        let dimensions = data.first().map(|d| d.embedding.len()).unwrap_or(0);
        Ok(EmbeddingOutput {
            embeddings: data.into_iter().map(|d| d.embedding).collect(),
            dimensions,
        })
    }
}

#[async_trait]
impl CompletionAdapter for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<AgentReply, ParlorError> {
        let mut messages = Vec::with_capacity(request.transcript.len() + 2);
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: request.system_prompt,
        });
        for turn in request.transcript {
            messages.push(ChatMessage {
                role: match turn.role {
                    TurnRole::User => "user".to_string(),
                    TurnRole::Assistant => "assistant".to_string(),
                },
                content: turn.content,
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.input,
        });

        let response = self
            .chat(&ChatRequest {
                model: request.model,
                messages,
                max_tokens: request.max_tokens,
                response_format: Some(ResponseFormat {
                    format_type: "json_object".to_string(),
                }),
            })
            .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ParlorError::Provider {
                message: "chat completion returned no choices".to_string(),
                source: None,
            })?;

        Ok(parse_reply(&content))
    }
}

/// Parse the model's JSON reply, tolerating plain text.
fn parse_reply(content: &str) -> AgentReply {
    match serde_json::from_str::<AgentReply>(content) {
        Ok(reply) if !reply.reply.is_empty() => reply,
        _ => {
            tracing::debug!("completion was not structured JSON; using raw text");
            AgentReply::text(content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_core::Turn;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> OpenAiClient {
        OpenAiClient::new("key", base_url, "gpt-4o-mini", "text-embedding-3-small").unwrap()
    }

    fn completion_request() -> CompletionRequest {
        CompletionRequest {
            system_prompt: "You are helpful.".into(),
            transcript: vec![Turn::user("hi"), Turn::assistant("hello!")],
            input: "tell me about the projects".into(),
            model: "gpt-4o-mini".into(),
            max_tokens: 512,
        }
    }

    #[tokio::test]
    async fn structured_reply_is_parsed() {
        let server = MockServer::start().await;
        let content = serde_json::json!({
            "reply": "Here are the projects.",
            "off_topic": false,
            "rag_summary": "projects overview",
        })
        .to_string();
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        });
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let reply = test_client(&server.uri())
            .complete(completion_request())
            .await
            .unwrap();
        assert_eq!(reply.reply, "Here are the projects.");
        assert_eq!(reply.rag_summary.as_deref(), Some("projects overview"));
        assert!(!reply.off_topic);
    }

    #[tokio::test]
    async fn plain_text_reply_degrades_gracefully() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Just plain text."}}]
        });
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let reply = test_client(&server.uri())
            .complete(completion_request())
            .await
            .unwrap();
        assert_eq!(reply.reply, "Just plain text.");
        assert!(reply.rag_summary.is_none());
    }

    #[tokio::test]
    async fn embeddings_keep_input_order() {
        let server = MockServer::start().await;
        // data arrives out of order; the adapter must sort by index
        let body = serde_json::json!({
            "data": [
                {"index": 1, "embedding": [0.3, 0.4]},
                {"index": 0, "embedding": [0.1, 0.2]}
            ]
        });
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let output = test_client(&server.uri())
            .embed(EmbeddingInput {
                texts: vec!["a".into(), "b".into()],
            })
            .await
            .unwrap();
        assert_eq!(output.embeddings[0], vec![0.1, 0.2]);
        assert_eq!(output.dimensions, 2);
    }

    #[tokio::test]
    async fn mismatched_embedding_count_is_an_error() {
        let server = MockServer::start().await;
        let body = serde_json::json!({"data": [{"index": 0, "embedding": [0.1]}]});
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .embed(EmbeddingInput {
                texts: vec!["a".into(), "b".into()],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ParlorError::Provider { .. }));
    }
}
