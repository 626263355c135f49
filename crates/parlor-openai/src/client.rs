// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for an OpenAI-compatible API.
//!
//! Handles request construction, bearer authentication, and transient
//! error retry for the chat completions and embeddings endpoints.

use std::time::Duration;

use parlor_core::ParlorError;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{
    ApiErrorResponse, ChatRequest, ChatResponse, EmbeddingsRequest, EmbeddingsResponse,
};

/// HTTP client for OpenAI-compatible API communication.
///
/// Manages authentication headers, connection pooling, and retry logic
/// for transient errors (429, 500, 503).
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    chat_model: String,
    embedding_model: String,
    max_retries: u32,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(
        api_key: &str,
        base_url: &str,
        chat_model: &str,
        embedding_model: &str,
    ) -> Result<Self, ParlorError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| ParlorError::Config(format!("invalid API key header value: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("authorization", auth);
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ParlorError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            chat_model: chat_model.to_string(),
            embedding_model: embedding_model.to_string(),
            max_retries: 1,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Send a chat completion request and return the parsed response.
    ///
    /// On transient errors (429, 500, 503), retries once after a 1-second delay.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ParlorError> {
        let url = format!("{}/chat/completions", self.base_url);
        self.post_json(&url, request, "chat completion").await
    }

    /// Send an embeddings request and return the parsed response.
    pub async fn embeddings(
        &self,
        request: &EmbeddingsRequest,
    ) -> Result<EmbeddingsResponse, ParlorError> {
        let url = format!("{}/embeddings", self.base_url);
        self.post_json(&url, request, "embeddings").await
    }

    async fn post_json<Req, Resp>(
        &self,
        url: &str,
        request: &Req,
        what: &str,
    ) -> Result<Resp, ParlorError>
    where
        Req: serde::Serialize,
        Resp: serde::de::DeserializeOwned,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, what, "retrying request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(url)
                .json(request)
                .send()
                .await
                .map_err(|e| ParlorError::Provider {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, what, "response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| ParlorError::Provider {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                return serde_json::from_str(&body).map_err(|e| ParlorError::Provider {
                    message: format!("failed to parse {what} response: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(ParlorError::Provider {
                    message: format!("API returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            // Non-transient error or exhausted retries.
            let body = response.text().await.unwrap_or_default();
            let message = if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&body) {
                format!("API error ({}): {}", api_err.error.type_, api_err.error.message)
            } else {
                format!("API returned {status}: {body}")
            };
            return Err(ParlorError::Provider {
                message,
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| ParlorError::Provider {
            message: format!("{what} request failed after retries"),
            source: None,
        }))
    }
}

/// True for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}
