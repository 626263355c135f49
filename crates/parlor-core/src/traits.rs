// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits at the seams to external model providers.
//!
//! Both traits use `#[async_trait]` for dynamic dispatch so the
//! orchestrator can hold `Arc<dyn ...>` handles and tests can swap in
//! deterministic fakes.

use async_trait::async_trait;

use crate::error::ParlorError;
use crate::types::{AgentReply, CompletionRequest, EmbeddingInput, EmbeddingOutput};

/// Turns text into fixed-length vectors for distance ranking.
///
/// Repeated identical input must yield a usable vector for ranking;
/// exact bit-level reproducibility is not required.
#[async_trait]
pub trait EmbeddingAdapter: Send + Sync {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, ParlorError>;
}

/// The LLM completion call, treated as a black box: prompt in,
/// structured [`AgentReply`] out.
#[async_trait]
pub trait CompletionAdapter: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<AgentReply, ParlorError>;
}
