// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible provider: embeddings and structured chat
//! completions behind the core adapter traits.

pub mod adapter;
pub mod client;
pub mod types;

pub use client::OpenAiClient;
