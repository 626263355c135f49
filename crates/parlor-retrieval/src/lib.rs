// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adaptive retrieval over the embedded knowledge base.
//!
//! A query is classified by weighted keyword buckets, mapped to a
//! search strategy (semantic, pure content, or hybrid), optionally
//! expanded with contextual terms before embedding, and the ranked
//! seeds are widened with neighboring chunks for document flow.

pub mod classifier;
pub mod engine;
pub mod expander;
pub mod strategy;
pub mod triggers;

pub use classifier::{classify, QueryCategory};
pub use engine::RetrievalEngine;
pub use expander::QueryExpander;
pub use strategy::{strategy_for, SearchStrategy};
