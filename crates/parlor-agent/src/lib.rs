// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation agent: per-turn orchestration plus the gates that run
//! before any provider call (safety deny-list, daily point budget).

pub mod orchestrator;
pub mod rate_limit;
pub mod safety;

pub use orchestrator::{Orchestrator, TurnOutcome};
pub use rate_limit::RateLimiter;
pub use safety::SafetyFilter;
