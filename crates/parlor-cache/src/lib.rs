// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process TTL cache for hot session and rate-limit state.
//!
//! A lossy acceleration tier: every entry can be rebuilt from the store,
//! so eviction and process restart only cost latency, never data.
//! Expiry is lazy; an expired entry is removed on the next access.

mod cache;

pub use cache::MemoryCache;
