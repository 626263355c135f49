// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Points-based daily rate limiting.
//!
//! Each client identity gets a daily budget; on-topic turns cost 1
//! point, off-topic turns cost 10. The counter lives in the cache under
//! a hashed identity keyed per calendar day, expiring after 24 hours.
//! Cache loss resets the budget (fails open).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parlor_cache::MemoryCache;
use parlor_config::RateLimitConfig;
use sha2::{Digest, Sha256};

const WINDOW_SECS: u64 = 86_400;

fn counter_key(identity: &str, date: &str) -> String {
    let digest = Sha256::digest(identity.as_bytes());
    let short = hex::encode(&digest[..8]);
    format!("rate_limit:{short}:{date}")
}

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

#[derive(Clone)]
pub struct RateLimiter {
    cache: Arc<MemoryCache>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(cache: Arc<MemoryCache>, config: RateLimitConfig) -> Self {
        Self { cache, config }
    }

    /// Whether this identity has exhausted today's budget.
    pub fn is_limited(&self, identity: &str) -> bool {
        self.is_limited_on(identity, &today())
    }

    fn is_limited_on(&self, identity: &str, date: &str) -> bool {
        let used = self
            .cache
            .get_counter(&counter_key(identity, date))
            .unwrap_or(0);
        used >= self.config.daily_points
    }

    /// Charge a completed turn. Returns the points used so far today.
    pub fn charge(&self, identity: &str, off_topic: bool) -> i64 {
        self.charge_on(identity, off_topic, &today())
    }

    fn charge_on(&self, identity: &str, off_topic: bool, date: &str) -> i64 {
        let cost = if off_topic {
            self.config.off_topic_cost
        } else {
            self.config.on_topic_cost
        };
        let used = self.cache.incr_by(
            &counter_key(identity, date),
            cost,
            Duration::from_secs(WINDOW_SECS),
        );
        tracing::debug!(identity_hashed = %counter_key(identity, date), used, cost, "rate limit charged");
        used
    }
}
