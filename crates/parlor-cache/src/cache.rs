// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyed cache entries: strings, hashes, score-ordered sets, counters.
//!
//! All operations take `&self`; DashMap shards provide the locking.
//! Mixed-kind access to the same key overwrites rather than errors,
//! matching how callers namespace keys by prefix.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use dashmap::DashMap;

enum Value {
    Str(String),
    Hash(HashMap<String, String>),
    /// (score, member) pairs kept sorted by score ascending.
    SortedSet(Vec<(f64, String)>),
    Counter(i64),
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// Concurrent in-process cache with per-key TTLs.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-expired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Reset or set the TTL of an existing key. Returns false when the
    /// key is absent or already expired.
    pub fn expire(&self, key: &str, ttl: Duration) -> bool {
        self.expire_at(key, ttl, Instant::now())
    }

    /// Remaining time to live. `None` when the key is absent, expired,
    /// or has no deadline.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.ttl_at(key, Instant::now())
    }

    fn ttl_at(&self, key: &str, now: Instant) -> Option<Duration> {
        let entry = self.entries.get(key)?;
        if entry.expired(now) {
            return None;
        }
        entry.expires_at.map(|deadline| deadline - now)
    }

    fn expire_at(&self, key: &str, ttl: Duration, now: Instant) -> bool {
        let mut stale = false;
        if let Some(mut entry) = self.entries.get_mut(key) {
            if entry.expired(now) {
                stale = true;
            } else {
                entry.expires_at = Some(now + ttl);
                return true;
            }
        }
        // remove outside the shard guard
        if stale {
            self.entries.remove(key);
        }
        false
    }

    // ---- strings ----

    pub fn set_string(&self, key: &str, value: &str, ttl: Option<Duration>) {
        self.set_string_at(key, value, ttl, Instant::now());
    }

    fn set_string_at(&self, key: &str, value: &str, ttl: Option<Duration>, now: Instant) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: ttl.map(|t| now + t),
            },
        );
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get_string_at(key, Instant::now())
    }

    fn get_string_at(&self, key: &str, now: Instant) -> Option<String> {
        self.read(key, now, |value| match value {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        })
    }

    // ---- hashes ----

    /// Replace the whole hash at `key`.
    pub fn hset_all(&self, key: &str, fields: HashMap<String, String>, ttl: Option<Duration>) {
        self.hset_all_at(key, fields, ttl, Instant::now());
    }

    fn hset_all_at(
        &self,
        key: &str,
        fields: HashMap<String, String>,
        ttl: Option<Duration>,
        now: Instant,
    ) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Hash(fields),
                expires_at: ttl.map(|t| now + t),
            },
        );
    }

    /// Set one field, creating the hash (without TTL) when absent.
    /// An existing entry keeps its deadline.
    pub fn hset(&self, key: &str, field: &str, value: &str) {
        self.hset_at(key, field, value, Instant::now());
    }

    fn hset_at(&self, key: &str, field: &str, value: &str, now: Instant) {
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Hash(HashMap::new()),
            expires_at: None,
        });
        if entry.expired(now) || !matches!(entry.value, Value::Hash(_)) {
            entry.value = Value::Hash(HashMap::new());
            entry.expires_at = None;
        }
        if let Value::Hash(fields) = &mut entry.value {
            fields.insert(field.to_string(), value.to_string());
        }
    }

    pub fn hgetall(&self, key: &str) -> Option<HashMap<String, String>> {
        self.hgetall_at(key, Instant::now())
    }

    fn hgetall_at(&self, key: &str, now: Instant) -> Option<HashMap<String, String>> {
        self.read(key, now, |value| match value {
            Value::Hash(fields) => Some(fields.clone()),
            _ => None,
        })
    }

    // ---- sorted sets ----

    /// Add a member with the given score, keeping the set score-ordered.
    /// Re-adding an existing member updates its score.
    pub fn zadd(&self, key: &str, score: f64, member: &str) {
        self.zadd_at(key, score, member, Instant::now());
    }

    fn zadd_at(&self, key: &str, score: f64, member: &str, now: Instant) {
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::SortedSet(Vec::new()),
            expires_at: None,
        });
        if entry.expired(now) || !matches!(entry.value, Value::SortedSet(_)) {
            entry.value = Value::SortedSet(Vec::new());
            entry.expires_at = None;
        }
        if let Value::SortedSet(members) = &mut entry.value {
            members.retain(|(_, m)| m != member);
            let pos = members.partition_point(|(s, _)| *s <= score);
            members.insert(pos, (score, member.to_string()));
        }
    }

    /// All members in ascending score order.
    pub fn zrange_all(&self, key: &str) -> Option<Vec<String>> {
        self.zrange_all_at(key, Instant::now())
    }

    fn zrange_all_at(&self, key: &str, now: Instant) -> Option<Vec<String>> {
        self.read(key, now, |value| match value {
            Value::SortedSet(members) => {
                Some(members.iter().map(|(_, m)| m.clone()).collect())
            }
            _ => None,
        })
    }

    pub fn zcard(&self, key: &str) -> usize {
        self.read(key, Instant::now(), |value| match value {
            Value::SortedSet(members) => Some(members.len()),
            _ => None,
        })
        .unwrap_or(0)
    }

    /// Drop all but the `keep` highest-scored members.
    pub fn ztrim_keep_last(&self, key: &str, keep: usize) {
        let now = Instant::now();
        if let Some(mut entry) = self.entries.get_mut(key) {
            if entry.expired(now) {
                return;
            }
            if let Value::SortedSet(members) = &mut entry.value {
                let len = members.len();
                if len > keep {
                    members.drain(..len - keep);
                }
            }
        }
    }

    // ---- counters ----

    /// Add `delta` to a counter, creating it at zero with `ttl_if_new`
    /// when absent or expired. Returns the new value.
    pub fn incr_by(&self, key: &str, delta: i64, ttl_if_new: Duration) -> i64 {
        self.incr_by_at(key, delta, ttl_if_new, Instant::now())
    }

    fn incr_by_at(&self, key: &str, delta: i64, ttl_if_new: Duration, now: Instant) -> i64 {
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Counter(0),
            expires_at: Some(now + ttl_if_new),
        });
        if entry.expired(now) || !matches!(entry.value, Value::Counter(_)) {
            entry.value = Value::Counter(0);
            entry.expires_at = Some(now + ttl_if_new);
        }
        match &mut entry.value {
            Value::Counter(count) => {
                *count += delta;
                *count
            }
            _ => unreachable!(),
        }
    }

    pub fn get_counter(&self, key: &str) -> Option<i64> {
        self.read(key, Instant::now(), |value| match value {
            Value::Counter(count) => Some(*count),
            _ => None,
        })
    }

    fn read<T>(&self, key: &str, now: Instant, f: impl FnOnce(&Value) -> Option<T>) -> Option<T> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.expired(now) {
                return f(&entry.value);
            }
        } else {
            return None;
        }
        // expired: remove outside the shard guard
        self.entries.remove(key);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_roundtrip_and_delete() {
        let cache = MemoryCache::new();
        cache.set_string("visitor:fp", "{\"id\":\"v1\"}", None);
        assert_eq!(cache.get_string("visitor:fp").as_deref(), Some("{\"id\":\"v1\"}"));
        cache.delete("visitor:fp");
        assert!(cache.get_string("visitor:fp").is_none());
    }

    #[test]
    fn entry_within_ttl_hits_and_past_ttl_misses() {
        let cache = MemoryCache::new();
        let start = Instant::now();
        cache.set_string_at("k", "v", Some(Duration::from_secs(3600)), start);

        let just_before = start + Duration::from_secs(3599);
        assert_eq!(cache.get_string_at("k", just_before).as_deref(), Some("v"));

        let just_after = start + Duration::from_secs(3601);
        assert!(cache.get_string_at("k", just_after).is_none());
        // lazy removal happened
        assert!(cache.entries.get("k").is_none());
    }

    #[test]
    fn hash_fields_merge_and_preserve_deadline() {
        let cache = MemoryCache::new();
        let start = Instant::now();
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), "active_ai".to_string());
        cache.hset_all_at("active_conv:c1", fields, Some(Duration::from_secs(3600)), start);
        cache.hset_at("active_conv:c1", "connection_status", "connected", start);

        let all = cache
            .hgetall_at("active_conv:c1", start + Duration::from_secs(1))
            .unwrap();
        assert_eq!(all.get("status").map(String::as_str), Some("active_ai"));
        assert_eq!(
            all.get("connection_status").map(String::as_str),
            Some("connected")
        );
        // original deadline still applies
        assert!(cache
            .hgetall_at("active_conv:c1", start + Duration::from_secs(3601))
            .is_none());
    }

    #[test]
    fn sorted_set_orders_by_score() {
        let cache = MemoryCache::new();
        cache.zadd("msgs", 3.0, "c");
        cache.zadd("msgs", 1.0, "a");
        cache.zadd("msgs", 2.0, "b");
        assert_eq!(
            cache.zrange_all("msgs").unwrap(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn zadd_updates_score_of_existing_member() {
        let cache = MemoryCache::new();
        cache.zadd("msgs", 1.0, "a");
        cache.zadd("msgs", 2.0, "b");
        cache.zadd("msgs", 3.0, "a");
        assert_eq!(
            cache.zrange_all("msgs").unwrap(),
            vec!["b".to_string(), "a".to_string()]
        );
        assert_eq!(cache.zcard("msgs"), 2);
    }

    #[test]
    fn trim_keeps_highest_scores() {
        let cache = MemoryCache::new();
        for i in 0..5 {
            cache.zadd("msgs", i as f64, &format!("m{i}"));
        }
        cache.ztrim_keep_last("msgs", 2);
        assert_eq!(
            cache.zrange_all("msgs").unwrap(),
            vec!["m3".to_string(), "m4".to_string()]
        );
    }

    #[test]
    fn counter_accumulates_then_resets_after_expiry() {
        let cache = MemoryCache::new();
        let start = Instant::now();
        let day = Duration::from_secs(86_400);
        assert_eq!(cache.incr_by_at("rate:x:2026-08-30", 1, day, start), 1);
        assert_eq!(cache.incr_by_at("rate:x:2026-08-30", 10, day, start), 11);

        // next day: window expired, counter restarts
        let next = start + day + Duration::from_secs(1);
        assert_eq!(cache.incr_by_at("rate:x:2026-08-30", 1, day, next), 1);
    }

    #[test]
    fn expire_refreshes_only_live_keys() {
        let cache = MemoryCache::new();
        cache.set_string("k", "v", Some(Duration::from_secs(60)));
        assert!(cache.expire("k", Duration::from_secs(120)));
        assert!(!cache.expire("missing", Duration::from_secs(120)));
    }

    #[test]
    fn ttl_reports_the_remaining_deadline() {
        let cache = MemoryCache::new();
        let start = Instant::now();
        cache.set_string_at("k", "v", Some(Duration::from_secs(3600)), start);
        cache.set_string("forever", "v", None);

        let remaining = cache.ttl_at("k", start + Duration::from_secs(600)).unwrap();
        assert_eq!(remaining, Duration::from_secs(3000));
        assert!(cache.ttl("forever").is_none());
        assert!(cache.ttl_at("k", start + Duration::from_secs(3601)).is_none());
    }

    #[test]
    fn kind_mismatch_reads_as_miss() {
        let cache = MemoryCache::new();
        cache.set_string("k", "v", None);
        assert!(cache.hgetall("k").is_none());
        assert!(cache.zrange_all("k").is_none());
    }
}
