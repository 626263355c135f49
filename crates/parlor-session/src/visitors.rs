// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Visitor identification keyed by a client-supplied fingerprint.

use std::sync::Arc;
use std::time::Duration;

use parlor_cache::MemoryCache;
use parlor_config::CacheConfig;
use parlor_core::{new_id, now_rfc3339, ParlorError, Visitor};
use parlor_storage::queries::visitors as visitor_queries;
use parlor_storage::Database;

fn cache_key(fingerprint: &str) -> String {
    format!("visitor:{fingerprint}")
}

#[derive(Clone)]
pub struct VisitorService {
    db: Database,
    cache: Arc<MemoryCache>,
    ttl: Duration,
}

impl VisitorService {
    pub fn new(db: Database, cache: Arc<MemoryCache>, config: &CacheConfig) -> Self {
        Self {
            db,
            cache,
            ttl: Duration::from_secs(config.visitor_ttl_secs),
        }
    }

    /// Resolve a fingerprint to a visitor, creating one on first sight.
    ///
    /// Returns the visitor and whether it was newly created. Two
    /// concurrent calls for the same fingerprint never create two rows:
    /// the loser of the unique-constraint race re-reads the winner's.
    pub async fn identify(
        &self,
        fingerprint: &str,
        user_agent: Option<&str>,
        ip_hash: Option<&str>,
    ) -> Result<(Visitor, bool), ParlorError> {
        let key = cache_key(fingerprint);

        if let Some(cached) = self.cache.get_string(&key) {
            match serde_json::from_str::<Visitor>(&cached) {
                Ok(mut visitor) => {
                    tracing::debug!(fingerprint, "visitor cache hit");
                    visitor.last_seen_at = now_rfc3339();
                    visitor_queries::touch_visitor(&self.db, &visitor.id, &visitor.last_seen_at)
                        .await?;
                    self.cache_put(&key, &visitor);
                    return Ok((visitor, false));
                }
                Err(e) => {
                    tracing::warn!(fingerprint, error = %e, "bad visitor cache entry; dropping");
                    self.cache.delete(&key);
                }
            }
        }

        if let Some(mut visitor) =
            visitor_queries::get_visitor_by_fingerprint(&self.db, fingerprint).await?
        {
            visitor.last_seen_at = now_rfc3339();
            visitor_queries::touch_visitor(&self.db, &visitor.id, &visitor.last_seen_at).await?;
            self.cache_put(&key, &visitor);
            return Ok((visitor, false));
        }

        let now = now_rfc3339();
        let visitor = Visitor {
            id: new_id(),
            fingerprint: fingerprint.to_string(),
            first_seen_at: now.clone(),
            last_seen_at: now,
            user_agent: user_agent.map(String::from),
            ip_hash: ip_hash.map(String::from),
            profile_data: None,
            agent_notes: None,
        };
        match visitor_queries::create_visitor(&self.db, &visitor).await {
            Ok(()) => {
                tracing::info!(fingerprint, visitor_id = %visitor.id, "new visitor");
                self.cache_put(&key, &visitor);
                Ok((visitor, true))
            }
            Err(create_err) => {
                // lost the insert race: the row must exist now
                match visitor_queries::get_visitor_by_fingerprint(&self.db, fingerprint).await? {
                    Some(existing) => {
                        tracing::debug!(fingerprint, "identify race resolved to existing visitor");
                        self.cache_put(&key, &existing);
                        Ok((existing, false))
                    }
                    None => Err(create_err),
                }
            }
        }
    }

    /// Fetch a visitor by id, store only.
    pub async fn get(&self, visitor_id: &str) -> Result<Visitor, ParlorError> {
        visitor_queries::get_visitor(&self.db, visitor_id)
            .await?
            .ok_or_else(|| ParlorError::NotFound {
                entity: "visitor",
                id: visitor_id.to_string(),
            })
    }

    /// Append a note line to the visitor's running agent notes.
    pub async fn append_notes(&self, visitor_id: &str, notes: &str) -> Result<(), ParlorError> {
        let visitor = self.get(visitor_id).await?;
        let combined = match visitor.agent_notes.as_deref() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{notes}"),
            _ => notes.to_string(),
        };
        visitor_queries::update_agent_notes(&self.db, visitor_id, &combined).await?;
        // stale until next identify
        self.cache.delete(&cache_key(&visitor.fingerprint));
        Ok(())
    }

    fn cache_put(&self, key: &str, visitor: &Visitor) {
        match serde_json::to_string(visitor) {
            Ok(json) => self.cache.set_string(key, &json, Some(self.ttl)),
            Err(e) => tracing::warn!(error = %e, "visitor cache serialize failed"),
        }
    }
}
