//! Short-TTL response cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::bypass::BypassMode;
use crate::clock::Clock;
use crate::observability::metrics;

/// A cached value and the instant it stops being served.
#[derive(Debug, Clone)]
pub struct SoftCacheEntry {
    pub value: Value,
    pub expires_at: Instant,
}

/// In-memory key/value cache with per-entry TTL.
///
/// Keys are assembled by callers; the cache knows nothing about what they mean.
#[derive(Clone)]
pub struct SoftCache {
    inner: Arc<DashMap<String, SoftCacheEntry>>,
    clock: Arc<dyn Clock>,
    bypass: Arc<dyn BypassMode>,
}

impl SoftCache {
    pub fn new(clock: Arc<dyn Clock>, bypass: Arc<dyn BypassMode>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            clock,
            bypass,
        }
    }

    /// Stored value if present and unexpired. Expired entries are evicted.
    pub fn get(&self, key: &str) -> Option<Value> {
        if self.bypass.is_active() {
            return None;
        }

        let now = self.clock.now();
        let hit = match self.inner.get(key) {
            Some(entry) if now < entry.expires_at => Some(entry.value.clone()),
            Some(_) => None,
            None => {
                metrics::record_cache_lookup(false);
                return None;
            }
        };

        if hit.is_none() {
            // Re-check under the write lock; a concurrent `set` may have refreshed it.
            self.inner.remove_if(key, |_, entry| now >= entry.expires_at);
            tracing::trace!(key, "Evicted expired cache entry");
        }
        metrics::record_cache_lookup(hit.is_some());
        hit
    }

    /// Store `value` for `ttl_ms` milliseconds. A non-positive TTL stores nothing.
    pub fn set(&self, key: impl Into<String>, value: Value, ttl_ms: i64) {
        if self.bypass.is_active() || ttl_ms <= 0 {
            return;
        }
        let expires_at = self.clock.now() + Duration::from_millis(ttl_ms as u64);
        self.inner.insert(key.into(), SoftCacheEntry { value, expires_at });
    }

    /// Typed read. A value that no longer fits `T` counts as a miss.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        serde_json::from_value(value).ok()
    }

    /// Typed write. Values that cannot be represented as JSON are not cached.
    pub fn set_as<T: Serialize + ?Sized>(&self, key: impl Into<String>, value: &T, ttl_ms: i64) {
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, value, ttl_ms),
            Err(e) => tracing::debug!(error = %e, "Skipping cache write for unserializable value"),
        }
    }

    /// Remove every entry, regardless of bypass mode.
    pub fn clear(&self) {
        let removed = self.inner.len();
        self.inner.clear();
        if removed > 0 {
            tracing::debug!(removed, "Soft cache cleared");
        }
    }

    /// Drop expired entries without waiting for a read.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| now < entry.expires_at);
        before.saturating_sub(self.inner.len())
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl std::fmt::Debug for SoftCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftCache")
            .field("entries", &self.inner.len())
            .finish()
    }
}
