//! Result cache storage.
//!
//! Maps normalized expression text to the boolean it last evaluated to.
//! Entries expire a fixed time after insertion and are evicted lazily on
//! lookup, or in bulk via [`ResultCache::purge_expired`].

use std::time::{Duration, Instant};

use dashmap::DashMap;
use metrics::counter;
use tracing::debug;

pub(crate) const METRIC_RESULT_CACHE_HIT: &str = "condeval_result_cache_hit_total";
pub(crate) const METRIC_RESULT_CACHE_MISS: &str = "condeval_result_cache_miss_total";
pub(crate) const METRIC_RESULT_CACHE_EXPIRED: &str = "condeval_result_cache_expired_total";

#[derive(Debug, Clone, Copy)]
struct CachedResult {
    value: bool,
    inserted_at: Instant,
}

impl CachedResult {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) < ttl
    }
}

/// Concurrent TTL map from normalized expression to boolean result.
#[derive(Debug)]
pub struct ResultCache {
    ttl: Duration,
    entries: DashMap<String, CachedResult>,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached result for `key`, or `None` when absent or older than the TTL.
    pub fn get(&self, key: &str) -> Option<bool> {
        let now = Instant::now();
        let lookup = self
            .entries
            .get(key)
            .map(|entry| (entry.value, entry.is_fresh(now, self.ttl)));

        match lookup {
            Some((value, true)) => {
                counter!(METRIC_RESULT_CACHE_HIT).increment(1);
                Some(value)
            }
            Some((_, false)) => {
                let ttl = self.ttl;
                self.entries
                    .remove_if(key, |_, entry| !entry.is_fresh(now, ttl));
                counter!(METRIC_RESULT_CACHE_EXPIRED).increment(1);
                counter!(METRIC_RESULT_CACHE_MISS).increment(1);
                debug!(key, "Evicted expired condition result");
                None
            }
            None => {
                counter!(METRIC_RESULT_CACHE_MISS).increment(1);
                None
            }
        }
    }

    /// Store `value` for `key`, restarting its TTL.
    pub fn put(&self, key: impl Into<String>, value: bool) {
        self.entries.insert(
            key.into(),
            CachedResult {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now, self.ttl));
        before.saturating_sub(self.entries.len())
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones included until evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
