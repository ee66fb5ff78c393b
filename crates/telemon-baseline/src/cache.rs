use crate::statistics::StatisticalSummary;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Default time-to-live for cached summaries (dashboard refresh cadence).
pub const DEFAULT_TTL_SECS: i64 = 600;

/// Identifies one cached summary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub device_id: String,
    pub sensor_id: String,
    /// Time range the series was fetched for (e.g. `"24h"`).
    pub range: String,
    /// Aggregation level of the series (e.g. `"raw"`, `"1m"`).
    pub aggregation: String,
}

/// TTL cache for statistical summaries.
///
/// Entries are invalidated purely by expiry: recomputing from the full
/// series is always correct, so there is no partial-update path. Callers
/// pass `now` explicitly, which keeps the cache deterministic under test.
pub struct SummaryCache {
    ttl: Duration,
    entries: HashMap<CacheKey, (DateTime<Utc>, StatisticalSummary)>,
}

impl Default for SummaryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECS)
    }
}

impl SummaryCache {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs),
            entries: HashMap::new(),
        }
    }

    /// Fetch a fresh cached summary, if any.
    pub fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<&StatisticalSummary> {
        self.entries
            .get(key)
            .filter(|(cached_at, _)| now - *cached_at < self.ttl)
            .map(|(_, summary)| summary)
    }

    /// Return the cached summary for `key`, or run `compute` and cache its
    /// result. Expired entries are overwritten in place.
    pub fn get_or_compute<F>(
        &mut self,
        key: CacheKey,
        now: DateTime<Utc>,
        compute: F,
    ) -> StatisticalSummary
    where
        F: FnOnce() -> StatisticalSummary,
    {
        if let Some((cached_at, summary)) = self.entries.get(&key) {
            if now - *cached_at < self.ttl {
                tracing::debug!(
                    device_id = %key.device_id,
                    sensor_id = %key.sensor_id,
                    "summary cache hit"
                );
                return summary.clone();
            }
        }

        tracing::debug!(
            device_id = %key.device_id,
            sensor_id = %key.sensor_id,
            "summary cache miss, recomputing"
        );
        let summary = compute();
        self.entries.insert(key, (now, summary.clone()));
        summary
    }

    /// Drop every expired entry.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, (cached_at, _)| now - *cached_at < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
