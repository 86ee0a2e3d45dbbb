//! Aggregation result cache with write-through invalidation.
//!
//! Keys are the full aggregation parameter tuple. Any write for a metric id
//! removes every entry for that id immediately; expired entries are dropped
//! lazily on lookup.

use std::collections::HashMap;
use std::time::Instant;

use metrik_core::aggregate::AggregateResult;

use super::AggregateRequest;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) struct CacheKey {
    metric_id: String,
    aggregation: String,
    interval: Option<String>,
    source: Option<String>,
    tags: Vec<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    window: Option<String>,
}

impl CacheKey {
    pub(super) fn from_request(req: &AggregateRequest) -> Self {
        Self {
            metric_id: req.metric_id.clone(),
            aggregation: req.aggregation.clone(),
            interval: req.interval.clone(),
            source: req.source.clone(),
            tags: req.tags.clone().unwrap_or_default(),
            start_time: req.start_time.clone(),
            end_time: req.end_time.clone(),
            window: req.window.clone(),
        }
    }
}

struct CacheEntry {
    result: AggregateResult,
    expires_at: Instant,
}

#[derive(Default)]
pub(super) struct AggregationCache {
    entries: HashMap<CacheKey, CacheEntry>,
}

impl AggregationCache {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn get(&mut self, key: &CacheKey, now: Instant) -> Option<AggregateResult> {
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.result.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub(super) fn insert(&mut self, key: CacheKey, result: AggregateResult, expires_at: Instant) {
        self.entries.insert(key, CacheEntry { result, expires_at });
    }

    /// Drop every cached result for a metric id (new write invalidates).
    pub(super) fn invalidate_metric(&mut self, metric_id: &str) {
        self.entries.retain(|key, _| key.metric_id != metric_id);
    }

    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }
}
