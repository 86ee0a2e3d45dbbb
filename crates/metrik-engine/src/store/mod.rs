//! In-memory indexed time-series store with a write-through aggregation cache.
//!
//! One `RwLock` covers the record arena, the three secondary indices, and the
//! aggregation cache as a unit, so readers can never observe indices or cache
//! entries inconsistent with the record sequence mid-mutation.

mod cache;
mod memory;

use std::time::{Duration as StdDuration, Instant};

use chrono::{Duration, Utc};
use parking_lot::RwLock;

use metrik_core::aggregate::{
    compute, AggregateResult, BucketPoint, ScalarAggregate, SeriesAggregate,
};
use metrik_core::definition::Aggregation;
use metrik_core::record::MetricRecord;
use metrik_core::time::{self, format_iso, now_iso, parse_interval, parse_iso, parse_window};

use cache::{AggregationCache, CacheKey};
use memory::MemoryStore;

/// Default bound on in-memory records.
pub const DEFAULT_CAPACITY: usize = 10_000;
/// Default TTL for cached aggregation results.
pub const DEFAULT_CACHE_TTL: StdDuration = StdDuration::from_secs(300);

/// Internal limit used when re-querying for an aggregation.
const AGGREGATE_SCAN_LIMIT: usize = 100_000;

/// Point-query parameters. All filters are optional; combining filters is an
/// AND, except the tag list which matches a record carrying any of the tags.
#[derive(Debug, Clone)]
pub struct MetricQuery {
    pub metric_id: Option<String>,
    pub source: Option<String>,
    pub tags: Option<Vec<String>>,
    /// Inclusive lexical lower bound on the timestamp.
    pub start_time: Option<String>,
    /// Inclusive lexical upper bound on the timestamp.
    pub end_time: Option<String>,
    pub limit: usize,
    pub offset: usize,
    /// `field:asc|desc` over timestamp / metric_id / source / value.
    pub sort: String,
}

impl Default for MetricQuery {
    fn default() -> Self {
        Self {
            metric_id: None,
            source: None,
            tags: None,
            start_time: None,
            end_time: None,
            limit: 1000,
            offset: 0,
            sort: "timestamp:desc".to_string(),
        }
    }
}

impl MetricQuery {
    pub fn for_metric(metric_id: impl Into<String>) -> Self {
        Self {
            metric_id: Some(metric_id.into()),
            ..Self::default()
        }
    }
}

/// Aggregation parameters. The full tuple is the cache key.
#[derive(Debug, Clone)]
pub struct AggregateRequest {
    pub metric_id: String,
    /// Function name; unknown names yield a null scalar, never an error.
    pub aggregation: String,
    /// Bucket width shorthand (`5m`, `1h`, `1d`). Absent means one scalar.
    pub interval: Option<String>,
    pub source: Option<String>,
    pub tags: Option<Vec<String>>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    /// Lookback shorthand (`30m`, `6h`, `7d`, `2w`), resolved to
    /// `now - window .. now`. An explicit start/end range takes precedence.
    pub window: Option<String>,
}

impl AggregateRequest {
    pub fn new(metric_id: impl Into<String>, aggregation: impl Into<String>) -> Self {
        Self {
            metric_id: metric_id.into(),
            aggregation: aggregation.into(),
            interval: None,
            source: None,
            tags: None,
            start_time: None,
            end_time: None,
            window: None,
        }
    }

    pub fn with_interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = Some(interval.into());
        self
    }

    pub fn with_range(
        mut self,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
    ) -> Self {
        self.start_time = Some(start_time.into());
        self.end_time = Some(end_time.into());
        self
    }

    pub fn with_window(mut self, window: impl Into<String>) -> Self {
        self.window = Some(window.into());
        self
    }
}

/// Snapshot of store occupancy, consumed by the health sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub records: usize,
    pub capacity: usize,
    pub cached_aggregations: usize,
}

struct StoreInner {
    memory: MemoryStore,
    cache: AggregationCache,
}

/// Bounded in-memory metric store.
pub struct MetricsStore {
    inner: RwLock<StoreInner>,
    capacity: usize,
    cache_ttl: StdDuration,
}

impl Default for MetricsStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_CACHE_TTL)
    }
}

impl MetricsStore {
    pub fn new(capacity: usize, cache_ttl: StdDuration) -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                memory: MemoryStore::new(),
                cache: AggregationCache::new(),
            }),
            capacity: capacity.max(1),
            cache_ttl,
        }
    }

    /// Store one record. Returns `false` only when the metric id is missing.
    ///
    /// An empty timestamp is auto-filled with the current UTC time; this is
    /// the only mutation a record undergoes before storage. The append, the
    /// index update, the cache invalidation, and any eviction happen under
    /// one write lock.
    pub fn store(&self, mut record: MetricRecord) -> bool {
        if record.metric_id.is_empty() {
            tracing::error!("missing required field in metric: metric_id");
            return false;
        }
        if let metrik_core::record::MetricValue::Text(t) = &record.value {
            if t.is_empty() {
                tracing::error!(metric_id = %record.metric_id, "missing required field in metric: value");
                return false;
            }
        }
        if record.timestamp.is_empty() {
            record.timestamp = now_iso();
        }

        let metric_id = record.metric_id.clone();
        let mut inner = self.inner.write();
        inner.memory.append(record);
        inner.cache.invalidate_metric(&metric_id);
        if inner.memory.len() > self.capacity {
            inner.memory.trim_to(self.capacity);
        }
        true
    }

    /// Filtered point query: index intersection, inclusive lexical time
    /// bounds, stable sort, then offset/limit.
    pub fn query(&self, q: &MetricQuery) -> Vec<MetricRecord> {
        self.inner.read().memory.query(q)
    }

    /// Cached aggregation. Never errors: unknown functions and empty matched
    /// sets produce a null value.
    pub fn aggregate(&self, req: &AggregateRequest) -> AggregateResult {
        let now = Instant::now();
        let key = CacheKey::from_request(req);

        let mut inner = self.inner.write();
        if let Some(hit) = inner.cache.get(&key, now) {
            return hit;
        }

        let (start_time, end_time) = Self::resolve_range(req);
        let records = inner.memory.query(&MetricQuery {
            metric_id: Some(req.metric_id.clone()),
            source: req.source.clone(),
            tags: req.tags.clone(),
            start_time: start_time.clone(),
            end_time: end_time.clone(),
            limit: AGGREGATE_SCAN_LIMIT,
            offset: 0,
            sort: "timestamp:asc".to_string(),
        });

        let Some(aggregation) = Aggregation::parse(&req.aggregation) else {
            tracing::warn!(aggregation = %req.aggregation, "unknown aggregation function");
            return AggregateResult::Scalar(ScalarAggregate {
                metric_id: req.metric_id.clone(),
                aggregation: req.aggregation.clone(),
                value: None,
                count: records.len(),
            });
        };

        let result = match req.interval.as_deref().map(parse_interval) {
            Some(Some(width)) => Self::aggregate_series(
                req,
                aggregation,
                &records,
                width,
                start_time.as_deref(),
                end_time.as_deref(),
            ),
            Some(None) => {
                tracing::warn!(interval = ?req.interval, "unparsable interval, computing scalar");
                Self::aggregate_scalar(req, aggregation, &records)
            }
            None => Self::aggregate_scalar(req, aggregation, &records),
        };

        inner.cache.insert(key, result.clone(), now + self.cache_ttl);
        result
    }

    /// Effective time range of a request. Explicit bounds win; a lookback
    /// window resolves to `now - window .. now`; an unparsable window is
    /// ignored with a warning.
    fn resolve_range(req: &AggregateRequest) -> (Option<String>, Option<String>) {
        if req.start_time.is_some() || req.end_time.is_some() {
            return (req.start_time.clone(), req.end_time.clone());
        }
        let Some(raw) = req.window.as_deref() else {
            return (None, None);
        };
        match parse_window(raw) {
            Some(span) => {
                let end = Utc::now();
                (Some(format_iso(end - span)), Some(format_iso(end)))
            }
            None => {
                tracing::warn!(window = %raw, "unparsable window, using default range");
                (None, None)
            }
        }
    }

    fn aggregate_scalar(
        req: &AggregateRequest,
        aggregation: Aggregation,
        records: &[MetricRecord],
    ) -> AggregateResult {
        let values: Vec<f64> = records.iter().filter_map(|r| r.value.as_f64()).collect();
        AggregateResult::Scalar(ScalarAggregate {
            metric_id: req.metric_id.clone(),
            aggregation: aggregation.as_str().to_string(),
            value: compute(&values, aggregation),
            count: records.len(),
        })
    }

    fn aggregate_series(
        req: &AggregateRequest,
        aggregation: Aggregation,
        records: &[MetricRecord],
        width: Duration,
        start_time: Option<&str>,
        end_time: Option<&str>,
    ) -> AggregateResult {
        let now = Utc::now();
        let start = start_time
            .and_then(parse_iso)
            .unwrap_or_else(|| now - Duration::days(1));
        let end = end_time.and_then(parse_iso).unwrap_or(now);

        let buckets = time::partition(start, end, width);
        let mut grouped: Vec<(Vec<f64>, usize)> = vec![(Vec::new(), 0); buckets.len()];
        for rec in records {
            let Some(ts) = parse_iso(&rec.timestamp) else {
                continue;
            };
            let Some(idx) = time::bucket_index(ts, start, end, width, buckets.len()) else {
                continue;
            };
            grouped[idx].1 += 1;
            if let Some(v) = rec.value.as_f64() {
                grouped[idx].0.push(v);
            }
        }

        let time_series = buckets
            .into_iter()
            .zip(grouped)
            .map(|(bucket, (values, count))| BucketPoint {
                start_time: bucket.start,
                end_time: bucket.end,
                value: compute(&values, aggregation),
                count,
            })
            .collect();

        AggregateResult::Series(SeriesAggregate {
            metric_id: req.metric_id.clone(),
            aggregation: aggregation.as_str().to_string(),
            interval: req.interval.clone().unwrap_or_default(),
            time_series,
        })
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.read();
        StoreStats {
            records: inner.memory.len(),
            capacity: self.capacity,
            cached_aggregations: inner.cache.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Timestamp of the oldest live record, the memory horizon.
    pub fn oldest_timestamp(&self) -> Option<String> {
        self.inner.read().memory.oldest_timestamp()
    }

    /// Verify that every index entry points at exactly the live records
    /// matching its key. Used by the health sampler and by tests.
    pub fn indices_consistent(&self) -> bool {
        self.inner.read().memory.indices_consistent()
    }
}
