//! Durable backing store contract.
//!
//! The engine dual-writes numeric readings to a durable store for retention
//! beyond the memory horizon. The memory write is authoritative; durable
//! failures are logged and degrade the engine to memory-only operation. Any
//! backend satisfying this trait is acceptable; its internal schema and
//! indexing are its own business.

mod sqlite;

use async_trait::async_trait;
use serde_json::Value;

use metrik_core::record::MetricRecord;
use metrik_core::Result;

pub use sqlite::SqliteMetricsStore;

/// One row to persist.
#[derive(Debug, Clone)]
pub struct DurableAppend {
    /// Producing component (the record source, or the engine's own name).
    pub component: String,
    pub metric_name: String,
    pub value: f64,
    pub unit: Option<String>,
    pub tags: Vec<String>,
    pub context: Option<Value>,
    pub timestamp: String,
}

/// Filters for a durable point query.
#[derive(Debug, Clone, Default)]
pub struct DurableQuery {
    pub component: Option<String>,
    pub metric_name: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub limit: usize,
}

impl DurableQuery {
    pub fn for_metric(metric_name: impl Into<String>) -> Self {
        Self {
            metric_name: Some(metric_name.into()),
            limit: 1000,
            ..Self::default()
        }
    }
}

/// Append-only persisted metric store.
#[async_trait]
pub trait DurableMetricsStore: Send + Sync {
    async fn append(&self, row: DurableAppend) -> Result<()>;

    async fn query(&self, filter: &DurableQuery) -> Result<Vec<MetricRecord>>;

    /// Delete rows with `timestamp < cutoff`. Returns the deleted count.
    async fn delete_older_than(&self, cutoff: &str) -> Result<u64>;

    /// Close the backing connection. Appends after close fail with a
    /// storage error.
    async fn close(&self) -> Result<()>;
}
