//! Engine façade: validation, dual persistence, background-task lifecycle,
//! and the definition registry.
//!
//! The engine is an explicit process-wide handle: constructed once, cloned
//! freely (`Arc`-backed), torn down with `stop()`. Lifecycle is
//! `Uninitialized -> Initialized -> Running -> Stopped`; `Stopped` is
//! terminal for the instance.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use metrik_core::aggregate::AggregateResult;
use metrik_core::definition::{builtin_definitions, MetricDefinition, ValueType};
use metrik_core::record::{MetricRecord, MetricValue};
use metrik_core::time::now_iso;

use crate::config::EngineConfig;
use crate::durable::{DurableAppend, DurableMetricsStore, DurableQuery, SqliteMetricsStore};
use crate::notify::{EventHub, MetricEvent};
use crate::store::{AggregateRequest, MetricQuery, MetricsStore, StoreStats};
use crate::tasks;

/// Source label for metrics the engine records about itself.
pub const ENGINE_SOURCE: &str = "metrik.engine";

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Uninitialized,
    Initialized,
    Running,
    Stopped,
}

/// One producer observation, pre-coercion.
#[derive(Debug, Clone)]
pub struct RecordRequest {
    pub metric_id: String,
    pub value: Value,
    pub source: Option<String>,
    pub timestamp: Option<String>,
    pub context: Option<Value>,
    pub tags: Option<Vec<String>>,
}

impl RecordRequest {
    pub fn new(metric_id: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            metric_id: metric_id.into(),
            value: value.into(),
            source: None,
            timestamp: None,
            context: None,
            tags: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_timestamp(mut self, ts: impl Into<String>) -> Self {
        self.timestamp = Some(ts.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

struct EngineInner {
    cfg: EngineConfig,
    store: MetricsStore,
    definitions: DashMap<String, Arc<MetricDefinition>>,
    durable: Mutex<Option<Arc<dyn DurableMetricsStore>>>,
    events: EventHub,
    status: Mutex<EngineStatus>,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Public metrics engine handle. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct MetricsEngine {
    inner: Arc<EngineInner>,
}

impl MetricsEngine {
    pub fn new(cfg: EngineConfig) -> Self {
        let store = MetricsStore::new(
            cfg.store.capacity,
            Duration::from_secs(cfg.store.cache_ttl_secs),
        );
        Self {
            inner: Arc::new(EngineInner {
                cfg,
                store,
                definitions: DashMap::new(),
                durable: Mutex::new(None),
                events: EventHub::new(),
                status: Mutex::new(EngineStatus::Uninitialized),
                shutdown: Mutex::new(None),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn status(&self) -> EngineStatus {
        *self.inner.status.lock()
    }

    /// Load the definition table and obtain a durable-store handle.
    ///
    /// Idempotent: a second call is a logged no-op. Durable-store failure
    /// degrades to memory-only operation and is not fatal.
    pub async fn initialize(&self) -> bool {
        match self.status() {
            EngineStatus::Uninitialized => {}
            EngineStatus::Stopped => {
                tracing::warn!("initialize after stop is not supported");
                return false;
            }
            _ => {
                tracing::debug!("metrics engine already initialized");
                return true;
            }
        }

        tracing::info!("initializing metrics engine");
        for def in builtin_definitions() {
            self.inner
                .definitions
                .insert(def.metric_id.clone(), Arc::new(def));
        }

        let path = self.inner.cfg.durable.path.clone();
        if path.is_empty() {
            tracing::info!("durable store disabled by config, memory-only mode");
        } else {
            if let Some(parent) = Path::new(&path).parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match SqliteMetricsStore::open(&path) {
                Ok(store) => {
                    *self.inner.durable.lock() = Some(Arc::new(store));
                    tracing::info!(%path, "durable metrics store opened");
                }
                Err(e) => {
                    tracing::warn!(%path, error = %e, "durable store unavailable, memory-only mode");
                }
            }
        }

        *self.inner.status.lock() = EngineStatus::Initialized;
        tracing::info!(definitions = self.inner.definitions.len(), "metrics engine initialized");
        true
    }

    /// Record one observation.
    ///
    /// The in-memory write is authoritative and synchronous. Numeric values
    /// are additionally appended to the durable store, best effort: a durable
    /// failure is logged and does not fail the call. The real-time event
    /// publish can never fail the call either.
    pub async fn record_metric(&self, req: RecordRequest) -> bool {
        match self.status() {
            EngineStatus::Initialized | EngineStatus::Running => {}
            state => {
                tracing::warn!(?state, metric_id = %req.metric_id, "record_metric outside lifecycle");
                return false;
            }
        }

        let record = MetricRecord {
            metric_id: req.metric_id,
            value: MetricValue::coerce(&req.value),
            timestamp: req.timestamp.unwrap_or_else(now_iso),
            source: req.source,
            tags: req.tags.unwrap_or_default(),
            context: req.context,
        };

        if !self.validate(&record) {
            return false;
        }
        if !self.inner.store.store(record.clone()) {
            return false;
        }

        if let Some(value) = record.value.as_f64() {
            let durable = self.inner.durable.lock().clone();
            if let Some(durable) = durable {
                let unit = self
                    .get_metric_definition(&record.metric_id)
                    .map(|d| d.unit.clone());
                let row = DurableAppend {
                    component: record
                        .source
                        .clone()
                        .unwrap_or_else(|| "unknown".to_string()),
                    metric_name: record.metric_id.clone(),
                    value,
                    unit,
                    tags: record.tags.clone(),
                    context: record.context.clone(),
                    timestamp: record.timestamp.clone(),
                };
                if let Err(e) = durable.append(row).await {
                    tracing::warn!(metric_id = %record.metric_id, error = %e,
                        "durable append failed, memory write retained");
                }
            }
        }

        self.inner.events.publish(record);
        true
    }

    /// Type-check a record against its definition. Unknown metric ids skip
    /// validation entirely; the registry is open by contract.
    pub fn validate(&self, record: &MetricRecord) -> bool {
        let Some(def) = self.get_metric_definition(&record.metric_id) else {
            tracing::warn!(metric_id = %record.metric_id, "unknown metric type, accepting");
            return true;
        };

        let numeric = record.value.as_f64();
        match def.value_type {
            ValueType::Float => {
                if numeric.is_none() {
                    tracing::error!(metric_id = %record.metric_id, value = ?record.value,
                        "invalid value: expected float");
                    return false;
                }
            }
            ValueType::Integer => match numeric {
                Some(v) if v.fract() == 0.0 => {}
                _ => {
                    tracing::error!(metric_id = %record.metric_id, value = ?record.value,
                        "invalid value: expected integer");
                    return false;
                }
            },
        }
        true
    }

    /// Pass-through point query against the in-memory store.
    pub fn query_metrics(&self, q: &MetricQuery) -> Vec<MetricRecord> {
        self.inner.store.query(q)
    }

    /// Pass-through cached aggregation against the in-memory store.
    pub fn aggregate_metrics(&self, req: &AggregateRequest) -> AggregateResult {
        self.inner.store.aggregate(req)
    }

    /// Query the durable store directly, for data beyond the memory horizon.
    /// Best effort: unavailable or failing storage yields an empty result.
    pub async fn query_history(&self, filter: &DurableQuery) -> Vec<MetricRecord> {
        let durable = self.inner.durable.lock().clone();
        let Some(durable) = durable else {
            return Vec::new();
        };
        match durable.query(filter).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "durable query failed");
                Vec::new()
            }
        }
    }

    pub fn get_metric_definition(&self, metric_id: &str) -> Option<Arc<MetricDefinition>> {
        self.inner.definitions.get(metric_id).map(|e| e.value().clone())
    }

    pub fn get_available_metrics(&self) -> Vec<Arc<MetricDefinition>> {
        let mut defs: Vec<Arc<MetricDefinition>> = self
            .inner
            .definitions
            .iter()
            .map(|e| e.value().clone())
            .collect();
        defs.sort_by(|a, b| a.metric_id.cmp(&b.metric_id));
        defs
    }

    pub fn store_stats(&self) -> StoreStats {
        self.inner.store.stats()
    }

    pub fn indices_consistent(&self) -> bool {
        self.inner.store.indices_consistent()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn durable(&self) -> Option<Arc<dyn DurableMetricsStore>> {
        self.inner.durable.lock().clone()
    }

    /// Launch the background loops. Initializes first if needed. Running
    /// twice is a no-op; starting after `stop()` is refused.
    pub async fn start(&self) -> bool {
        match self.status() {
            EngineStatus::Running => return true,
            EngineStatus::Stopped => {
                tracing::error!("cannot restart a stopped metrics engine");
                return false;
            }
            EngineStatus::Uninitialized => {
                if !self.initialize().await {
                    return false;
                }
            }
            EngineStatus::Initialized => {}
        }

        tracing::info!("starting metrics engine");
        let (tx, rx) = watch::channel(false);
        let sampling = &self.inner.cfg.sampling;

        let handles = vec![
            tokio::spawn(tasks::resource_sampler(
                self.clone(),
                rx.clone(),
                Duration::from_secs(sampling.resource_interval_secs),
            )),
            tokio::spawn(tasks::health_sampler(
                self.clone(),
                rx.clone(),
                Duration::from_secs(sampling.health_interval_secs),
            )),
            tokio::spawn(tasks::retention_sweep(
                self.clone(),
                rx,
                Duration::from_secs(sampling.retention_interval_secs),
                self.inner.cfg.durable.retention_days,
            )),
        ];

        *self.inner.shutdown.lock() = Some(tx);
        *self.inner.tasks.lock() = handles;
        *self.inner.status.lock() = EngineStatus::Running;
        tracing::info!("metrics engine started");
        true
    }

    /// Tear down: flag -> cancel -> await -> close durable, in that order,
    /// so no background task can write after the durable store closes.
    /// Safe to call without a prior `start()`.
    pub async fn stop(&self) -> bool {
        tracing::info!("stopping metrics engine");

        if let Some(tx) = self.inner.shutdown.lock().take() {
            let _ = tx.send(true);
        }

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.inner.tasks.lock());
        for handle in handles {
            handle.abort();
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    tracing::warn!(error = %e, "background task ended abnormally");
                }
            }
        }

        let durable = self.inner.durable.lock().take();
        if let Some(durable) = durable {
            if let Err(e) = durable.close().await {
                tracing::warn!(error = %e, "durable store close failed");
            }
        }

        *self.inner.status.lock() = EngineStatus::Stopped;
        tracing::info!("metrics engine stopped");
        true
    }
}
