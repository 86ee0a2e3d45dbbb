//! Engine façade: lifecycle transitions, validation, dual writes, events.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use serde_json::json;

use metrik_engine::config::EngineConfig;
use metrik_engine::durable::DurableQuery;
use metrik_engine::engine::{EngineStatus, MetricsEngine, RecordRequest};
use metrik_engine::MetricQuery;

fn memory_only_config() -> EngineConfig {
    let mut cfg = EngineConfig::default();
    cfg.durable.path = String::new();
    cfg
}

fn durable_config(dir: &tempfile::TempDir) -> EngineConfig {
    let mut cfg = EngineConfig::default();
    cfg.durable.path = dir
        .path()
        .join("metrik.db")
        .to_string_lossy()
        .to_string();
    cfg
}

#[tokio::test]
async fn initialize_is_idempotent() {
    let engine = MetricsEngine::new(memory_only_config());
    assert_eq!(engine.status(), EngineStatus::Uninitialized);
    assert!(engine.initialize().await);
    assert!(engine.initialize().await);
    assert_eq!(engine.status(), EngineStatus::Initialized);
    assert!(engine.get_metric_definition("res.cpu_usage").is_some());
    assert!(!engine.get_available_metrics().is_empty());
}

#[tokio::test]
async fn record_requires_initialization() {
    let engine = MetricsEngine::new(memory_only_config());
    assert!(!engine.record_metric(RecordRequest::new("m", 1.0)).await);

    engine.initialize().await;
    assert!(engine.record_metric(RecordRequest::new("m", 1.0)).await);
    assert_eq!(engine.query_metrics(&MetricQuery::for_metric("m")).len(), 1);
}

#[tokio::test]
async fn unknown_metric_id_is_accepted() {
    let engine = MetricsEngine::new(memory_only_config());
    engine.initialize().await;
    assert!(
        engine
            .record_metric(RecordRequest::new("completely.new.metric", 3.0))
            .await
    );
}

#[tokio::test]
async fn defined_metric_type_is_enforced() {
    let engine = MetricsEngine::new(memory_only_config());
    engine.initialize().await;

    // float metric rejects non-numeric values
    assert!(
        !engine
            .record_metric(RecordRequest::new("res.cpu_usage", json!("not-a-number")))
            .await
    );
    // numeric-looking strings coerce and pass
    assert!(
        engine
            .record_metric(RecordRequest::new("res.cpu_usage", json!("42.5")))
            .await
    );
    // integer metric rejects fractional values
    assert!(
        !engine
            .record_metric(RecordRequest::new("res.token_usage", json!(1.5)))
            .await
    );
    assert!(
        engine
            .record_metric(RecordRequest::new("res.token_usage", json!(12)))
            .await
    );
}

#[tokio::test]
async fn numeric_values_reach_the_durable_store() {
    let dir = tempfile::tempdir().unwrap();
    let engine = MetricsEngine::new(durable_config(&dir));
    engine.initialize().await;

    assert!(
        engine
            .record_metric(
                RecordRequest::new("perf.response_time", 42.0).with_source("hermes")
            )
            .await
    );
    // non-numeric readings stay memory-only
    assert!(
        engine
            .record_metric(RecordRequest::new("custom.status", json!("healthy")))
            .await
    );

    let rows = engine
        .query_history(&DurableQuery::for_metric("perf.response_time"))
        .await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].source.as_deref(), Some("hermes"));

    let none = engine
        .query_history(&DurableQuery::for_metric("custom.status"))
        .await;
    assert!(none.is_empty());

    engine.stop().await;
}

#[tokio::test]
async fn subscribers_see_stored_records() {
    let engine = MetricsEngine::new(memory_only_config());
    engine.initialize().await;

    let mut events = engine.subscribe();
    engine
        .record_metric(RecordRequest::new("m", 7.0).with_tags(vec!["live".into()]))
        .await;

    let event = events.recv().await.unwrap();
    assert_eq!(event.record.metric_id, "m");
    assert_eq!(event.record.tags, vec!["live".to_string()]);
}

#[tokio::test]
async fn stop_without_start_is_safe() {
    let engine = MetricsEngine::new(memory_only_config());
    assert!(engine.stop().await);
    assert_eq!(engine.status(), EngineStatus::Stopped);
}

#[tokio::test]
async fn start_stop_cycle_and_terminal_stop() {
    let engine = MetricsEngine::new(memory_only_config());
    assert!(engine.start().await);
    assert_eq!(engine.status(), EngineStatus::Running);
    // starting twice is a no-op
    assert!(engine.start().await);

    assert!(engine.stop().await);
    assert_eq!(engine.status(), EngineStatus::Stopped);

    // stopped is terminal: no restart, no writes
    assert!(!engine.start().await);
    assert!(!engine.record_metric(RecordRequest::new("m", 1.0)).await);
}

#[tokio::test]
async fn durable_failure_degrades_to_memory_only() {
    // a directory path cannot be opened as a sqlite database
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = EngineConfig::default();
    cfg.durable.path = dir.path().to_string_lossy().to_string();

    let engine = MetricsEngine::new(cfg);
    assert!(engine.initialize().await);
    // memory path still works
    assert!(engine.record_metric(RecordRequest::new("m", 1.0)).await);
    assert!(engine.query_history(&DurableQuery::for_metric("m")).await.is_empty());
}
