//! Background loops: resource sampler, health sampler, retention sweep.
//!
//! Each loop waits on `tokio::select!` over its interval tick and the shared
//! shutdown watch channel, so stop latency is bounded by the select wakeup
//! rather than the task period. Per-iteration errors are logged and the loop
//! continues; only shutdown (or cancellation) ends a loop.

use std::time::Duration;

use chrono::Utc;
use sysinfo::{Pid, System};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use metrik_core::time::format_iso;
use metrik_core::{MetrikError, Result};

use crate::engine::{MetricsEngine, RecordRequest, ENGINE_SOURCE};

fn make_ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Sample this process's CPU and memory on a fixed period.
pub(crate) async fn resource_sampler(
    engine: MetricsEngine,
    mut shutdown: watch::Receiver<bool>,
    period: Duration,
) {
    let mut sys = System::new();
    let pid = sysinfo::get_current_pid().ok();
    let mut ticker = make_ticker(period);

    loop {
        tokio::select! {
            res = shutdown.changed() => {
                if res.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if let Err(e) = sample_resources(&engine, &mut sys, pid).await {
                    tracing::warn!(error = %e, "resource sample failed");
                }
            }
        }
    }
    tracing::debug!("resource sampler stopped");
}

async fn sample_resources(
    engine: &MetricsEngine,
    sys: &mut System,
    pid: Option<Pid>,
) -> Result<()> {
    let pid = pid.ok_or_else(|| MetrikError::Internal("current pid unavailable".into()))?;
    sys.refresh_process(pid);
    let process = sys
        .process(pid)
        .ok_or_else(|| MetrikError::Internal("own process not visible".into()))?;

    let cpu = f64::from(process.cpu_usage());
    let memory_mb = process.memory() as f64 / (1024.0 * 1024.0);

    engine
        .record_metric(RecordRequest::new("res.cpu_usage", cpu).with_source(ENGINE_SOURCE))
        .await;
    engine
        .record_metric(RecordRequest::new("res.memory_usage", memory_mb).with_source(ENGINE_SOURCE))
        .await;
    Ok(())
}

/// Record component health on a fixed period: store occupancy, cache size,
/// index consistency, durable availability.
pub(crate) async fn health_sampler(
    engine: MetricsEngine,
    mut shutdown: watch::Receiver<bool>,
    period: Duration,
) {
    let mut ticker = make_ticker(period);

    loop {
        tokio::select! {
            res = shutdown.changed() => {
                if res.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                sample_health(&engine).await;
            }
        }
    }
    tracing::debug!("health sampler stopped");
}

async fn sample_health(engine: &MetricsEngine) {
    let stats = engine.store_stats();
    let consistent = engine.indices_consistent();
    if !consistent {
        tracing::error!("store indices inconsistent with record sequence");
    }

    // engine.* ids are deliberately undefined: the registry accepts them
    for (metric_id, value) in [
        ("engine.store_records", stats.records as f64),
        ("engine.cache_entries", stats.cached_aggregations as f64),
        (
            "engine.durable_available",
            if engine.durable().is_some() { 1.0 } else { 0.0 },
        ),
        ("ops.uptime", if consistent { 100.0 } else { 0.0 }),
    ] {
        engine
            .record_metric(RecordRequest::new(metric_id, value).with_source(ENGINE_SOURCE))
            .await;
    }
}

/// Sweep the durable store hourly, deleting rows past the retention horizon.
pub(crate) async fn retention_sweep(
    engine: MetricsEngine,
    mut shutdown: watch::Receiver<bool>,
    period: Duration,
    retention_days: u32,
) {
    let mut ticker = make_ticker(period);
    // the immediate first tick would sweep at startup; skip it
    ticker.tick().await;

    loop {
        tokio::select! {
            res = shutdown.changed() => {
                if res.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if let Err(e) = sweep_once(&engine, retention_days).await {
                    tracing::warn!(error = %e, "retention sweep failed");
                }
            }
        }
    }
    tracing::debug!("retention sweep stopped");
}

async fn sweep_once(engine: &MetricsEngine, retention_days: u32) -> Result<()> {
    let Some(durable) = engine.durable() else {
        return Ok(());
    };
    let cutoff = format_iso(Utc::now() - chrono::Duration::days(i64::from(retention_days)));
    let deleted = durable.delete_older_than(&cutoff).await?;
    if deleted > 0 {
        tracing::info!(deleted, %cutoff, "retention sweep removed durable rows");
    }
    Ok(())
}
