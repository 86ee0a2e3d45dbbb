//! Aggregation semantics: scalar functions, percentile interpolation,
//! time-bucketed series, null handling.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use metrik_core::aggregate::AggregateResult;
use metrik_core::record::MetricRecord;
use metrik_core::time::format_iso;
use metrik_engine::{AggregateRequest, MetricsStore};

fn record(metric_id: &str, value: f64, ts: &str) -> MetricRecord {
    MetricRecord::new(metric_id, value).with_timestamp(ts)
}

/// Five cpu readings one minute apart, as in the reference scenario.
fn cpu_store() -> MetricsStore {
    let store = MetricsStore::default();
    for (i, v) in [10.0, 20.0, 30.0, 40.0, 50.0].into_iter().enumerate() {
        store.store(record(
            "res.cpu_usage",
            v,
            &format!("2026-08-28T10:{i:02}:00.000000Z"),
        ));
    }
    store
}

#[test]
fn scenario_avg_and_p95() {
    let store = cpu_store();

    let avg = store.aggregate(&AggregateRequest::new("res.cpu_usage", "avg"));
    assert_eq!(avg.scalar_value(), Some(30.0));

    // sorted [10,20,30,40,50]: rank (5-1)*0.95 = 3.8 -> 40 + 0.8*(50-40) = 48
    let p95 = store.aggregate(&AggregateRequest::new("res.cpu_usage", "p95"));
    assert!((p95.scalar_value().unwrap() - 48.0).abs() < 1e-9);
}

#[test]
fn scalar_carries_match_count() {
    let store = cpu_store();
    match store.aggregate(&AggregateRequest::new("res.cpu_usage", "count")) {
        AggregateResult::Scalar(s) => {
            assert_eq!(s.value, Some(5.0));
            assert_eq!(s.count, 5);
        }
        AggregateResult::Series(_) => panic!("expected scalar"),
    }
}

#[test]
fn empty_match_is_null_not_zero() {
    let store = MetricsStore::default();
    let res = store.aggregate(&AggregateRequest::new("nothing.here", "count"));
    match res {
        AggregateResult::Scalar(s) => {
            assert_eq!(s.value, None);
            assert_eq!(s.count, 0);
        }
        AggregateResult::Series(_) => panic!("expected scalar"),
    }
}

#[test]
fn unknown_aggregation_returns_null_never_errors() {
    let store = cpu_store();
    let res = store.aggregate(&AggregateRequest::new("res.cpu_usage", "median"));
    match res {
        AggregateResult::Scalar(s) => {
            assert_eq!(s.aggregation, "median");
            assert_eq!(s.value, None);
        }
        AggregateResult::Series(_) => panic!("expected scalar"),
    }
}

#[test]
fn hourly_buckets_are_half_open() {
    let store = MetricsStore::default();
    let t0 = "2026-08-28T00:00:00.000000Z";
    let end = "2026-08-28T03:00:00.000000Z";
    store.store(record("m", 1.0, "2026-08-28T00:30:00.000000Z"));
    store.store(record("m", 2.0, "2026-08-28T01:30:00.000000Z"));
    store.store(record("m", 4.0, "2026-08-28T01:45:00.000000Z"));
    // boundary record belongs to the bucket it opens
    store.store(record("m", 8.0, "2026-08-28T02:00:00.000000Z"));

    let req = AggregateRequest::new("m", "sum")
        .with_interval("1h")
        .with_range(t0, end);
    let res = store.aggregate(&req);
    let series = match res {
        AggregateResult::Series(s) => s,
        AggregateResult::Scalar(_) => panic!("expected series"),
    };

    assert_eq!(series.time_series.len(), 3);
    assert_eq!(series.time_series[0].value, Some(1.0));
    assert_eq!(series.time_series[1].value, Some(6.0));
    assert_eq!(series.time_series[2].value, Some(8.0));
    assert_eq!(series.time_series[0].start_time, t0);
    assert_eq!(series.time_series[2].end_time, end);
}

#[test]
fn empty_bucket_yields_null() {
    let store = MetricsStore::default();
    store.store(record("m", 5.0, "2026-08-28T00:10:00.000000Z"));
    store.store(record("m", 7.0, "2026-08-28T02:10:00.000000Z"));

    let req = AggregateRequest::new("m", "avg")
        .with_interval("1h")
        .with_range("2026-08-28T00:00:00.000000Z", "2026-08-28T03:00:00.000000Z");
    let series = match store.aggregate(&req) {
        AggregateResult::Series(s) => s,
        AggregateResult::Scalar(_) => panic!("expected series"),
    };

    assert_eq!(series.time_series[0].value, Some(5.0));
    assert_eq!(series.time_series[1].value, None);
    assert_eq!(series.time_series[1].count, 0);
    assert_eq!(series.time_series[2].value, Some(7.0));
}

#[test]
fn final_bucket_clipped_at_range_end() {
    let store = MetricsStore::default();
    let req = AggregateRequest::new("m", "avg")
        .with_interval("1h")
        .with_range("2026-08-28T00:00:00.000000Z", "2026-08-28T02:30:00.000000Z");
    let series = match store.aggregate(&req) {
        AggregateResult::Series(s) => s,
        AggregateResult::Scalar(_) => panic!("expected series"),
    };
    assert_eq!(series.time_series.len(), 3);
    assert_eq!(
        series.time_series[2].end_time,
        "2026-08-28T02:30:00.000000Z"
    );
}

#[test]
fn source_and_tag_filters_narrow_aggregation() {
    let store = MetricsStore::default();
    store.store(record("m", 10.0, "2026-08-28T00:00:01.000000Z").with_source("a"));
    store.store(record("m", 30.0, "2026-08-28T00:00:02.000000Z").with_source("b"));

    let mut req = AggregateRequest::new("m", "avg");
    req.source = Some("a".into());
    assert_eq!(store.aggregate(&req).scalar_value(), Some(10.0));
}

#[test]
fn window_limits_lookback() {
    let store = MetricsStore::default();
    let now = chrono::Utc::now();
    store.store(record("m", 10.0, &format_iso(now - chrono::Duration::minutes(10))));
    store.store(record("m", 99.0, &format_iso(now - chrono::Duration::days(3))));

    let windowed = AggregateRequest::new("m", "avg").with_window("1h");
    assert_eq!(store.aggregate(&windowed).scalar_value(), Some(10.0));

    // no window: both readings count
    let all = store.aggregate(&AggregateRequest::new("m", "avg"));
    assert_eq!(all.scalar_value(), Some(54.5));
}

#[test]
fn explicit_range_beats_window() {
    let store = MetricsStore::default();
    let now = chrono::Utc::now();
    let old_ts = format_iso(now - chrono::Duration::days(3));
    store.store(record("m", 10.0, &format_iso(now - chrono::Duration::minutes(10))));
    store.store(record("m", 99.0, &old_ts));

    let req = AggregateRequest::new("m", "avg")
        .with_window("1h")
        .with_range(format_iso(now - chrono::Duration::days(4)), old_ts);
    assert_eq!(store.aggregate(&req).scalar_value(), Some(99.0));
}

#[test]
fn unparsable_window_is_ignored() {
    let store = MetricsStore::default();
    let now = chrono::Utc::now();
    store.store(record("m", 10.0, &format_iso(now - chrono::Duration::minutes(10))));
    store.store(record("m", 99.0, &format_iso(now - chrono::Duration::days(3))));

    let req = AggregateRequest::new("m", "avg").with_window("soon");
    assert_eq!(store.aggregate(&req).scalar_value(), Some(54.5));
}

#[test]
fn non_numeric_values_are_skipped_in_math() {
    let store = MetricsStore::default();
    store.store(record("m", 10.0, "2026-08-28T00:00:01.000000Z"));
    store.store(
        MetricRecord::new("m", "degraded").with_timestamp("2026-08-28T00:00:02.000000Z"),
    );

    let avg = store.aggregate(&AggregateRequest::new("m", "avg"));
    assert_eq!(avg.scalar_value(), Some(10.0));
    // the count still reflects every matched record
    match store.aggregate(&AggregateRequest::new("m", "avg")) {
        AggregateResult::Scalar(s) => assert_eq!(s.count, 2),
        AggregateResult::Series(_) => panic!("expected scalar"),
    }
}
