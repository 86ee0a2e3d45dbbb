//! In-memory store properties: round trip, index consistency, eviction,
//! cache invalidation.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use metrik_core::record::{MetricRecord, MetricValue};
use metrik_engine::{AggregateRequest, MetricQuery, MetricsStore};

fn record(metric_id: &str, value: f64, ts: &str) -> MetricRecord {
    MetricRecord::new(metric_id, value).with_timestamp(ts)
}

fn ts(minute: u32) -> String {
    format!("2026-08-28T10:{minute:02}:00.000000Z")
}

#[test]
fn store_then_query_round_trip() {
    let store = MetricsStore::default();
    let rec = record("perf.response_time", 12.5, &ts(0))
        .with_source("hermes")
        .with_tags(vec!["api".into(), "prod".into()]);
    assert!(store.store(rec.clone()));

    let got = store.query(&MetricQuery::for_metric("perf.response_time"));
    assert_eq!(got, vec![rec]);
}

#[test]
fn missing_metric_id_is_rejected() {
    let store = MetricsStore::default();
    assert!(!store.store(MetricRecord::new("", 1.0)));
    assert!(store.is_empty());
}

#[test]
fn empty_timestamp_is_auto_filled() {
    let store = MetricsStore::default();
    assert!(store.store(MetricRecord::new("perf.throughput", 5.0)));
    let got = store.query(&MetricQuery::for_metric("perf.throughput"));
    assert!(got[0].timestamp.ends_with('Z'));
    assert!(!got[0].timestamp.is_empty());
}

#[test]
fn filters_intersect_and_tags_union() {
    let store = MetricsStore::default();
    store.store(
        record("m", 1.0, &ts(0))
            .with_source("a")
            .with_tags(vec!["x".into()]),
    );
    store.store(
        record("m", 2.0, &ts(1))
            .with_source("b")
            .with_tags(vec!["y".into()]),
    );
    store.store(record("m", 3.0, &ts(2)).with_source("a"));
    store.store(record("other", 4.0, &ts(3)).with_source("a"));

    // metric_id AND source
    let q = MetricQuery {
        source: Some("a".into()),
        ..MetricQuery::for_metric("m")
    };
    assert_eq!(store.query(&q).len(), 2);

    // tag list is OR across tags
    let q = MetricQuery {
        tags: Some(vec!["x".into(), "y".into()]),
        ..MetricQuery::for_metric("m")
    };
    assert_eq!(store.query(&q).len(), 2);

    // a supplied filter with no index entry matches nothing
    let q = MetricQuery {
        source: Some("nope".into()),
        ..MetricQuery::for_metric("m")
    };
    assert!(store.query(&q).is_empty());

    // tag-less records stay reachable through metric_id/source
    let q = MetricQuery {
        source: Some("a".into()),
        start_time: Some(ts(2)),
        ..MetricQuery::for_metric("m")
    };
    assert_eq!(store.query(&q)[0].value, MetricValue::Float(3.0));
}

#[test]
fn time_bounds_are_inclusive_lexical() {
    let store = MetricsStore::default();
    for minute in 0..5 {
        store.store(record("m", f64::from(minute), &ts(minute)));
    }
    let q = MetricQuery {
        start_time: Some(ts(1)),
        end_time: Some(ts(3)),
        sort: "timestamp:asc".into(),
        ..MetricQuery::for_metric("m")
    };
    let got = store.query(&q);
    assert_eq!(got.len(), 3);
    assert_eq!(got[0].timestamp, ts(1));
    assert_eq!(got[2].timestamp, ts(3));
}

#[test]
fn sort_offset_limit() {
    let store = MetricsStore::default();
    for minute in 0..10 {
        store.store(record("m", f64::from(9 - minute), &ts(minute)));
    }

    let q = MetricQuery {
        sort: "timestamp:desc".into(),
        limit: 3,
        offset: 2,
        ..MetricQuery::for_metric("m")
    };
    let got = store.query(&q);
    assert_eq!(got.len(), 3);
    assert_eq!(got[0].timestamp, ts(7));

    let q = MetricQuery {
        sort: "value:asc".into(),
        ..MetricQuery::for_metric("m")
    };
    let got = store.query(&q);
    assert_eq!(got[0].value, MetricValue::Float(0.0));
    assert_eq!(got[9].value, MetricValue::Float(9.0));
}

#[test]
fn duplicate_timestamps_keep_insertion_order() {
    let store = MetricsStore::default();
    store.store(record("m", 1.0, &ts(0)));
    store.store(record("m", 2.0, &ts(0)));
    let q = MetricQuery {
        sort: "timestamp:asc".into(),
        ..MetricQuery::for_metric("m")
    };
    let got = store.query(&q);
    assert_eq!(got[0].value, MetricValue::Float(1.0));
    assert_eq!(got[1].value, MetricValue::Float(2.0));
}

#[test]
fn eviction_keeps_exactly_capacity_most_recent() {
    let capacity = 50;
    let store = MetricsStore::new(capacity, Duration::from_secs(300));
    for i in 0..(capacity + 7) {
        let rec = record("m", i as f64, &format!("2026-08-28T10:00:{:02}.{:06}Z", i / 60, i))
            .with_source(if i % 2 == 0 { "even" } else { "odd" })
            .with_tags(vec![format!("t{}", i % 3)]);
        store.store(rec);
    }

    assert_eq!(store.len(), capacity);
    assert!(store.indices_consistent());

    // the oldest 7 are gone, the newest survive
    let q = MetricQuery {
        sort: "value:asc".into(),
        ..MetricQuery::for_metric("m")
    };
    let got = store.query(&q);
    assert_eq!(got[0].value, MetricValue::Float(7.0));
    assert_eq!(got[capacity - 1].value, MetricValue::Float((capacity + 6) as f64));
}

#[test]
fn indices_consistent_after_store_and_trim() {
    let store = MetricsStore::new(20, Duration::from_secs(300));
    for i in 0..100 {
        store.store(
            record(&format!("m{}", i % 4), i as f64, &ts((i % 60) as u32))
                .with_source(&format!("s{}", i % 3))
                .with_tags(vec![format!("tag{}", i % 5)]),
        );
        assert!(store.indices_consistent());
    }
    assert_eq!(store.len(), 20);
}

#[test]
fn write_invalidates_cached_aggregate() {
    let store = MetricsStore::default();
    store.store(record("m", 10.0, &ts(0)));
    store.store(record("m", 20.0, &ts(1)));

    let req = AggregateRequest::new("m", "avg");
    assert_eq!(store.aggregate(&req).scalar_value(), Some(15.0));

    // new write for the same metric id must drop the cached entry
    store.store(record("m", 60.0, &ts(2)));
    assert_eq!(store.aggregate(&req).scalar_value(), Some(30.0));

    // writes to other metric ids leave the entry cached
    let stats_before = store.stats();
    store.store(record("unrelated", 1.0, &ts(3)));
    assert_eq!(store.stats().cached_aggregations, stats_before.cached_aggregations);
    assert_eq!(store.aggregate(&req).scalar_value(), Some(30.0));
}
