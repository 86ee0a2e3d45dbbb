//! Timestamp format and time-window grammar.
//!
//! Timestamps are UTC ISO-8601 with a trailing `Z`, rendered at fixed
//! microsecond width so string comparison and chronological comparison
//! agree. Interval and window shorthands follow `<integer><unit>`; a bare
//! integer defaults to hours.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Fixed-width render: `2026-08-28T09:15:00.123456Z`.
pub fn format_iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current UTC time in the canonical format.
pub fn now_iso() -> String {
    format_iso(Utc::now())
}

/// Parse a canonical (or any RFC 3339) timestamp.
pub fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn split_shorthand(s: &str) -> Option<(i64, Option<char>)> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let last = s.chars().last()?;
    if last.is_ascii_digit() {
        return s.parse::<i64>().ok().map(|n| (n, None));
    }
    let amount: i64 = s[..s.len() - last.len_utf8()].parse().ok()?;
    Some((amount, Some(last)))
}

/// Bucket-width grammar: `<integer><m|h|d>`, bare integer in hours.
pub fn parse_interval(s: &str) -> Option<Duration> {
    let (amount, unit) = split_shorthand(s)?;
    if amount <= 0 {
        return None;
    }
    match unit {
        Some('m') => Some(Duration::minutes(amount)),
        Some('h') | None => Some(Duration::hours(amount)),
        Some('d') => Some(Duration::days(amount)),
        _ => None,
    }
}

/// Time-window shorthand: `<integer><m|h|d|w>`, bare integer in hours.
pub fn parse_window(s: &str) -> Option<Duration> {
    let (amount, unit) = split_shorthand(s)?;
    if amount <= 0 {
        return None;
    }
    match unit {
        Some('m') => Some(Duration::minutes(amount)),
        Some('h') | None => Some(Duration::hours(amount)),
        Some('d') => Some(Duration::days(amount)),
        Some('w') => Some(Duration::weeks(amount)),
        _ => None,
    }
}

/// One aggregation bucket `[start, end)`; the final bucket of a partition is
/// clipped at the range end and includes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub start: String,
    pub end: String,
}

/// Partition `[start, end]` into consecutive non-overlapping buckets of
/// `width`. The final bucket is clipped at `end`.
pub fn partition(start: DateTime<Utc>, end: DateTime<Utc>, width: Duration) -> Vec<Bucket> {
    let mut buckets = Vec::new();
    if end <= start || width <= Duration::zero() {
        return buckets;
    }
    let mut cur = start;
    while cur < end {
        let next = std::cmp::min(cur + width, end);
        buckets.push(Bucket {
            start: format_iso(cur),
            end: format_iso(next),
        });
        cur = next;
    }
    buckets
}

/// Index of the bucket containing `ts`, for a partition built with the same
/// `start`/`end`/`width`. Half-open containment; a record exactly at `end`
/// lands in the final bucket. `None` when `ts` is outside the range.
pub fn bucket_index(
    ts: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    width: Duration,
    bucket_count: usize,
) -> Option<usize> {
    if ts < start || ts > end || bucket_count == 0 {
        return None;
    }
    let width_us = width.num_microseconds()?;
    if width_us <= 0 {
        return None;
    }
    let offset_us = (ts - start).num_microseconds()?;
    let idx = (offset_us / width_us) as usize;
    Some(idx.min(bucket_count - 1))
}
