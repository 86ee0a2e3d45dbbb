//! Pure aggregation math and result shapes.
//!
//! Every function returns `None` over an empty value set, including `count`,
//! which reports null rather than a synthesized zero when nothing matched.

use serde::{Deserialize, Serialize};

use crate::definition::Aggregation;

/// Apply one aggregation function over raw values.
pub fn compute(values: &[f64], aggregation: Aggregation) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    match aggregation {
        Aggregation::Avg => Some(values.iter().sum::<f64>() / values.len() as f64),
        Aggregation::Sum => Some(values.iter().sum()),
        Aggregation::Min => values.iter().copied().reduce(f64::min),
        Aggregation::Max => values.iter().copied().reduce(f64::max),
        Aggregation::Count => Some(values.len() as f64),
        Aggregation::P50 => Some(percentile(values, 50.0)),
        Aggregation::P95 => Some(percentile(values, 95.0)),
        Aggregation::P99 => Some(percentile(values, 99.0)),
    }
}

/// Percentile by linear interpolation between order statistics at
/// `rank = (n - 1) * p / 100`.
///
/// Callers guarantee a non-empty slice; an empty slice yields 0.0 rather
/// than panicking.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (sorted.len() - 1) as f64 * (p / 100.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

/// One time-series bucket. `value` is null when no record fell in the bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketPoint {
    pub start_time: String,
    pub end_time: String,
    pub value: Option<f64>,
    pub count: usize,
}

/// Scalar aggregation over the whole matched set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarAggregate {
    pub metric_id: String,
    pub aggregation: String,
    pub value: Option<f64>,
    pub count: usize,
}

/// Time-bucketed aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesAggregate {
    pub metric_id: String,
    pub aggregation: String,
    pub interval: String,
    pub time_series: Vec<BucketPoint>,
}

/// Result of `aggregate`: a scalar when no interval was requested, a time
/// series otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggregateResult {
    Series(SeriesAggregate),
    Scalar(ScalarAggregate),
}

impl AggregateResult {
    /// Scalar value, if this is a scalar result.
    pub fn scalar_value(&self) -> Option<f64> {
        match self {
            AggregateResult::Scalar(s) => s.value,
            AggregateResult::Series(_) => None,
        }
    }

    pub fn metric_id(&self) -> &str {
        match self {
            AggregateResult::Scalar(s) => &s.metric_id,
            AggregateResult::Series(s) => &s.metric_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avg_of_four() {
        assert_eq!(compute(&[1.0, 2.0, 3.0, 4.0], Aggregation::Avg), Some(2.5));
    }

    #[test]
    fn p50_interpolates() {
        assert_eq!(compute(&[1.0, 2.0, 3.0, 4.0], Aggregation::P50), Some(2.5));
    }

    #[test]
    fn p95_scenario() {
        // sorted [10,20,30,40,50]: rank 3.8 between 40 and 50 -> 48
        let v = [10.0, 20.0, 30.0, 40.0, 50.0];
        let p95 = compute(&v, Aggregation::P95);
        assert!((p95.unwrap_or(0.0) - 48.0).abs() < 1e-9);
    }

    #[test]
    fn empty_set_is_null_even_for_count() {
        assert_eq!(compute(&[], Aggregation::Count), None);
        assert_eq!(compute(&[], Aggregation::Avg), None);
    }

    #[test]
    fn min_max_sum() {
        let v = [3.0, 1.0, 2.0];
        assert_eq!(compute(&v, Aggregation::Min), Some(1.0));
        assert_eq!(compute(&v, Aggregation::Max), Some(3.0));
        assert_eq!(compute(&v, Aggregation::Sum), Some(6.0));
    }
}
