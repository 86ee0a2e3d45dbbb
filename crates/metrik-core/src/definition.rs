//! Metric definitions: the fixed per-metric-id type/unit/aggregation table.
//!
//! The registry is open by contract: an unknown metric_id is always accepted
//! and simply skips the type-check path. Definitions are loaded once at
//! startup and never mutated.

use serde::{Deserialize, Serialize};

/// Declared value type for a defined metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Float,
    Integer,
}

/// Supported aggregation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Avg,
    Sum,
    Min,
    Max,
    Count,
    P50,
    P95,
    P99,
}

impl Aggregation {
    /// Parse a function name. Unknown names yield `None`; callers are
    /// expected to log and return a null result, never to error.
    pub fn parse(s: &str) -> Option<Aggregation> {
        match s {
            "avg" => Some(Aggregation::Avg),
            "sum" => Some(Aggregation::Sum),
            "min" => Some(Aggregation::Min),
            "max" => Some(Aggregation::Max),
            "count" => Some(Aggregation::Count),
            "p50" => Some(Aggregation::P50),
            "p95" => Some(Aggregation::P95),
            "p99" => Some(Aggregation::P99),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Aggregation::Avg => "avg",
            Aggregation::Sum => "sum",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::Count => "count",
            Aggregation::P50 => "p50",
            Aggregation::P95 => "p95",
            Aggregation::P99 => "p99",
        }
    }
}

/// Immutable description of one metric id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub metric_id: String,
    pub description: String,
    pub unit: String,
    pub value_type: ValueType,
    pub allowed_aggregations: Vec<Aggregation>,
}

impl MetricDefinition {
    fn new(
        metric_id: &str,
        description: &str,
        unit: &str,
        value_type: ValueType,
        allowed_aggregations: &[Aggregation],
    ) -> Self {
        Self {
            metric_id: metric_id.to_string(),
            description: description.to_string(),
            unit: unit.to_string(),
            value_type,
            allowed_aggregations: allowed_aggregations.to_vec(),
        }
    }
}

/// The standard definition table loaded at engine startup.
pub fn builtin_definitions() -> Vec<MetricDefinition> {
    use Aggregation::{Avg, Max, Sum, P50, P95, P99};

    vec![
        // Performance
        MetricDefinition::new(
            "perf.response_time",
            "Time to respond to a request",
            "milliseconds",
            ValueType::Float,
            &[Avg, P50, P95, P99],
        ),
        MetricDefinition::new(
            "perf.processing_time",
            "Time to process a task",
            "milliseconds",
            ValueType::Float,
            &[Avg, P50, P95, P99],
        ),
        MetricDefinition::new(
            "perf.throughput",
            "Number of operations per unit time",
            "ops/second",
            ValueType::Float,
            &[Avg, Max],
        ),
        // Resources
        MetricDefinition::new(
            "res.cpu_usage",
            "CPU utilization",
            "percentage",
            ValueType::Float,
            &[Avg, Max],
        ),
        MetricDefinition::new(
            "res.memory_usage",
            "Memory consumption",
            "megabytes",
            ValueType::Float,
            &[Avg, Max],
        ),
        MetricDefinition::new(
            "res.token_usage",
            "LLM tokens consumed",
            "count",
            ValueType::Integer,
            &[Sum, Avg],
        ),
        // Quality
        MetricDefinition::new(
            "qual.accuracy",
            "Correctness of output",
            "percentage",
            ValueType::Float,
            &[Avg],
        ),
        MetricDefinition::new(
            "qual.error_rate",
            "Frequency of errors",
            "percentage",
            ValueType::Float,
            &[Avg],
        ),
        // Intelligence
        MetricDefinition::new(
            "intel.reasoning",
            "Logical reasoning capability",
            "score (0-100)",
            ValueType::Float,
            &[Avg],
        ),
        MetricDefinition::new(
            "intel.knowledge",
            "Knowledge representation & recall",
            "score (0-100)",
            ValueType::Float,
            &[Avg],
        ),
        // Usage
        MetricDefinition::new(
            "usage.request_count",
            "Number of requests received",
            "count",
            ValueType::Integer,
            &[Sum],
        ),
        MetricDefinition::new(
            "usage.feature_usage",
            "Usage of specific features",
            "count",
            ValueType::Integer,
            &[Sum],
        ),
        // Collaboration
        MetricDefinition::new(
            "collab.info_sharing",
            "Context exchange between components",
            "score (0-5)",
            ValueType::Float,
            &[Avg],
        ),
        MetricDefinition::new(
            "collab.synergy_factor",
            "Performance improvement from collaboration",
            "percentage",
            ValueType::Float,
            &[Avg],
        ),
        // Operations
        MetricDefinition::new(
            "ops.uptime",
            "System availability",
            "percentage",
            ValueType::Float,
            &[Avg],
        ),
        MetricDefinition::new(
            "ops.error_count",
            "Number of errors",
            "count",
            ValueType::Integer,
            &[Sum],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_and_unknown() {
        assert_eq!(Aggregation::parse("p95"), Some(Aggregation::P95));
        assert_eq!(Aggregation::parse("median"), None);
    }

    #[test]
    fn builtin_table_shape() {
        let defs = builtin_definitions();
        assert!(defs.iter().any(|d| d.metric_id == "res.cpu_usage"));
        assert!(defs
            .iter()
            .all(|d| !d.allowed_aggregations.is_empty() && !d.unit.is_empty()));
    }
}
