//! Metric record model.
//!
//! A record is one timestamped observation. Values are numeric by default;
//! non-numeric readings are kept verbatim as text so producers never get
//! rejected for shape alone.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One observed value. Numeric readings (and numeric-looking strings) coerce
/// to `Float`; anything else is stored verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Float(f64),
    Text(String),
}

impl MetricValue {
    /// Coerce an arbitrary JSON value into a metric value.
    ///
    /// Numbers, booleans, and numeric-looking strings become `Float`; other
    /// strings stay `Text`; structured values are serialized to their JSON
    /// text form.
    pub fn coerce(raw: &Value) -> MetricValue {
        match raw {
            Value::Number(n) => match n.as_f64() {
                Some(f) => MetricValue::Float(f),
                None => MetricValue::Text(n.to_string()),
            },
            Value::Bool(b) => MetricValue::Float(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(f) => MetricValue::Float(f),
                Err(_) => MetricValue::Text(s.clone()),
            },
            other => MetricValue::Text(other.to_string()),
        }
    }

    /// Numeric view of the value. Text values that parse as a float count as
    /// numeric here, matching the coercion rule on the write path.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Float(f) => Some(*f),
            MetricValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Float(v as f64)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::coerce(&Value::String(v.to_string()))
    }
}

/// One stored observation. Immutable after storage; the store may fill an
/// empty timestamp at write time, nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub metric_id: String,
    pub value: MetricValue,
    /// UTC ISO-8601 with trailing `Z`, lexically sortable.
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl MetricRecord {
    pub fn new(metric_id: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        Self {
            metric_id: metric_id.into(),
            value: value.into(),
            timestamp: String::new(),
            source: None,
            tags: Vec::new(),
            context: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_timestamp(mut self, ts: impl Into<String>) -> Self {
        self.timestamp = ts.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerce_numeric_string() {
        assert_eq!(MetricValue::coerce(&json!("42.5")), MetricValue::Float(42.5));
        assert_eq!(MetricValue::coerce(&json!(" 7 ")), MetricValue::Float(7.0));
    }

    #[test]
    fn coerce_text_stays_verbatim() {
        assert_eq!(
            MetricValue::coerce(&json!("healthy")),
            MetricValue::Text("healthy".into())
        );
    }

    #[test]
    fn value_serde_is_untagged() {
        let rec = MetricRecord::new("perf.response_time", 12.5)
            .with_timestamp("2026-08-28T00:00:00.000000Z");
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["value"], json!(12.5));
        let back: MetricRecord = serde_json::from_value(v).unwrap();
        assert_eq!(back, rec);
    }
}
