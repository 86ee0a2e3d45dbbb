//! REST handlers for record / query / aggregate / definitions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use metrik_core::error::ClientCode;

use crate::engine::{MetricsEngine, RecordRequest};
use crate::store::{AggregateRequest, MetricQuery};

use super::error_body;

fn split_tags(raw: Option<String>) -> Option<Vec<String>> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .filter(|tags: &Vec<String>| !tags.is_empty())
}

// --------------------
// POST /v1/metrics
// --------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordBody {
    pub metric_id: String,
    pub value: Value,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub context: Option<Value>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

pub async fn record(
    State(engine): State<MetricsEngine>,
    Json(body): Json<RecordBody>,
) -> Response {
    let req = RecordRequest {
        metric_id: body.metric_id,
        value: body.value,
        source: body.source,
        timestamp: body.timestamp,
        context: body.context,
        tags: body.tags,
    };
    if engine.record_metric(req).await {
        (StatusCode::ACCEPTED, Json(json!({ "status": "ok" }))).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            error_body(ClientCode::BadRequest, "metric rejected"),
        )
            .into_response()
    }
}

// --------------------
// GET /v1/metrics
// --------------------

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    pub metric_id: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    /// Comma-separated tag list; a record matches on any of them.
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_sort")]
    pub sort: String,
}

fn default_limit() -> usize {
    100
}
fn default_sort() -> String {
    "timestamp:desc".to_string()
}

pub async fn query(
    State(engine): State<MetricsEngine>,
    Query(params): Query<QueryParams>,
) -> Response {
    let q = MetricQuery {
        metric_id: params.metric_id,
        source: params.source,
        tags: split_tags(params.tags),
        start_time: params.start_time,
        end_time: params.end_time,
        limit: params.limit,
        offset: params.offset,
        sort: params.sort,
    };
    let records = engine.query_metrics(&q);
    let count = records.len();
    (StatusCode::OK, Json(json!({ "metrics": records, "count": count }))).into_response()
}

// --------------------
// GET /v1/metrics/aggregate
// --------------------

#[derive(Debug, Deserialize)]
pub struct AggregateParams {
    pub metric_id: String,
    #[serde(default = "default_aggregation")]
    pub aggregation: String,
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    /// Lookback shorthand (`6h`, `7d`); ignored when start/end are given.
    #[serde(default)]
    pub window: Option<String>,
}

fn default_aggregation() -> String {
    "avg".to_string()
}

pub async fn aggregate(
    State(engine): State<MetricsEngine>,
    Query(params): Query<AggregateParams>,
) -> Response {
    let req = AggregateRequest {
        metric_id: params.metric_id,
        aggregation: params.aggregation,
        interval: params.interval,
        source: params.source,
        tags: split_tags(params.tags),
        start_time: params.start_time,
        end_time: params.end_time,
        window: params.window,
    };
    let result = engine.aggregate_metrics(&req);
    (StatusCode::OK, Json(result)).into_response()
}

// --------------------
// GET /v1/definitions[/:metric_id]
// --------------------

pub async fn definitions(State(engine): State<MetricsEngine>) -> Response {
    let defs = engine.get_available_metrics();
    (StatusCode::OK, Json(json!({ "definitions": defs }))).into_response()
}

pub async fn definition(
    State(engine): State<MetricsEngine>,
    Path(metric_id): Path<String>,
) -> Response {
    match engine.get_metric_definition(&metric_id) {
        Some(def) => (StatusCode::OK, Json(def.as_ref().clone())).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            error_body(ClientCode::NotFound, "unknown metric_id"),
        )
            .into_response(),
    }
}
