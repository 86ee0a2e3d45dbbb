//! Axum router wiring for the metrics API.

use axum::{
    routing::{get, post},
    Router,
};

use crate::{api, engine::MetricsEngine};

pub fn build_router(engine: MetricsEngine) -> Router {
    Router::new()
        .route("/v1/metrics", post(api::http::record).get(api::http::query))
        .route("/v1/metrics/aggregate", get(api::http::aggregate))
        .route("/v1/definitions", get(api::http::definitions))
        .route("/v1/definitions/:metric_id", get(api::http::definition))
        .route("/v1/stream", get(api::stream::stream_upgrade))
        .route("/healthz", get(api::healthz))
        .route("/readyz", get(api::readyz))
        .with_state(engine)
}
