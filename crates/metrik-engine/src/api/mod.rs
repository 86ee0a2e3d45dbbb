//! HTTP surface.
//!
//! - `/healthz` : liveness
//! - `/readyz`  : readiness (503 unless the engine is running)
//! - `/v1/*`    : record / query / aggregate / definitions / stream

pub mod http;
pub mod stream;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use metrik_core::error::ClientCode;

use crate::engine::{EngineStatus, MetricsEngine};

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readyz(State(engine): State<MetricsEngine>) -> impl IntoResponse {
    match engine.status() {
        EngineStatus::Running => (StatusCode::OK, "ready"),
        EngineStatus::Stopped => (StatusCode::SERVICE_UNAVAILABLE, "stopped"),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "starting"),
    }
}

/// Stable error body: `{"code": "...", "msg": "..."}`.
pub(crate) fn error_body(code: ClientCode, msg: &str) -> Json<serde_json::Value> {
    Json(json!({ "code": code.as_str(), "msg": msg }))
}
