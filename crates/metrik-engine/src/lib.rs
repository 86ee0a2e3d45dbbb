//! metrik engine library entry.
//!
//! This crate wires the in-memory time-series store, the durable SQLite
//! backend, the engine façade with its background samplers, and the HTTP/WS
//! surface into a cohesive metrics stack. It is intended to be consumed by
//! the binary (`main.rs`) and by integration tests.

pub mod api;
pub mod config;
pub mod durable;
pub mod engine;
pub mod notify;
pub mod router;
pub mod store;

mod tasks;

pub use engine::{EngineStatus, MetricsEngine, RecordRequest};
pub use store::{AggregateRequest, MetricQuery, MetricsStore, StoreStats};
