//! metrik core: runtime-free metric primitives, aggregation math, and the
//! shared error surface.
//!
//! This crate defines the record/definition data model, the timestamp and
//! interval grammar, and the pure aggregation functions shared by the engine
//! and by SDK tooling. It intentionally carries no runtime or storage
//! dependencies so it can be reused in multiple contexts.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `MetrikError`/`Result` so production
//! processes do not crash on malformed input or bad readings.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod aggregate;
pub mod definition;
pub mod error;
pub mod record;
pub mod time;

/// Shared result type.
pub use error::{MetrikError, Result};
