//! Top-level facade crate for metrik.
//!
//! Re-exports core types and the engine library so users can depend on a single crate.

pub mod core {
    pub use metrik_core::*;
}

pub mod engine {
    pub use metrik_engine::*;
}
