//! Shared error type across metrik crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request.
    BadRequest,
    /// Requested entity does not exist.
    NotFound,
    /// Durable storage failure.
    Storage,
    /// Operation invalid in the current lifecycle state.
    Lifecycle,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::Storage => "STORAGE",
            ClientCode::Lifecycle => "LIFECYCLE",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetrikError>;

/// Unified error type used by core and engine.
#[derive(Debug, Error)]
pub enum MetrikError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage: {0}")]
    Storage(String),
    #[error("lifecycle: {0}")]
    Lifecycle(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl MetrikError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            MetrikError::BadRequest(_) => ClientCode::BadRequest,
            MetrikError::NotFound(_) => ClientCode::NotFound,
            MetrikError::Storage(_) => ClientCode::Storage,
            MetrikError::Lifecycle(_) => ClientCode::Lifecycle,
            MetrikError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            MetrikError::Internal(_) => ClientCode::Internal,
        }
    }
}
