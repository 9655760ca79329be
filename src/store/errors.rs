//! # Store Errors

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a health store
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Health data is not available on this device")]
    Unavailable,

    #[error("Read permission denied")]
    PermissionDenied,

    #[error("Authorization request failed: {0}")]
    AuthorizationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedType(String),

    #[error("Cannot express {from} as {to}")]
    IncompatibleUnit { from: String, to: String },

    #[error("Fixture error: {0}")]
    Fixture(String),
}
