//! # Auth Errors
//!
//! Error types for the authorization gate.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for authorization
pub type AuthResult<T> = Result<T, AuthError>;

/// Why read access could not be obtained
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No health data on this device; no prompt was shown
    #[error("Health data is not available on this device")]
    Unavailable,

    /// The prompt answered without granting access
    #[error("Read access was not granted")]
    Denied,

    /// The prompt itself failed; carries the platform message
    #[error("Authorization request failed: {0}")]
    RequestFailed(String),
}

impl AuthError {
    /// Platform message to surface as error details
    pub fn details(&self) -> Option<String> {
        match self {
            AuthError::RequestFailed(message) => Some(message.clone()),
            AuthError::Denied | AuthError::Unavailable => Some(self.to_string()),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable => AuthError::Unavailable,
            StoreError::PermissionDenied => AuthError::Denied,
            StoreError::AuthorizationFailed(message) => AuthError::RequestFailed(message),
            other => AuthError::RequestFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_message_is_details() {
        let err = AuthError::from(StoreError::AuthorizationFailed("sheet dismissed".into()));
        assert_eq!(err, AuthError::RequestFailed("sheet dismissed".into()));
        assert_eq!(err.details().as_deref(), Some("sheet dismissed"));
    }

    #[test]
    fn test_store_errors_map() {
        assert_eq!(AuthError::from(StoreError::Unavailable), AuthError::Unavailable);
        assert_eq!(AuthError::from(StoreError::PermissionDenied), AuthError::Denied);
    }
}
