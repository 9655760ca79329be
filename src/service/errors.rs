//! Command error types
//!
//! Every total failure of a command carries a stable code, a message and
//! optional details. Tolerated per-unit failures never reach this layer.

use std::fmt;

use crate::auth::AuthError;
use crate::store::StoreError;

/// Stable error codes of the command surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Authorization prompt failed or was declined
    AuthError,
    /// Date argument is not `YYYY-MM-DD`
    InvalidDate,
    /// Date argument absent or not a string
    MissingArgument,
    /// No health data on this device
    Unavailable,
    PermissionDenied,
    /// Enumeration query failed
    QueryFailed,
    /// Deadline expired before any batch started
    Timeout,
    /// Cancelled before any batch started
    Cancelled,
    /// Malformed method call frame
    InvalidRequest,
    /// Bridge-side failure, never produced by a store
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthError => "AUTH_ERROR",
            ErrorCode::InvalidDate => "INVALID_DATE",
            ErrorCode::MissingArgument => "MISSING_ARGUMENT",
            ErrorCode::Unavailable => "UNAVAILABLE",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::QueryFailed => "QUERY_FAILED",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::Internal => "INTERNAL",
        }
    }

    /// HTTP status for this code
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            ErrorCode::InvalidDate => 400,
            ErrorCode::MissingArgument => 400,
            ErrorCode::InvalidRequest => 400,

            // 403 Forbidden
            ErrorCode::AuthError => 403,
            ErrorCode::PermissionDenied => 403,

            // 409 Conflict
            ErrorCode::Cancelled => 409,

            // 500 Internal Server Error
            ErrorCode::Internal => 500,

            // 502 Bad Gateway
            ErrorCode::QueryFailed => 502,

            // 503 Service Unavailable
            ErrorCode::Unavailable => 503,

            // 504 Gateway Timeout
            ErrorCode::Timeout => 504,
        }
    }

    /// Whether the caller sent something wrong
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ErrorCode::InvalidDate | ErrorCode::MissingArgument | ErrorCode::InvalidRequest
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Total failure of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError {
    code: ErrorCode,
    message: String,
    details: Option<String>,
}

pub type CommandResult<T> = Result<T, CommandError>;

impl CommandError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn invalid_date(input: &str) -> Self {
        Self::new(ErrorCode::InvalidDate, "Date must be formatted as YYYY-MM-DD")
            .with_details(input)
    }

    pub fn missing_argument() -> Self {
        Self::new(ErrorCode::MissingArgument, "Date argument is missing")
    }

    pub fn unavailable() -> Self {
        Self::new(ErrorCode::Unavailable, "Health data not available")
    }

    pub fn permission_denied(what: &str) -> Self {
        Self::new(
            ErrorCode::PermissionDenied,
            format!("Read access to {} was not granted", what),
        )
    }

    pub fn query_failed(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::QueryFailed, "Electrocardiogram query failed").with_details(reason)
    }

    pub fn timeout() -> Self {
        Self::new(ErrorCode::Timeout, "Deadline expired before the query started")
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorCode::Cancelled, "Operation cancelled")
    }

    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, reason)
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, reason)
    }

    /// `requestAuthorization` failure; the platform message goes to details
    pub fn from_authorization(err: &AuthError) -> Self {
        let error = Self::new(ErrorCode::AuthError, "Health authorization could not be obtained");
        match err.details() {
            Some(details) => error.with_details(details),
            None => error,
        }
    }

    /// Gate failure in front of a data query
    pub fn from_gate(err: &AuthError, what: &str) -> Self {
        match err {
            AuthError::Unavailable => Self::unavailable(),
            AuthError::Denied => Self::permission_denied(what),
            AuthError::RequestFailed(message) => {
                Self::permission_denied(what).with_details(message.clone())
            }
        }
    }

    pub fn from_store(err: &StoreError) -> Self {
        match err {
            StoreError::Unavailable => Self::unavailable(),
            StoreError::PermissionDenied => Self::permission_denied("health data"),
            other => Self::query_failed(other.to_string()),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for CommandError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ErrorCode::AuthError.as_str(), "AUTH_ERROR");
        assert_eq!(ErrorCode::InvalidDate.as_str(), "INVALID_DATE");
        assert_eq!(ErrorCode::MissingArgument.as_str(), "MISSING_ARGUMENT");
        assert_eq!(ErrorCode::PermissionDenied.as_str(), "PERMISSION_DENIED");
        assert_eq!(ErrorCode::QueryFailed.as_str(), "QUERY_FAILED");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorCode::InvalidDate.status_code(), 400);
        assert_eq!(ErrorCode::PermissionDenied.status_code(), 403);
        assert_eq!(ErrorCode::Unavailable.status_code(), 503);
        assert_eq!(ErrorCode::Timeout.status_code(), 504);
    }

    #[test]
    fn test_authorization_details_carry_platform_message() {
        let err = CommandError::from_authorization(&AuthError::RequestFailed("denied by MDM".into()));
        assert_eq!(err.code(), ErrorCode::AuthError);
        assert_eq!(err.details(), Some("denied by MDM"));
    }

    #[test]
    fn test_gate_failures_map() {
        assert_eq!(
            CommandError::from_gate(&AuthError::Unavailable, "electrocardiograms").code(),
            ErrorCode::Unavailable
        );
        assert_eq!(
            CommandError::from_gate(&AuthError::Denied, "electrocardiograms").code(),
            ErrorCode::PermissionDenied
        );
    }

    #[test]
    fn test_display() {
        let err = CommandError::invalid_date("13/40/2024");
        assert_eq!(err.to_string(), "INVALID_DATE: Date must be formatted as YYYY-MM-DD");
        assert!(err.code().is_client_error());
    }
}
