//! Method response envelopes
//!
//! - `{"status":"ok","data":...}`
//! - `{"status":"error","code":...,"message":...,"details":...}`
//! - `{"status":"not_implemented"}`

use serde_json::{json, Value};

use crate::service::{CommandError, ErrorCode};

#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Ok(Value),
    Error {
        code: ErrorCode,
        message: String,
        details: Option<String>,
    },
    /// Unknown channel/method pair; not an error
    NotImplemented,
}

impl MethodResponse {
    pub fn ok(data: Value) -> Self {
        MethodResponse::Ok(data)
    }

    pub fn error(err: &CommandError) -> Self {
        MethodResponse::Error {
            code: err.code(),
            message: err.message().to_string(),
            details: err.details().map(str::to_string),
        }
    }

    pub fn not_implemented() -> Self {
        MethodResponse::NotImplemented
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, MethodResponse::Ok(_))
    }

    pub fn status(&self) -> &'static str {
        match self {
            MethodResponse::Ok(_) => "ok",
            MethodResponse::Error { .. } => "error",
            MethodResponse::NotImplemented => "not_implemented",
        }
    }

    /// Error code, if this is an error
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            MethodResponse::Error { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            MethodResponse::Ok(data) => json!({"status": "ok", "data": data}),
            MethodResponse::Error {
                code,
                message,
                details,
            } => {
                let mut value = json!({
                    "status": "error",
                    "code": code.as_str(),
                    "message": message,
                });
                if let Some(details) = details {
                    value["details"] = Value::String(details.clone());
                }
                value
            }
            MethodResponse::NotImplemented => json!({"status": "not_implemented"}),
        }
    }

    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_envelope() {
        let parsed: Value = serde_json::from_str(&MethodResponse::ok(json!(true)).to_json()).unwrap();
        assert_eq!(parsed, json!({"status": "ok", "data": true}));
    }

    #[test]
    fn test_error_envelope_details() {
        let err = CommandError::new(ErrorCode::AuthError, "denied").with_details("sheet dismissed");
        let value = MethodResponse::error(&err).to_value();
        assert_eq!(value["status"], "error");
        assert_eq!(value["code"], "AUTH_ERROR");
        assert_eq!(value["details"], "sheet dismissed");

        let bare = MethodResponse::error(&CommandError::missing_argument()).to_value();
        assert!(bare.get("details").is_none());
    }

    #[test]
    fn test_not_implemented_is_not_an_error() {
        let response = MethodResponse::not_implemented();
        assert_eq!(response.status(), "not_implemented");
        assert_eq!(response.code(), None);
    }
}
