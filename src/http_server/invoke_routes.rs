//! Method Invocation Routes
//!
//! `POST /invoke/{channel}/{method}` with an optional body
//! `{"arguments": ...}`. Channel names may contain `/`, so the method is
//! the last path segment and the channel is everything before it.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::channel::{MethodCall, MethodResponse, MethodRouter};
use crate::service::CommandError;

/// Request body of an invocation
#[derive(Debug, Default, Deserialize)]
pub struct InvokeBody {
    #[serde(default)]
    pub arguments: Value,
}

pub fn invoke_routes(router: MethodRouter) -> Router {
    Router::new()
        .route("/invoke/*target", post(invoke_handler))
        .with_state(router)
}

async fn invoke_handler(
    State(router): State<MethodRouter>,
    Path(target): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    let response = match parse_invocation(&target, &body) {
        Ok(call) => router.dispatch(&call).await,
        Err(e) => MethodResponse::error(&e),
    };
    (status_for(&response), Json(response.to_value()))
}

/// Split `channel/.../method` and decode the body
fn parse_invocation(target: &str, body: &[u8]) -> Result<MethodCall, CommandError> {
    let (channel, method) = target
        .trim_matches('/')
        .rsplit_once('/')
        .filter(|(channel, method)| !channel.is_empty() && !method.is_empty())
        .ok_or_else(|| {
            CommandError::invalid_request(format!(
                "Expected /invoke/{{channel}}/{{method}}, got /invoke/{}",
                target
            ))
        })?;

    let body: InvokeBody = if body.iter().all(u8::is_ascii_whitespace) {
        InvokeBody::default()
    } else {
        serde_json::from_slice(body)
            .map_err(|e| CommandError::invalid_request(format!("Invalid request body: {}", e)))?
    };

    Ok(MethodCall::new(channel, method, body.arguments))
}

fn status_for(response: &MethodResponse) -> StatusCode {
    match response {
        MethodResponse::Ok(_) => StatusCode::OK,
        MethodResponse::NotImplemented => StatusCode::NOT_IMPLEMENTED,
        MethodResponse::Error { code, .. } => {
            StatusCode::from_u16(code.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
