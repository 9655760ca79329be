//! # Method Router
//!
//! Dispatches method calls to the health service and wraps every outcome
//! in a response envelope. Shared by every transport.

use serde::Serialize;
use serde_json::Value;

use super::call::{Method, MethodCall};
use super::response::MethodResponse;
use crate::config::ChannelConfig;
use crate::engine::WireEkgRecord;
use crate::observability::Event;
use crate::service::{CommandError, CommandResult, HealthService};

#[derive(Debug, Clone)]
pub struct MethodRouter {
    service: HealthService,
    channels: ChannelConfig,
}

impl MethodRouter {
    pub fn new(service: HealthService, channels: ChannelConfig) -> Self {
        Self { service, channels }
    }

    pub fn service(&self) -> &HealthService {
        &self.service
    }

    pub fn channels(&self) -> &ChannelConfig {
        &self.channels
    }

    /// Run one call to completion
    pub async fn dispatch(&self, call: &MethodCall) -> MethodResponse {
        let diagnostics = self.service.diagnostics();
        diagnostics.event(
            Event::CommandReceived,
            &[("channel", call.channel.as_str()), ("method", call.method.as_str())],
        );

        let method = match Method::resolve(&self.channels, &call.channel, &call.method) {
            Some(method) => method,
            None => {
                diagnostics.metrics().increment_commands_not_implemented();
                diagnostics.event(
                    Event::CommandNotImplemented,
                    &[("channel", call.channel.as_str()), ("method", call.method.as_str())],
                );
                return MethodResponse::not_implemented();
            }
        };

        let data = match method {
            Method::RequestAuthorization => self
                .service
                .request_authorization()
                .await
                .map(Value::Bool),
            Method::FetchHealthData => self
                .service
                .fetch_health_data(&call.arguments)
                .await
                .and_then(|result| to_data(&result)),
            Method::GetEkg => {
                let locale = self.service.locale();
                self.service.get_ekg().await.and_then(|records| {
                    let wire: Vec<WireEkgRecord> =
                        records.iter().map(|r| r.to_wire(locale)).collect();
                    to_data(&wire)
                })
            }
        };

        match data {
            Ok(data) => MethodResponse::ok(data),
            Err(e) => MethodResponse::error(&e),
        }
    }

    /// Parse one JSON frame and dispatch it
    pub async fn dispatch_frame(&self, frame: &str) -> MethodResponse {
        match MethodCall::parse(frame) {
            Ok(call) => self.dispatch(&call).await,
            Err(e) => MethodResponse::error(&e),
        }
    }
}

fn to_data<T: Serialize>(value: &T) -> CommandResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| CommandError::internal(format!("Failed to encode result: {}", e)))
}
