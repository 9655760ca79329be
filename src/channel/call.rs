//! Method call frames

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ChannelConfig;
use crate::service::{CommandError, CommandResult};

/// One invocation on a named channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub channel: String,
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(channel: impl Into<String>, method: impl Into<String>, arguments: Value) -> Self {
        Self {
            channel: channel.into(),
            method: method.into(),
            arguments,
        }
    }

    /// Parse one JSON frame
    pub fn parse(frame: &str) -> CommandResult<Self> {
        serde_json::from_str(frame)
            .map_err(|e| CommandError::invalid_request(format!("Invalid method call: {}", e)))
    }
}

/// Commands the bridge implements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    RequestAuthorization,
    FetchHealthData,
    GetEkg,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::RequestAuthorization => "requestAuthorization",
            Method::FetchHealthData => "fetchHealthData",
            Method::GetEkg => "getEKG",
        }
    }

    /// Method for a channel/method pair; `None` is not implemented.
    ///
    /// Each method lives on exactly one channel.
    pub fn resolve(channels: &ChannelConfig, channel: &str, method: &str) -> Option<Self> {
        if channel == channels.health {
            match method {
                "fetchHealthData" => Some(Method::FetchHealthData),
                "requestAuthorization" => Some(Method::RequestAuthorization),
                _ => None,
            }
        } else if channel == channels.ekg {
            match method {
                "getEKG" => Some(Method::GetEkg),
                _ => None,
            }
        } else {
            None
        }
    }
}
