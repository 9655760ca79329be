//! Bridge configuration
//!
//! One JSON document. Every field is optional and falls back to a default;
//! values are checked by `validate` after parsing.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Severity;
use crate::store::ClassificationLocale;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(String),

    #[error("Invalid config JSON: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Host to bind to (default: "127.0.0.1")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 47800)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    47800
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

impl HttpConfig {
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Names of the two method channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_health_channel")]
    pub health: String,

    #[serde(default = "default_ekg_channel")]
    pub ekg: String,
}

fn default_health_channel() -> String {
    "healthbridge/health".to_string()
}

fn default_ekg_channel() -> String {
    "healthbridge/ekg".to_string()
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            health: default_health_channel(),
            ekg: default_ekg_channel(),
        }
    }
}

/// Aggregation engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Deadline for one command in milliseconds; unset means none
    #[serde(default)]
    pub deadline_ms: Option<u64>,

    /// Log a warning for every unit that settles without a value
    #[serde(default)]
    pub report_tolerated_failures: bool,

    /// Prompt for read access before a metric snapshot
    #[serde(default = "default_authorize_snapshot")]
    pub authorize_snapshot: bool,

    /// Fixed zone for day windows, minutes east of UTC; unset uses the
    /// local zone
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,

    /// Upper bound on enumerated recordings; unset means no limit
    #[serde(default)]
    pub ecg_sample_limit: Option<usize>,
}

fn default_authorize_snapshot() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deadline_ms: None,
            report_tolerated_failures: false,
            authorize_snapshot: default_authorize_snapshot(),
            utc_offset_minutes: None,
            ecg_sample_limit: None,
        }
    }
}

impl EngineConfig {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    /// Zone for day windows; `None` means local time
    pub fn utc_offset(&self) -> Option<FixedOffset> {
        self.utc_offset_minutes
            .and_then(|minutes| FixedOffset::east_opt(minutes.checked_mul(60)?))
    }
}

/// Complete configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub channels: ChannelConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    /// Language of classification labels
    #[serde(default)]
    pub locale: ClassificationLocale,

    #[serde(default = "default_log_level")]
    pub log_level: Severity,

    /// JSON fixture backing the store; unset starts with an empty store
    #[serde(default)]
    pub fixture: Option<PathBuf>,
}

fn default_log_level() -> Severity {
    Severity::Info
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            channels: ChannelConfig::default(),
            engine: EngineConfig::default(),
            locale: ClassificationLocale::default(),
            log_level: default_log_level(),
            fixture: None,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: BridgeConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.http.host.trim().is_empty() {
            return Err(ConfigError::Invalid("http.host must not be empty".into()));
        }

        if self.channels.health.trim().is_empty() || self.channels.ekg.trim().is_empty() {
            return Err(ConfigError::Invalid("channel names must not be empty".into()));
        }

        if self.channels.health == self.channels.ekg {
            return Err(ConfigError::Invalid(format!(
                "channels.health and channels.ekg must differ, both are '{}'",
                self.channels.health
            )));
        }

        if self.engine.deadline_ms == Some(0) {
            return Err(ConfigError::Invalid("engine.deadline_ms must be > 0".into()));
        }

        if let Some(minutes) = self.engine.utc_offset_minutes {
            if self.engine.utc_offset().is_none() {
                return Err(ConfigError::Invalid(format!(
                    "engine.utc_offset_minutes out of range: {}",
                    minutes
                )));
            }
        }

        if self.engine.ecg_sample_limit == Some(0) {
            return Err(ConfigError::Invalid(
                "engine.ecg_sample_limit must be > 0".into(),
            ));
        }

        Ok(())
    }
}
