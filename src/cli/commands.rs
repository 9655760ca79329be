//! CLI command implementations
//!
//! Boot sequence shared by every command:
//! 1. Load configuration (defaults when no path is given)
//! 2. Apply the log level
//! 3. Load the fixture, if configured
//! 4. Build the lazily created store, the service and the method router
//!
//! The store itself is created on first use, never at boot.

use std::io::{self, BufReader};
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tokio::runtime::Runtime;

use crate::catalog::MetricCatalog;
use crate::channel::{MethodCall, MethodRouter};
use crate::config::BridgeConfig;
use crate::http_server::HttpServer;
use crate::observability::{
    log_event, log_event_with_fields, Diagnostics, Event, Logger, MetricsRegistry,
};
use crate::service::HealthService;
use crate::store::{Fixture, FixtureStore, HealthStore, StoreHandle};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_frame, write_response};

/// Main entry point for CLI
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(config.as_deref(), port),
        Command::Stdio { config } => stdio(config.as_deref()),
        Command::Call {
            config,
            channel,
            method,
            arguments,
        } => call(config.as_deref(), &channel, &method, arguments.as_deref()),
    }
}

/// Load configuration, or fall back to defaults
pub fn load_config(path: Option<&Path>) -> CliResult<BridgeConfig> {
    let config = match path {
        Some(path) => {
            let config = BridgeConfig::load(path)?;
            let shown = path.display().to_string();
            log_event_with_fields(Event::ConfigLoaded, &[("path", shown.as_str())]);
            config
        }
        None => {
            log_event_with_fields(Event::ConfigLoaded, &[("path", "<defaults>")]);
            BridgeConfig::default()
        }
    };
    Ok(config)
}

/// Wire the service stack for a loaded configuration
pub fn bootstrap(config: &BridgeConfig) -> CliResult<MethodRouter> {
    let fixture = match &config.fixture {
        Some(path) => {
            let fixture = Fixture::load(path)?;
            let shown = path.display().to_string();
            let samples = fixture.ecg.len().to_string();
            log_event_with_fields(
                Event::StoreLoaded,
                &[("fixture", shown.as_str()), ("ecg_samples", samples.as_str())],
            );
            fixture
        }
        None => Fixture::default(),
    };

    let store = StoreHandle::lazy(move || {
        Arc::new(FixtureStore::new(fixture.clone())) as Arc<dyn HealthStore>
    });

    let diagnostics = Diagnostics::new(
        Arc::new(MetricsRegistry::new()),
        config.engine.report_tolerated_failures,
    );

    let service = HealthService::new(
        store,
        Arc::new(MetricCatalog::standard()),
        config.engine.clone(),
        config.locale,
        diagnostics,
    );

    Ok(MethodRouter::new(service, config.channels.clone()))
}

fn boot(config_path: Option<&Path>) -> CliResult<(BridgeConfig, MethodRouter)> {
    log_event(Event::BootStart);
    let config = load_config(config_path)?;
    Logger::set_min_severity(config.log_level);
    let router = bootstrap(&config)?;
    Ok((config, router))
}

fn runtime() -> CliResult<Runtime> {
    Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))
}

/// Serve the method channels over HTTP until the process is stopped
pub fn serve(config_path: Option<&Path>, port: Option<u16>) -> CliResult<()> {
    let (mut config, router) = boot(config_path)?;
    if let Some(port) = port {
        config.http.port = port;
    }

    let server = HttpServer::new(config.http.clone(), router);

    let rt = runtime()?;
    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })?;

    log_event(Event::ShutdownComplete);
    Ok(())
}

/// Answer one method call per stdin line until end of input
///
/// Calls are answered in arrival order. Logs go to stderr so stdout
/// carries nothing but response envelopes.
pub fn stdio(config_path: Option<&Path>) -> CliResult<()> {
    Logger::set_stderr_only(true);
    let (_config, router) = boot(config_path)?;
    log_event_with_fields(Event::Serving, &[("transport", "stdio")]);

    let rt = runtime()?;
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    while let Some(frame) = read_frame(&mut reader)? {
        let response = rt.block_on(router.dispatch_frame(&frame));
        write_response(&mut writer, &response)?;
    }

    log_event(Event::ShutdownComplete);
    Ok(())
}

/// Execute a single method call and print its envelope
pub fn call(
    config_path: Option<&Path>,
    channel: &str,
    method: &str,
    arguments: Option<&str>,
) -> CliResult<()> {
    Logger::set_stderr_only(true);
    let (_config, router) = boot(config_path)?;

    let arguments = match arguments {
        Some(raw) => serde_json::from_str::<Value>(raw).map_err(|e| {
            CliError::invalid_argument(format!("--arguments is not valid JSON: {}", e))
        })?,
        None => Value::Null,
    };
    let call = MethodCall::new(channel, method, arguments);

    let rt = runtime()?;
    let response = rt.block_on(router.dispatch(&call));

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    write_response(&mut writer, &response)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MethodResponse;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_defaults_without_path() {
        let config = load_config(None).unwrap();
        assert_eq!(config.channels.health, "healthbridge/health");
        assert_eq!(config.http.port, 47800);
    }

    #[test]
    fn test_load_config_rejects_invalid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{\"engine\": {{\"deadline_ms\": 0}}}}").unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert_eq!(err.code_str(), "HEALTHBRIDGE_CLI_CONFIG_ERROR");
    }

    #[test]
    fn test_bootstrap_missing_fixture_fails() {
        let config = BridgeConfig {
            fixture: Some("/nonexistent/healthbridge/fixture.json".into()),
            ..BridgeConfig::default()
        };

        let err = bootstrap(&config).unwrap_err();
        assert_eq!(err.code_str(), "HEALTHBRIDGE_CLI_FIXTURE_ERROR");
    }

    #[test]
    fn test_demo_config_boots() {
        let config = load_config(Some(Path::new("demos/healthbridge.json"))).unwrap();
        assert_eq!(config.engine.deadline_ms, Some(10000));

        let router = bootstrap(&config).unwrap();
        let rt = runtime().unwrap();
        let response = rt.block_on(router.dispatch(&MethodCall::new(
            "healthbridge/ekg",
            "getEKG",
            Value::Null,
        )));

        let records = response.to_value()["data"].as_array().cloned().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["voltages"].as_array().unwrap().len(), 0);
        assert_eq!(records[1]["voltages"].as_array().unwrap().len(), 7);
    }

    #[test]
    fn test_bootstrap_store_is_lazy() {
        let router = bootstrap(&BridgeConfig::default()).unwrap();
        assert!(!router.service().store().is_initialized());

        let rt = runtime().unwrap();
        let response = rt.block_on(router.dispatch(&MethodCall::new(
            "healthbridge/health",
            "requestAuthorization",
            Value::Null,
        )));

        assert_eq!(response, MethodResponse::ok(Value::Bool(true)));
        assert!(router.service().store().is_initialized());
    }
}
