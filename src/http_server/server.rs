//! # HTTP Server
//!
//! Serves the method channels over HTTP next to health and metrics.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::invoke_routes::invoke_routes;
use super::observability_routes::{observability_routes, ObservabilityState};
use crate::channel::MethodRouter;
use crate::config::HttpConfig;
use crate::observability::{log_event_with_fields, Event};

/// HTTP front of a method router
pub struct HttpServer {
    config: HttpConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(config: HttpConfig, methods: MethodRouter) -> Self {
        let router = Self::build_router(&config, methods);
        Self { config, router }
    }

    fn build_router(config: &HttpConfig, methods: MethodRouter) -> Router {
        let store = methods.service().store().clone();
        let observability = ObservabilityState {
            metrics: methods.service().diagnostics().shared_metrics(),
            store_initialized: Arc::new(move || store.is_initialized()),
        };

        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .merge(observability_routes(observability))
            .merge(invoke_routes(methods))
            .layer(cors)
    }

    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind and serve until the process stops
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self.config.socket_addr().parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Invalid socket address {}: {}", self.config.socket_addr(), e),
            )
        })?;

        let listener = TcpListener::bind(addr).await?;
        let bound = listener.local_addr()?.to_string();
        log_event_with_fields(Event::Serving, &[("addr", bound.as_str()), ("transport", "http")]);

        axum::serve(listener, self.router).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelConfig;
    use crate::service::HealthService;
    use crate::store::{Fixture, FixtureStore};

    fn methods() -> MethodRouter {
        let service = HealthService::with_store(Arc::new(FixtureStore::new(Fixture::default())));
        MethodRouter::new(service, ChannelConfig::default())
    }

    #[test]
    fn test_server_with_custom_port() {
        let server = HttpServer::new(HttpConfig::with_port(8080), methods());
        assert_eq!(server.socket_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_router_builds_with_origin_list() {
        let config = HttpConfig {
            cors_origins: vec!["http://localhost:3000".to_string()],
            ..HttpConfig::default()
        };
        let _router = HttpServer::new(config, methods()).router();
    }
}
