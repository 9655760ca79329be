//! # HTTP Transport
//!
//! # Endpoints
//!
//! - `POST /invoke/{channel}/{method}` - Method call, body `{"arguments": ...}`
//! - `GET /health` - Health check
//! - `GET /metrics` - Engine and command counters

pub mod invoke_routes;
pub mod observability_routes;
pub mod server;

pub use server::HttpServer;
