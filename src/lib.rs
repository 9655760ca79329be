//! healthbridge - method-channel bridge over an asynchronous health store
//!
//! Answers three commands on two named channels:
//! - `requestAuthorization` and `fetchHealthData` on the health channel
//! - `getEKG` on the electrocardiogram channel
//!
//! Every command fans out into independent store queries whose callbacks
//! arrive in any order on any thread. The engine joins them into one reply
//! that is delivered exactly once.

pub mod auth;
pub mod catalog;
pub mod channel;
pub mod cli;
pub mod config;
pub mod engine;
pub mod http_server;
pub mod observability;
pub mod service;
pub mod store;
