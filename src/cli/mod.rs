//! CLI module for healthbridge
//!
//! Provides command-line interface for:
//! - serve: HTTP transport for the method channels
//! - stdio: line-delimited JSON method calls on stdin/stdout
//! - call: one-shot method call

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{bootstrap, call, load_config, run, run_command, serve, stdio};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_frame, write_response};
