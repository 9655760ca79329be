//! CLI argument definitions using clap
//!
//! Commands:
//! - healthbridge serve --config <path> [--port <port>]
//! - healthbridge stdio --config <path>
//! - healthbridge call --config <path> --channel <name> --method <name> [--arguments <json>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// healthbridge - method-channel bridge over an asynchronous health store
#[derive(Parser, Debug)]
#[command(name = "healthbridge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the method channels over HTTP
    Serve {
        /// Path to configuration file; defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port override
        #[arg(long)]
        port: Option<u16>,
    },

    /// Answer line-delimited JSON method calls on stdin
    Stdio {
        /// Path to configuration file; defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Execute a single method call and exit
    Call {
        /// Path to configuration file; defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Channel name
        #[arg(long)]
        channel: String,

        /// Method name
        #[arg(long)]
        method: String,

        /// Arguments as JSON, e.g. '"2024-03-01"'
        #[arg(long)]
        arguments: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_call() {
        let cli = Cli::try_parse_from([
            "healthbridge",
            "call",
            "--channel",
            "healthbridge/health",
            "--method",
            "fetchHealthData",
            "--arguments",
            "\"2024-03-01\"",
        ])
        .unwrap();

        match cli.command {
            Command::Call {
                config,
                channel,
                method,
                arguments,
            } => {
                assert!(config.is_none());
                assert_eq!(channel, "healthbridge/health");
                assert_eq!(method, "fetchHealthData");
                assert_eq!(arguments.as_deref(), Some("\"2024-03-01\""));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_serve_with_port() {
        let cli = Cli::try_parse_from(["healthbridge", "serve", "--port", "9000"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Serve {
                port: Some(9000),
                ..
            }
        ));
    }
}
