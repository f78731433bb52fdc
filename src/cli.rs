//! Command-line interface definition for the authorization bridge
//!
//! This module defines the CLI structure using clap's derive API. The CLI
//! stands in for a host: it builds a subject from flags, asks the decision
//! service, and prints the outcome.

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

/// authz-bridge - authorization client for a remote decision service
#[derive(Parser, Debug, Clone)]
#[command(name = "authz-bridge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "AUTHZ_BRIDGE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: Option<String>,

    /// Override the decision service base URL
    #[arg(long)]
    pub service_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Ask the decision service whether a subject is authorized
    Authorize {
        /// Username presented by the subject
        #[arg(short, long)]
        username: Option<String>,

        /// Password presented by the subject
        #[arg(
            short,
            long,
            env = "AUTHZ_BRIDGE_SUBJECT_PASSWORD",
            hide_env_values = true
        )]
        password: Option<String>,

        /// Originating network address
        #[arg(long)]
        remote_address: Option<String>,

        /// Originating hostname
        #[arg(long)]
        remote_hostname: Option<String>,

        /// Request header as `Name: value`; repeat for more
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },

    /// Validate the configuration and exit
    CheckConfig,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some(DEFAULT_CONFIG_PATH.to_string()),
            service_url: None,
            verbose: false,
            json_logs: false,
            command: Commands::CheckConfig,
        }
    }
}

/// Parses a `Name: value` header argument.
fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected 'Name: value', got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header name is empty in '{}'", raw));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
