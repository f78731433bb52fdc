//! authz-bridge - authorization client CLI
//!
#![doc = "Main entry point for the authz-bridge command-line tool."]

use anyhow::Result;

use authz_bridge::cli::{Cli, Commands};
use authz_bridge::commands::{self, authorize::SubjectArgs};
use authz_bridge::config::{Config, DEFAULT_CONFIG_PATH};
use authz_bridge::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let config = Config::load(config_path, &cli)?;

    init_logging(&config.logging)?;

    match cli.command {
        Commands::Authorize {
            username,
            password,
            remote_address,
            remote_hostname,
            headers,
        } => {
            tracing::info!("Starting authorization request");
            let args = SubjectArgs {
                username,
                password,
                remote_address,
                remote_hostname,
                headers,
            };
            commands::run_authorize(config, args).await?;
            Ok(())
        }
        Commands::CheckConfig => {
            commands::run_check_config(&config)?;
            Ok(())
        }
    }
}
