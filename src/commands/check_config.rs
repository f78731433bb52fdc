//! `check-config` command

use crate::config::Config;
use crate::error::Result;

/// Validates `config` and prints a short summary of what is configured.
///
/// # Errors
///
/// Returns the first validation failure.
pub fn run_check_config(config: &Config) -> Result<()> {
    config.validate()?;

    let mut schemes = Vec::new();
    if config.credentials.basic.is_some() {
        schemes.push("Basic");
    }
    if config.credentials.digest.is_some() {
        schemes.push("Digest");
    }
    if config.credentials.oauth2.is_some() {
        schemes.push("Bearer");
    }

    println!("Configuration OK");
    println!(
        "  endpoint: {}{}",
        config.service.url.trim_end_matches('/'),
        config.service.authorization_path
    );
    println!("  timeout:  {}s", config.service.timeout_seconds);
    if schemes.is_empty() {
        println!("  client credentials: none");
    } else {
        println!("  client credentials: {}", schemes.join(", "));
    }
    Ok(())
}
