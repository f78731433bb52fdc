//! Structured logging setup
//!
//! Provides JSON-formatted and human-readable logging on top of the
//! `tracing` ecosystem. `RUST_LOG` takes precedence over the configured
//! level.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Initialize logging based on configuration.
///
/// A bare level such as `debug` applies to this crate only; anything
/// containing a directive (`=` or `,`) is used as a full filter.
///
/// # Errors
///
/// Returns error if the filter does not parse or a global subscriber is
/// already installed
///
/// # Examples
///
/// ```no_run
/// use authz_bridge::config::LoggingConfig;
/// use authz_bridge::logging::init_logging;
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     json: true,
/// };
/// init_logging(&config).unwrap();
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(&config.level)))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.json {
        let layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr);
        registry.with(layer).try_init()?;
    } else {
        let layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr);
        registry.with(layer).try_init()?;
    }

    Ok(())
}

fn filter_directive(level: &str) -> String {
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("authz_bridge={}", level)
    }
}
