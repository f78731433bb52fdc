/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `authorize`: Ask the decision service about one subject
- `check_config`: Validate configuration without contacting the service
*/

pub mod authorize;
pub mod check_config;

pub use authorize::run_authorize;
pub use check_config::run_check_config;
