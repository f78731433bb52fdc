//! Configuration management for the authorization bridge
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{BridgeError, Result};

/// Configuration file read when no `--config` is given
pub const DEFAULT_CONFIG_PATH: &str = "config/authz-bridge.yaml";

/// Main configuration structure for the authorization bridge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote decision service settings
    #[serde(default)]
    pub service: ServiceConfig,
    /// Client credentials presented to the decision service
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote decision service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the decision service
    #[serde(default)]
    pub url: String,

    /// Path of the authorization endpoint, appended to `url`
    #[serde(default = "default_authorization_path")]
    pub authorization_path: String,

    /// Timeout for each HTTP call, in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_authorization_path() -> String {
    "/authorization".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            authorization_path: default_authorization_path(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Client credential configuration, one optional section per scheme
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Secrets answering a `Basic` challenge
    #[serde(default)]
    pub basic: Option<SecretConfig>,
    /// Secrets answering a `Digest` challenge
    #[serde(default)]
    pub digest: Option<SecretConfig>,
    /// Token service answering a `Bearer` challenge
    #[serde(default)]
    pub oauth2: Option<OAuth2Config>,
}

/// Static username and password for Basic or Digest
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretConfig {
    /// Realm the secrets are restricted to; any realm when unset
    #[serde(default)]
    pub realm: Option<String>,
    /// Client username
    #[serde(default)]
    pub username: String,
    /// Client password
    #[serde(default)]
    pub password: String,
}

impl SecretConfig {
    /// Creates a section without a realm restriction.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            realm: None,
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for SecretConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretConfig")
            .field("realm", &self.realm)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// OAuth2 client-credentials token service
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Config {
    /// Realm the token is restricted to; any realm when unset
    #[serde(default)]
    pub realm: Option<String>,
    /// Token endpoint URL
    #[serde(default)]
    pub service_url: String,
    /// OAuth2 client identifier
    #[serde(default)]
    pub client_id: String,
    /// OAuth2 client secret, for confidential clients
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Requested scope
    #[serde(default)]
    pub scope: Option<String>,
}

impl fmt::Debug for OAuth2Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Config")
            .field("realm", &self.realm)
            .field("service_url", &self.service_url)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("scope", &self.scope)
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error: defaults are used and the
    /// environment and CLI are still applied.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    /// Parses a YAML configuration file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_yaml(&contents)
    }

    /// Parses configuration from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents)
            .map_err(|e| BridgeError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(url) = std::env::var("AUTHZ_BRIDGE_SERVICE_URL") {
            self.service.url = url;
        }

        if let Ok(path) = std::env::var("AUTHZ_BRIDGE_AUTHORIZATION_PATH") {
            self.service.authorization_path = path;
        }

        if let Ok(timeout) = std::env::var("AUTHZ_BRIDGE_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.service.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid AUTHZ_BRIDGE_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        apply_secret_env("AUTHZ_BRIDGE_BASIC", &mut self.credentials.basic);
        apply_secret_env("AUTHZ_BRIDGE_DIGEST", &mut self.credentials.digest);
        self.apply_oauth2_env();

        if let Ok(level) = std::env::var("AUTHZ_BRIDGE_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json) = std::env::var("AUTHZ_BRIDGE_LOG_JSON") {
            match json.to_lowercase().as_str() {
                "true" | "1" | "yes" => self.logging.json = true,
                "false" | "0" | "no" => self.logging.json = false,
                _ => tracing::warn!("Invalid AUTHZ_BRIDGE_LOG_JSON: {}", json),
            }
        }
    }

    fn apply_oauth2_env(&mut self) {
        let realm = std::env::var("AUTHZ_BRIDGE_OAUTH2_REALM").ok();
        let service_url = std::env::var("AUTHZ_BRIDGE_OAUTH2_SERVICE_URL").ok();
        let client_id = std::env::var("AUTHZ_BRIDGE_OAUTH2_CLIENT_ID").ok();
        let client_secret = std::env::var("AUTHZ_BRIDGE_OAUTH2_CLIENT_SECRET").ok();
        let scope = std::env::var("AUTHZ_BRIDGE_OAUTH2_SCOPE").ok();

        if realm.is_none()
            && service_url.is_none()
            && client_id.is_none()
            && client_secret.is_none()
            && scope.is_none()
        {
            return;
        }

        let oauth2 = self.credentials.oauth2.get_or_insert_with(Default::default);
        if realm.is_some() {
            oauth2.realm = realm;
        }
        if let Some(url) = service_url {
            oauth2.service_url = url;
        }
        if let Some(id) = client_id {
            oauth2.client_id = id;
        }
        if client_secret.is_some() {
            oauth2.client_secret = client_secret;
        }
        if scope.is_some() {
            oauth2.scope = scope;
        }
        tracing::debug!("Applied AUTHZ_BRIDGE_OAUTH2_* overrides");
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(url) = &cli.service_url {
            tracing::debug!("Using service URL override: {}", url);
            self.service.url = url.clone();
        }
        if cli.verbose {
            self.logging.level = "debug".to_string();
        }
        if cli.json_logs {
            self.logging.json = true;
        }
    }

    /// Validate the configuration
    ///
    /// Checks every required setting before any network call is made.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] naming the first invalid setting
    pub fn validate(&self) -> Result<()> {
        self.service_url()?;

        if !self.service.authorization_path.starts_with('/') {
            return Err(BridgeError::Config(format!(
                "service.authorization_path must start with '/': {}",
                self.service.authorization_path
            ))
            .into());
        }

        if self.service.timeout_seconds == 0 {
            return Err(BridgeError::Config(
                "service.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if let Some(basic) = &self.credentials.basic {
            validate_secret("basic", basic)?;
        }
        if let Some(digest) = &self.credentials.digest {
            validate_secret("digest", digest)?;
        }

        if let Some(oauth2) = &self.credentials.oauth2 {
            if oauth2.service_url.trim().is_empty() {
                return Err(BridgeError::Config(
                    "credentials.oauth2.service_url is required".to_string(),
                )
                .into());
            }
            Url::parse(&oauth2.service_url).map_err(|e| {
                BridgeError::Config(format!(
                    "credentials.oauth2.service_url is not a valid URL: {}",
                    e
                ))
            })?;
            if oauth2.client_id.trim().is_empty() {
                return Err(BridgeError::Config(
                    "credentials.oauth2.client_id is required".to_string(),
                )
                .into());
            }
        }

        Ok(())
    }

    /// The parsed decision service base URL.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if the URL is missing or invalid
    pub fn service_url(&self) -> Result<Url> {
        if self.service.url.trim().is_empty() {
            return Err(BridgeError::Config("service.url is required".to_string()).into());
        }
        Url::parse(&self.service.url).map_err(|e| {
            BridgeError::Config(format!("service.url is not a valid URL: {}", e)).into()
        })
    }

    /// Timeout applied to every HTTP call.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_seconds)
    }
}

fn apply_secret_env(prefix: &str, section: &mut Option<SecretConfig>) {
    let realm = std::env::var(format!("{prefix}_REALM")).ok();
    let username = std::env::var(format!("{prefix}_USERNAME")).ok();
    let password = std::env::var(format!("{prefix}_PASSWORD")).ok();

    if realm.is_none() && username.is_none() && password.is_none() {
        return;
    }

    let secrets = section.get_or_insert_with(SecretConfig::default);
    if realm.is_some() {
        secrets.realm = realm;
    }
    if let Some(username) = username {
        secrets.username = username;
    }
    if let Some(password) = password {
        secrets.password = password;
    }
    tracing::debug!("Applied {}_* overrides", prefix);
}

fn validate_secret(name: &str, secrets: &SecretConfig) -> Result<()> {
    if secrets.username.is_empty() {
        return Err(
            BridgeError::Config(format!("credentials.{name}.username is required")).into(),
        );
    }
    if secrets.password.is_empty() {
        return Err(
            BridgeError::Config(format!("credentials.{name}.password is required")).into(),
        );
    }
    Ok(())
}
