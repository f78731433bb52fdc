//! Error types for the authorization bridge
//!
//! This module defines the error taxonomy shared by every component, using
//! `thiserror` for the typed variants and `anyhow` for propagation.
//!
//! The [`Authorizer`](crate::authorizer::Authorizer) reports every failure
//! as a single service-layer error: the underlying cause is kept in the
//! `anyhow` chain and [`BridgeError::Service`] is attached on top as
//! context, so callers can either match on the unified type or walk the
//! chain for diagnostics.

use thiserror::Error;

/// Main error type for authorization bridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Required setting missing or internally inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed JSON on encode or decode
    #[error("Codec error: {0}")]
    Codec(String),

    /// The remote service challenged with a scheme this client cannot answer
    #[error("Unsupported authentication scheme: {0}")]
    UnsupportedScheme(String),

    /// A configured realm did not match the realm of the received challenge
    #[error("Configuration error: {scheme} realm mismatch (configured {configured:?}, challenged {challenged:?})")]
    RealmMismatch {
        /// Scheme of the challenge
        scheme: String,
        /// Realm set in the configuration
        configured: String,
        /// Realm presented by the remote service, if any
        challenged: Option<String>,
    },

    /// Credential could not be acquired for a challenge
    #[error("Credential acquisition error: {0}")]
    CredentialAcquisition(String),

    /// The remote service rejected the request itself (4xx)
    #[error("Client error: HTTP {status}: {message}")]
    ClientFault {
        /// HTTP status code returned by the service
        status: u16,
        /// Response body or other detail
        message: String,
    },

    /// Remote service or transport failure
    #[error("Service fault: {0}")]
    ServiceFault(String),

    /// Unified service-layer failure reported to callers of the authorizer
    #[error("Authorization service error: {0}")]
    Service(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl BridgeError {
    /// Returns the human-readable cause when this is the unified
    /// service-layer failure.
    pub fn service_cause(&self) -> Option<&str> {
        match self {
            Self::Service(cause) => Some(cause),
            _ => None,
        }
    }
}

/// Result type alias for authorization bridge operations
///
/// Uses `anyhow::Error` so causes can be layered with context while the
/// typed [`BridgeError`] stays reachable through `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;
