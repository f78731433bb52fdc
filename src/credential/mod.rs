//! Client credentials presented to the decision service
//!
//! The bridge acts as a *client* of the remote decision service and may be
//! asked to authenticate itself. This module holds the types that describe
//! that negotiation and the provider that resolves credentials for it.
//!
//! # Module Layout
//!
//! - [`challenge`] -- `WWW-Authenticate` parsing into [`ClientChallenge`]
//! - [`oauth2`]    -- OAuth2 client-credentials token exchange
//! - [`service`]   -- [`ClientCredentialService`](service::ClientCredentialService),
//!   the provider holding the current credential

pub mod challenge;
pub mod oauth2;
pub mod service;

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{BridgeError, Result};

pub use service::ClientCredentialService;

/// Authentication schemes this client can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthScheme {
    /// RFC 7617 Basic authentication
    Basic,
    /// RFC 7616 Digest authentication
    Digest,
    /// RFC 6750 bearer token obtained through OAuth2
    Bearer,
}

impl AuthScheme {
    /// Parses a scheme name, ignoring ASCII case.
    ///
    /// # Examples
    ///
    /// ```
    /// use authz_bridge::credential::AuthScheme;
    ///
    /// assert_eq!(AuthScheme::parse("bearer"), Some(AuthScheme::Bearer));
    /// assert_eq!(AuthScheme::parse("Negotiate"), None);
    /// ```
    pub fn parse(name: &str) -> Option<Self> {
        [Self::Basic, Self::Digest, Self::Bearer]
            .into_iter()
            .find(|scheme| scheme.as_str().eq_ignore_ascii_case(name))
    }

    /// Canonical scheme name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Digest => "Digest",
            Self::Bearer => "Bearer",
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authentication challenge addressed to this client.
///
/// `params` holds every auth-param of the challenge with lowercase names,
/// including `realm`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientChallenge {
    /// Scheme name as sent by the server.
    pub scheme: String,

    /// Realm presented by the server, if any.
    pub realm: Option<String>,

    /// All auth-params of the challenge.
    pub params: IndexMap<String, String>,
}

impl ClientChallenge {
    /// Creates a challenge for a scheme and optional realm.
    pub fn new(scheme: impl Into<String>, realm: Option<&str>) -> Self {
        let mut challenge = Self {
            scheme: scheme.into(),
            ..Self::default()
        };
        if let Some(realm) = realm {
            challenge = challenge.with_param("realm", realm);
        }
        challenge
    }

    /// Adds an auth-param; `realm` also sets [`ClientChallenge::realm`].
    pub fn with_param(mut self, name: &str, value: impl Into<String>) -> Self {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        if name == "realm" {
            self.realm = Some(value.clone());
        }
        self.params.insert(name, value);
        self
    }

    /// Looks up an auth-param by name, ignoring ASCII case.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The scheme as a supported [`AuthScheme`], if it is one.
    pub fn auth_scheme(&self) -> Option<AuthScheme> {
        AuthScheme::parse(&self.scheme)
    }
}

/// Hash algorithms accepted in a Digest challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgorithm {
    /// `MD5`, the default when the challenge names none
    #[default]
    Md5,
    /// `MD5-sess`
    Md5Sess,
    /// `SHA-256`
    Sha256,
    /// `SHA-256-sess`
    Sha256Sess,
}

impl DigestAlgorithm {
    /// Parses an `algorithm` auth-param value, ignoring ASCII case.
    pub fn parse(name: &str) -> Option<Self> {
        [Self::Md5, Self::Md5Sess, Self::Sha256, Self::Sha256Sess]
            .into_iter()
            .find(|alg| alg.as_str().eq_ignore_ascii_case(name))
    }

    /// Name as written in the `algorithm` auth-param.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Md5Sess => "MD5-sess",
            Self::Sha256 => "SHA-256",
            Self::Sha256Sess => "SHA-256-sess",
        }
    }

    /// Whether the session variant of HA1 is used.
    pub fn is_session(&self) -> bool {
        matches!(self, Self::Md5Sess | Self::Sha256Sess)
    }
}

/// Credential material for Digest authentication.
///
/// Besides the configured secrets it carries the server parameters needed
/// to compute a response for each request. Clones share one nonce count, so
/// every request answering the same server nonce sends a higher `nc`.
#[derive(Clone)]
pub struct DigestCredential {
    /// Configured username.
    pub username: String,
    /// Configured password.
    pub password: String,
    /// Realm taken from the challenge.
    pub realm: String,
    /// Server nonce.
    pub nonce: String,
    /// Opaque value to echo back, if the server sent one.
    pub opaque: Option<String>,
    /// Whether the server offered `qop=auth`.
    pub qop_auth: bool,
    /// Hash algorithm.
    pub algorithm: DigestAlgorithm,
    nonce_count: Arc<AtomicU32>,
}

impl DigestCredential {
    /// Builds a Digest credential answering `challenge`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::CredentialAcquisition`] when the challenge
    /// has no nonce, or names an unknown algorithm, or offers only
    /// `auth-int` protection.
    pub fn from_challenge(
        username: &str,
        password: &str,
        challenge: &ClientChallenge,
    ) -> Result<Self> {
        let nonce = challenge.param("nonce").ok_or_else(|| {
            BridgeError::CredentialAcquisition("Digest challenge has no nonce".to_string())
        })?;

        let algorithm = match challenge.param("algorithm") {
            Some(name) => DigestAlgorithm::parse(name).ok_or_else(|| {
                BridgeError::CredentialAcquisition(format!(
                    "unsupported Digest algorithm: {name}"
                ))
            })?,
            None => DigestAlgorithm::default(),
        };

        let qop_auth = match challenge.param("qop") {
            Some(qop) => {
                let offered = qop
                    .split(',')
                    .map(str::trim)
                    .any(|q| q.eq_ignore_ascii_case("auth"));
                if !offered {
                    return Err(BridgeError::CredentialAcquisition(format!(
                        "unsupported Digest qop: {qop}"
                    ))
                    .into());
                }
                true
            }
            None => false,
        };

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
            realm: challenge.realm.clone().unwrap_or_default(),
            nonce: nonce.to_string(),
            opaque: challenge.param("opaque").map(str::to_string),
            qop_auth,
            algorithm,
            nonce_count: Arc::new(AtomicU32::new(0)),
        })
    }

    /// Advances and returns the nonce count for the next request, starting
    /// at 1.
    pub fn next_nonce_count(&self) -> u32 {
        self.nonce_count.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }
}

impl PartialEq for DigestCredential {
    fn eq(&self, other: &Self) -> bool {
        self.username == other.username
            && self.password == other.password
            && self.realm == other.realm
            && self.nonce == other.nonce
            && self.opaque == other.opaque
            && self.qop_auth == other.qop_auth
            && self.algorithm == other.algorithm
    }
}

impl Eq for DigestCredential {}

impl fmt::Debug for DigestCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestCredential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("realm", &self.realm)
            .field("algorithm", &self.algorithm)
            .field("qop_auth", &self.qop_auth)
            .finish_non_exhaustive()
    }
}

/// The identity this bridge presents to the decision service.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum ClientCredential {
    /// No credential acquired yet
    #[default]
    None,
    /// Basic username and password
    Basic {
        /// Configured username
        username: String,
        /// Configured password
        password: String,
    },
    /// Digest username, password, and server parameters
    Digest(DigestCredential),
    /// OAuth2 bearer token
    Bearer {
        /// Access token from the token service
        token: String,
    },
}

impl ClientCredential {
    /// Returns `true` when no credential has been acquired.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Scheme this credential answers, if any.
    pub fn scheme(&self) -> Option<AuthScheme> {
        match self {
            Self::None => None,
            Self::Basic { .. } => Some(AuthScheme::Basic),
            Self::Digest(_) => Some(AuthScheme::Digest),
            Self::Bearer { .. } => Some(AuthScheme::Bearer),
        }
    }

    /// Scheme name for logging, `"none"` when absent.
    pub fn scheme_name(&self) -> &'static str {
        self.scheme().map_or("none", |s| s.as_str())
    }
}

impl fmt::Debug for ClientCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Digest(digest) => f.debug_tuple("Digest").field(digest).finish(),
            Self::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

/// Holds the current client credential and resolves new ones on demand.
///
/// Implementations must be safe to share between concurrent authorization
/// requests. Replacing the current credential is an atomic swap; two
/// requests racing on a stale credential may each install their own,
/// equally valid, replacement.
#[async_trait::async_trait]
pub trait CredentialProvider: Send + Sync + fmt::Debug {
    /// Returns the credential last acquired, or [`ClientCredential::None`].
    fn current(&self) -> ClientCredential;

    /// Resolves a credential for `challenge` and installs it as current.
    ///
    /// # Errors
    ///
    /// Any failure is terminal for the caller's authorization attempt and
    /// leaves the current credential untouched.
    async fn acquire(&self, challenge: &ClientChallenge) -> Result<ClientCredential>;
}
