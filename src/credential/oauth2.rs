//! OAuth2 client-credentials token exchange
//!
//! When the decision service challenges with `Bearer`, the bridge obtains an
//! access token from the configured OAuth2 token service using the
//! `client_credentials` grant (RFC 6749 section 4.4).

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::config::OAuth2Config;
use crate::error::{BridgeError, Result};

/// Raw JSON response from an OAuth2 token endpoint.
#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Client for the token endpoint of an OAuth2 service.
#[derive(Clone)]
pub struct OAuth2TokenClient {
    http: Arc<reqwest::Client>,
    token_url: Url,
    client_id: String,
    client_secret: Option<String>,
    scope: Option<String>,
    realm: Option<String>,
}

impl OAuth2TokenClient {
    /// Builds a token client from its configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if the service URL does not parse.
    pub fn from_config(config: &OAuth2Config, http: Arc<reqwest::Client>) -> Result<Self> {
        let token_url = Url::parse(&config.service_url).map_err(|e| {
            BridgeError::Config(format!(
                "invalid OAuth2 service url '{}': {e}",
                config.service_url
            ))
        })?;

        Ok(Self {
            http,
            token_url,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scope.clone(),
            realm: config.realm.clone(),
        })
    }

    /// Realm this client is restricted to, if configured.
    pub fn realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }

    /// Token endpoint URL.
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// Requests a fresh access token.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::CredentialAcquisition`] when the token service
    /// is unreachable, answers with a non-success status, returns a body
    /// that is not a token response, or issues a token type other than
    /// `Bearer`.
    pub async fn exchange(&self) -> Result<String> {
        let mut params: Vec<(&str, &str)> = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
        ];
        if let Some(secret) = &self.client_secret {
            params.push(("client_secret", secret.as_str()));
        }
        if let Some(scope) = &self.scope {
            params.push(("scope", scope.as_str()));
        }

        tracing::debug!(
            token_url = %self.token_url,
            client_id = %self.client_id,
            "Requesting OAuth2 access token"
        );

        let resp = self
            .http
            .post(self.token_url.clone())
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                BridgeError::CredentialAcquisition(format!("token request failed: {e}"))
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable response body: {e}>"));
            return Err(BridgeError::CredentialAcquisition(format!(
                "token endpoint returned {status}: {body}"
            ))
            .into());
        }

        let raw: TokenResponse = resp.json().await.map_err(|e| {
            BridgeError::CredentialAcquisition(format!("failed to parse token response: {e}"))
        })?;

        if !raw.token_type.eq_ignore_ascii_case("bearer") {
            return Err(BridgeError::CredentialAcquisition(format!(
                "unsupported token type: {}",
                raw.token_type
            ))
            .into());
        }

        tracing::debug!(expires_in = ?raw.expires_in, "Received OAuth2 access token");
        Ok(raw.access_token)
    }
}

impl fmt::Debug for OAuth2TokenClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2TokenClient")
            .field("token_url", &self.token_url.as_str())
            .field("client_id", &self.client_id)
            .field("realm", &self.realm)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
