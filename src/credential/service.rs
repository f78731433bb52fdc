//! Credential provider backed by static secrets and an OAuth2 token service

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{debug, info};

use super::oauth2::OAuth2TokenClient;
use super::{AuthScheme, ClientChallenge, ClientCredential, CredentialProvider, DigestCredential};
use crate::config::{CredentialsConfig, SecretConfig};
use crate::error::{BridgeError, Result};

/// Resolves client credentials from configuration.
///
/// Basic and Digest answers come from statically configured secrets; a
/// Bearer challenge triggers an OAuth2 client-credentials exchange. The
/// last credential acquired is kept as the current one and shared by
/// every request.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use authz_bridge::config::{CredentialsConfig, SecretConfig};
/// use authz_bridge::credential::{ClientCredentialService, CredentialProvider};
///
/// let config = CredentialsConfig {
///     basic: Some(SecretConfig::new("svc", "pw")),
///     ..CredentialsConfig::default()
/// };
/// let service =
///     ClientCredentialService::from_config(&config, Arc::new(reqwest::Client::new())).unwrap();
/// assert!(service.current().is_none());
/// ```
#[derive(Debug)]
pub struct ClientCredentialService {
    basic: Option<SecretConfig>,
    digest: Option<SecretConfig>,
    oauth2: Option<OAuth2TokenClient>,
    current: RwLock<ClientCredential>,
}

impl ClientCredentialService {
    /// Builds the provider from the `credentials` configuration section.
    ///
    /// `http` is shared with the token client so the OAuth2 exchange uses
    /// the same connection pool and timeout as the transport.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if the OAuth2 service URL is invalid.
    pub fn from_config(config: &CredentialsConfig, http: Arc<reqwest::Client>) -> Result<Self> {
        let oauth2 = config
            .oauth2
            .as_ref()
            .map(|oauth2| OAuth2TokenClient::from_config(oauth2, http))
            .transpose()?;

        Ok(Self {
            basic: config.basic.clone(),
            digest: config.digest.clone(),
            oauth2,
            current: RwLock::new(ClientCredential::None),
        })
    }

    fn install(&self, credential: ClientCredential) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = credential;
    }

    async fn resolve(
        &self,
        scheme: AuthScheme,
        challenge: &ClientChallenge,
    ) -> Result<ClientCredential> {
        match scheme {
            AuthScheme::Basic => {
                let secrets = require_section(self.basic.as_ref(), scheme)?;
                check_realm(scheme, secrets.realm.as_deref(), challenge)?;
                Ok(ClientCredential::Basic {
                    username: secrets.username.clone(),
                    password: secrets.password.clone(),
                })
            }
            AuthScheme::Digest => {
                let secrets = require_section(self.digest.as_ref(), scheme)?;
                check_realm(scheme, secrets.realm.as_deref(), challenge)?;
                let digest =
                    DigestCredential::from_challenge(&secrets.username, &secrets.password, challenge)?;
                Ok(ClientCredential::Digest(digest))
            }
            AuthScheme::Bearer => {
                let client = require_section(self.oauth2.as_ref(), scheme)?;
                check_realm(scheme, client.realm(), challenge)?;
                debug!(
                    token_url = %client.token_url(),
                    "Exchanging client credentials for a bearer token"
                );
                let token = client.exchange().await?;
                Ok(ClientCredential::Bearer { token })
            }
        }
    }
}

#[async_trait]
impl CredentialProvider for ClientCredentialService {
    fn current(&self) -> ClientCredential {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn acquire(&self, challenge: &ClientChallenge) -> Result<ClientCredential> {
        let scheme = challenge
            .auth_scheme()
            .ok_or_else(|| BridgeError::UnsupportedScheme(challenge.scheme.clone()))?;

        debug!(
            scheme = %scheme,
            realm = ?challenge.realm,
            "Resolving client credential for challenge"
        );

        let credential = self.resolve(scheme, challenge).await?;
        self.install(credential.clone());

        info!(
            scheme = %scheme,
            realm = ?challenge.realm,
            "Installed new client credential"
        );
        Ok(credential)
    }
}

fn require_section<T>(section: Option<&T>, scheme: AuthScheme) -> Result<&T> {
    section.ok_or_else(|| {
        BridgeError::Config(format!(
            "service challenged with {scheme} but no {} credentials are configured",
            scheme.as_str().to_ascii_lowercase()
        ))
        .into()
    })
}

/// A configured realm must equal the challenge realm exactly.
fn check_realm(
    scheme: AuthScheme,
    configured: Option<&str>,
    challenge: &ClientChallenge,
) -> Result<()> {
    match configured {
        Some(realm) if challenge.realm.as_deref() != Some(realm) => {
            Err(BridgeError::RealmMismatch {
                scheme: scheme.to_string(),
                configured: realm.to_string(),
                challenged: challenge.realm.clone(),
            }
            .into())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OAuth2Config;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn http() -> Arc<reqwest::Client> {
        Arc::new(reqwest::Client::new())
    }

    fn basic_service(realm: Option<&str>) -> ClientCredentialService {
        let mut secrets = SecretConfig::new("svc", "pw");
        secrets.realm = realm.map(str::to_string);
        let config = CredentialsConfig {
            basic: Some(secrets),
            ..CredentialsConfig::default()
        };
        ClientCredentialService::from_config(&config, http()).unwrap()
    }

    #[tokio::test]
    async fn test_acquire_basic_with_matching_realm() {
        let service = basic_service(Some("X"));
        let credential = service
            .acquire(&ClientChallenge::new("Basic", Some("X")))
            .await
            .unwrap();

        let expected = ClientCredential::Basic {
            username: "svc".to_string(),
            password: "pw".to_string(),
        };
        assert_eq!(credential, expected);
        assert_eq!(service.current(), expected);
    }

    #[tokio::test]
    async fn test_acquire_basic_without_configured_realm_accepts_any() {
        let service = basic_service(None);
        assert!(service
            .acquire(&ClientChallenge::new("basic", Some("anything")))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_realm_mismatch_is_config_error_and_keeps_current() {
        let service = basic_service(Some("X"));
        let err = service
            .acquire(&ClientChallenge::new("Basic", Some("Y")))
            .await
            .unwrap_err();

        match err.downcast_ref::<BridgeError>() {
            Some(BridgeError::RealmMismatch {
                configured,
                challenged,
                ..
            }) => {
                assert_eq!(configured, "X");
                assert_eq!(challenged.as_deref(), Some("Y"));
            }
            other => panic!("expected realm mismatch, got {other:?}"),
        }
        assert!(service.current().is_none());
    }

    #[tokio::test]
    async fn test_realm_comparison_is_case_sensitive() {
        let service = basic_service(Some("X"));
        assert!(service
            .acquire(&ClientChallenge::new("Basic", Some("x")))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_configured_realm_rejects_challenge_without_realm() {
        let service = basic_service(Some("X"));
        assert!(service
            .acquire(&ClientChallenge::new("Basic", None))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_failed_acquire_keeps_previous_credential() {
        let service = basic_service(Some("X"));
        service
            .acquire(&ClientChallenge::new("Basic", Some("X")))
            .await
            .unwrap();
        let before = service.current();

        let _ = service
            .acquire(&ClientChallenge::new("Basic", Some("Y")))
            .await;
        assert_eq!(service.current(), before);
    }

    #[test]
    fn test_current_is_idempotent() {
        let service = basic_service(None);
        assert_eq!(service.current(), service.current());
        assert!(service.current().is_none());
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let service = basic_service(None);
        let err = service
            .acquire(&ClientChallenge::new("Negotiate", None))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BridgeError>(),
            Some(BridgeError::UnsupportedScheme(s)) if s == "Negotiate"
        ));
    }

    #[tokio::test]
    async fn test_unconfigured_scheme_is_config_error() {
        let service = basic_service(None);
        let err = service
            .acquire(&ClientChallenge::new("Digest", Some("r")).with_param("nonce", "n"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BridgeError>(),
            Some(BridgeError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_acquire_digest_carries_challenge_parameters() {
        let config = CredentialsConfig {
            digest: Some(SecretConfig::new("Mufasa", "Circle Of Life")),
            ..CredentialsConfig::default()
        };
        let service = ClientCredentialService::from_config(&config, http()).unwrap();
        let challenge = ClientChallenge::new("Digest", Some("testrealm@host.com"))
            .with_param("nonce", "dcd98b7102dd2f0e8b11d0f600bfb0c093")
            .with_param("qop", "auth");

        match service.acquire(&challenge).await.unwrap() {
            ClientCredential::Digest(digest) => {
                assert_eq!(digest.username, "Mufasa");
                assert_eq!(digest.realm, "testrealm@host.com");
                assert_eq!(digest.nonce, "dcd98b7102dd2f0e8b11d0f600bfb0c093");
                assert!(digest.qop_auth);
            }
            other => panic!("expected digest credential, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_acquire_bearer_exchanges_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "abc",
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = CredentialsConfig {
            oauth2: Some(OAuth2Config {
                realm: Some("api".to_string()),
                service_url: format!("{}/oauth/token", server.uri()),
                client_id: "bridge".to_string(),
                client_secret: None,
                scope: None,
            }),
            ..CredentialsConfig::default()
        };
        let service = ClientCredentialService::from_config(&config, http()).unwrap();

        let credential = service
            .acquire(&ClientChallenge::new("Bearer", Some("api")))
            .await
            .unwrap();
        assert_eq!(
            credential,
            ClientCredential::Bearer {
                token: "abc".to_string()
            }
        );
        assert_eq!(service.current(), credential);
    }

    #[tokio::test]
    async fn test_token_exchange_failure_propagates_without_install() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let config = CredentialsConfig {
            oauth2: Some(OAuth2Config {
                realm: None,
                service_url: server.uri(),
                client_id: "bridge".to_string(),
                client_secret: None,
                scope: None,
            }),
            ..CredentialsConfig::default()
        };
        let service = ClientCredentialService::from_config(&config, http()).unwrap();

        let err = service
            .acquire(&ClientChallenge::new("Bearer", None))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BridgeError>(),
            Some(BridgeError::CredentialAcquisition(_))
        ));
        assert!(service.current().is_none());
    }
}
