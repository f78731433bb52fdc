//! Authorization orchestration
//!
//! [`Authorizer::authorize`] ties the codec, transport, credential provider
//! and decision interpreter together:
//!
//! 1. post the encoded subject with the current client credential
//! 2. on a client challenge, acquire a new credential and post once more
//! 3. decode and interpret a successful response
//!
//! A challenge on the second attempt is terminal. Every failure reaches the
//! caller as [`BridgeError::Service`] attached on top of its cause.

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, warn};
use url::Url;

use crate::codec::JsonCodec;
use crate::config::Config;
use crate::credential::{ClientCredentialService, CredentialProvider};
use crate::decision::{interpret, Outcome};
use crate::error::{BridgeError, Result};
use crate::subject::Subject;
use crate::transport::rest::build_http_client;
use crate::transport::{AuthTransport, PostOutcome, RestTransport};

/// Which post of the negotiation is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Initial,
    Reauthenticated,
}

/// Client of the remote decision service.
///
/// Cheap to share behind an `Arc`; concurrent calls to
/// [`authorize`](Self::authorize) need no external locking.
#[derive(Debug, Clone)]
pub struct Authorizer {
    transport: Arc<dyn AuthTransport>,
    credentials: Arc<dyn CredentialProvider>,
    codec: JsonCodec,
    service_url: Url,
    authorization_path: String,
}

impl Authorizer {
    /// Creates an authorizer from explicit collaborators.
    pub fn new(
        transport: Arc<dyn AuthTransport>,
        credentials: Arc<dyn CredentialProvider>,
        service_url: Url,
        authorization_path: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            credentials,
            codec: JsonCodec,
            service_url,
            authorization_path: authorization_path.into(),
        }
    }

    /// Builds the production authorizer: a REST transport and a
    /// configuration-backed credential service sharing one HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if the configuration is invalid. No
    /// network call is made in that case.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let http = Arc::new(build_http_client(config.timeout())?);
        let credentials = ClientCredentialService::from_config(&config.credentials, http.clone())?;

        Ok(Self::new(
            Arc::new(RestTransport::with_client(http)),
            Arc::new(credentials),
            config.service_url()?,
            config.service.authorization_path.clone(),
        ))
    }

    /// The credential provider in use.
    pub fn credentials(&self) -> &Arc<dyn CredentialProvider> {
        &self.credentials
    }

    /// Asks the decision service whether `subject` is authorized.
    ///
    /// Returns [`Outcome::NotAuthorized`] for a denial, which is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Any failure is reported with [`BridgeError::Service`] as the
    /// outermost error, carrying a human-readable cause; the original error
    /// stays in the chain.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use authz_bridge::{Authorizer, Config, Subject};
    ///
    /// # async fn run(config: Config) -> anyhow::Result<()> {
    /// let authorizer = Authorizer::from_config(&config)?;
    /// let outcome = authorizer.authorize(&Subject::new("alice", "secret")).await?;
    /// if let Some(configs) = outcome.configurations() {
    ///     for name in configs.keys() {
    ///         println!("granted {name}");
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn authorize(&self, subject: &Subject) -> Result<Outcome> {
        let body = self
            .codec
            .encode(subject)
            .context(service_error("failed to encode authorization request"))?;

        let mut credential = self.credentials.current();
        let mut attempt = Attempt::Initial;

        loop {
            debug!(
                attempt = ?attempt,
                scheme = credential.scheme_name(),
                "Sending authorization request"
            );

            let outcome = self
                .transport
                .post(
                    &self.service_url,
                    &self.authorization_path,
                    &credential,
                    &body,
                )
                .await;

            debug!(
                attempt = ?attempt,
                outcome = outcome.kind(),
                "Decision service responded"
            );

            match (outcome, attempt) {
                (PostOutcome::Success(response), _) => return self.decide(&response),

                (PostOutcome::NeedsClientAuth(challenge), Attempt::Initial) => {
                    debug!(
                        scheme = %challenge.scheme,
                        realm = ?challenge.realm,
                        "Decision service requires client authentication"
                    );
                    credential = self
                        .credentials
                        .acquire(&challenge)
                        .await
                        .context(service_error("failed to acquire client credential"))?;
                    attempt = Attempt::Reauthenticated;
                }

                (PostOutcome::NeedsClientAuth(challenge), Attempt::Reauthenticated) => {
                    warn!(
                        scheme = %challenge.scheme,
                        realm = ?challenge.realm,
                        "Client credential rejected after re-authentication"
                    );
                    return Err(anyhow::Error::new(BridgeError::ServiceFault(format!(
                        "second {} challenge after re-authentication",
                        challenge.scheme
                    )))
                    .context(service_error("provider client authentication failed")));
                }

                (PostOutcome::ClientFault { status, body }, _) => {
                    warn!(status, "Decision service rejected the request");
                    return Err(anyhow::Error::new(BridgeError::ClientFault {
                        status,
                        message: body,
                    })
                    .context(service_error("provider error when contacting REST service")));
                }

                (PostOutcome::ServiceFault(cause), _) => {
                    warn!(error = %cause, "Decision service call failed");
                    return Err(cause.context(service_error("REST service error")));
                }
            }
        }
    }

    fn decide(&self, response: &str) -> Result<Outcome> {
        let decision = self
            .codec
            .decode(response)
            .context(service_error("failed to decode authorization response"))?;

        interpret(&decision)
    }
}

fn service_error(cause: &str) -> BridgeError {
    BridgeError::Service(cause.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{ClientChallenge, ClientCredential};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed list of outcomes and records the credential of
    /// every call.
    #[derive(Debug, Default)]
    struct ScriptedTransport {
        outcomes: Mutex<VecDeque<PostOutcome>>,
        seen: Mutex<Vec<ClientCredential>>,
    }

    impl ScriptedTransport {
        fn new(outcomes: Vec<PostOutcome>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<ClientCredential> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AuthTransport for ScriptedTransport {
        async fn post(
            &self,
            _service_url: &Url,
            _authorization_path: &str,
            credential: &ClientCredential,
            _body: &str,
        ) -> PostOutcome {
            self.seen.lock().unwrap().push(credential.clone());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("transport called more often than scripted")
        }
    }

    #[derive(Debug)]
    struct FixedProvider {
        current: Mutex<ClientCredential>,
        issue: Option<ClientCredential>,
        acquired: Mutex<Vec<ClientChallenge>>,
    }

    impl FixedProvider {
        fn issuing(credential: ClientCredential) -> Arc<Self> {
            Arc::new(Self {
                current: Mutex::new(ClientCredential::None),
                issue: Some(credential),
                acquired: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                current: Mutex::new(ClientCredential::None),
                issue: None,
                acquired: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CredentialProvider for FixedProvider {
        fn current(&self) -> ClientCredential {
            self.current.lock().unwrap().clone()
        }

        async fn acquire(&self, challenge: &ClientChallenge) -> Result<ClientCredential> {
            self.acquired.lock().unwrap().push(challenge.clone());
            let credential = self
                .issue
                .clone()
                .ok_or_else(|| BridgeError::RealmMismatch {
                    scheme: challenge.scheme.clone(),
                    configured: "X".to_string(),
                    challenged: challenge.realm.clone(),
                })?;
            *self.current.lock().unwrap() = credential.clone();
            Ok(credential)
        }
    }

    fn basic() -> ClientCredential {
        ClientCredential::Basic {
            username: "svc".to_string(),
            password: "pw".to_string(),
        }
    }

    fn challenge() -> PostOutcome {
        PostOutcome::NeedsClientAuth(ClientChallenge::new("Basic", Some("X")))
    }

    fn granted() -> PostOutcome {
        PostOutcome::Success(
            r#"{"authorized":true,"configurations":{"A":{"protocol":"SSH","parameters":{"port":22}}}}"#
                .to_string(),
        )
    }

    fn authorizer(
        transport: Arc<ScriptedTransport>,
        provider: Arc<FixedProvider>,
    ) -> Authorizer {
        Authorizer::new(
            transport,
            provider,
            Url::parse("http://authz.test").unwrap(),
            "/authorization",
        )
    }

    fn service_cause(err: &anyhow::Error) -> String {
        err.downcast_ref::<BridgeError>()
            .and_then(BridgeError::service_cause)
            .map(str::to_string)
            .unwrap_or_else(|| panic!("expected unified service error, got {err:#}"))
    }

    #[tokio::test]
    async fn test_success_without_challenge() {
        let transport = ScriptedTransport::new(vec![granted()]);
        let provider = FixedProvider::issuing(basic());
        let outcome = authorizer(transport.clone(), provider.clone())
            .authorize(&Subject::new("alice", "pw"))
            .await
            .unwrap();

        assert!(outcome.is_authorized());
        assert_eq!(transport.calls(), vec![ClientCredential::None]);
        assert!(provider.acquired.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_challenge_then_success_retries_once_with_new_credential() {
        let transport = ScriptedTransport::new(vec![challenge(), granted()]);
        let provider = FixedProvider::issuing(basic());
        let outcome = authorizer(transport.clone(), provider.clone())
            .authorize(&Subject::new("alice", "pw"))
            .await
            .unwrap();

        let configs = outcome.configurations().unwrap();
        assert_eq!(configs["A"].parameter("port"), Some("22"));
        assert_eq!(transport.calls(), vec![ClientCredential::None, basic()]);

        let acquired = provider.acquired.lock().unwrap();
        assert_eq!(acquired.len(), 1);
        assert_eq!(acquired[0].realm.as_deref(), Some("X"));
    }

    #[tokio::test]
    async fn test_second_challenge_is_terminal_without_third_attempt() {
        let transport = ScriptedTransport::new(vec![challenge(), challenge()]);
        let provider = FixedProvider::issuing(basic());
        let err = authorizer(transport.clone(), provider.clone())
            .authorize(&Subject::new("alice", "pw"))
            .await
            .unwrap_err();

        assert_eq!(service_cause(&err), "provider client authentication failed");
        assert_eq!(transport.calls().len(), 2);
        assert_eq!(provider.acquired.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_acquisition_failure_is_terminal() {
        let transport = ScriptedTransport::new(vec![challenge()]);
        let err = authorizer(transport.clone(), FixedProvider::failing())
            .authorize(&Subject::new("alice", "pw"))
            .await
            .unwrap_err();

        assert_eq!(service_cause(&err), "failed to acquire client credential");
        assert!(err
            .chain()
            .any(|e| matches!(e.downcast_ref::<BridgeError>(), Some(BridgeError::RealmMismatch { .. }))));
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_client_fault_keeps_status() {
        let transport = ScriptedTransport::new(vec![PostOutcome::ClientFault {
            status: 422,
            body: "bad subject".to_string(),
        }]);
        let err = authorizer(transport, FixedProvider::issuing(basic()))
            .authorize(&Subject::default())
            .await
            .unwrap_err();

        assert_eq!(
            service_cause(&err),
            "provider error when contacting REST service"
        );
        let root = err.root_cause().downcast_ref::<BridgeError>();
        assert!(matches!(
            root,
            Some(BridgeError::ClientFault { status: 422, .. })
        ));
    }

    #[tokio::test]
    async fn test_client_fault_after_retry_is_reported() {
        let transport = ScriptedTransport::new(vec![
            challenge(),
            PostOutcome::ClientFault {
                status: 400,
                body: String::new(),
            },
        ]);
        let err = authorizer(transport.clone(), FixedProvider::issuing(basic()))
            .authorize(&Subject::default())
            .await
            .unwrap_err();
        assert_eq!(
            service_cause(&err),
            "provider error when contacting REST service"
        );
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_service_fault_keeps_cause() {
        let transport = ScriptedTransport::new(vec![PostOutcome::ServiceFault(
            BridgeError::ServiceFault("HTTP 503 Service Unavailable".to_string()).into(),
        )]);
        let err = authorizer(transport, FixedProvider::issuing(basic()))
            .authorize(&Subject::default())
            .await
            .unwrap_err();

        assert_eq!(service_cause(&err), "REST service error");
        assert!(err.root_cause().to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_denial_is_not_an_error() {
        let transport =
            ScriptedTransport::new(vec![PostOutcome::Success(r#"{"authorized":false}"#.to_string())]);
        let outcome = authorizer(transport, FixedProvider::issuing(basic()))
            .authorize(&Subject::default())
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::NotAuthorized);
    }

    #[tokio::test]
    async fn test_authorized_without_configurations_is_service_error() {
        let transport =
            ScriptedTransport::new(vec![PostOutcome::Success(r#"{"authorized":true}"#.to_string())]);
        let err = authorizer(transport, FixedProvider::issuing(basic()))
            .authorize(&Subject::default())
            .await
            .unwrap_err();
        assert_eq!(service_cause(&err), "configurations required");
    }

    #[tokio::test]
    async fn test_malformed_grant_reports_its_own_cause() {
        let transport = ScriptedTransport::new(vec![PostOutcome::Success(
            r#"{"authorized":true,"configurations":{"A":"ssh"}}"#.to_string(),
        )]);
        let err = authorizer(transport, FixedProvider::issuing(basic()))
            .authorize(&Subject::default())
            .await
            .unwrap_err();
        assert_eq!(
            service_cause(&err),
            "configuration 'A' must be a JSON object"
        );
        assert!(matches!(
            err.root_cause().downcast_ref::<BridgeError>(),
            Some(BridgeError::ServiceFault(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_response_is_service_error() {
        let transport = ScriptedTransport::new(vec![PostOutcome::Success("<html>".to_string())]);
        let err = authorizer(transport, FixedProvider::issuing(basic()))
            .authorize(&Subject::default())
            .await
            .unwrap_err();
        assert_eq!(service_cause(&err), "failed to decode authorization response");
        assert!(err
            .chain()
            .any(|e| matches!(e.downcast_ref::<BridgeError>(), Some(BridgeError::Codec(_)))));
    }

    #[tokio::test]
    async fn test_installed_credential_is_used_by_next_request() {
        let transport = ScriptedTransport::new(vec![challenge(), granted(), granted()]);
        let provider = FixedProvider::issuing(basic());
        let authorizer = authorizer(transport.clone(), provider.clone());

        authorizer.authorize(&Subject::default()).await.unwrap();
        authorizer.authorize(&Subject::default()).await.unwrap();

        assert_eq!(
            transport.calls(),
            vec![ClientCredential::None, basic(), basic()]
        );
        assert_eq!(provider.acquired.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_from_config_rejects_invalid_config() {
        let err = Authorizer::from_config(&Config::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BridgeError>(),
            Some(BridgeError::Config(_))
        ));
    }
}
