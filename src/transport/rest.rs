//! REST transport built on `reqwest`
//!
//! Status classification:
//!
//! | Response                                   | Outcome                        |
//! |--------------------------------------------|--------------------------------|
//! | 2xx                                        | [`PostOutcome::Success`]       |
//! | 401 with a parseable `WWW-Authenticate`    | [`PostOutcome::NeedsClientAuth`] |
//! | 401 without one, 407, 3xx, 5xx, I/O error  | [`PostOutcome::ServiceFault`]  |
//! | any other 4xx                              | [`PostOutcome::ClientFault`]   |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use super::auth_header::authorization_header;
use super::{endpoint_url, AuthTransport, PostOutcome};
use crate::credential::challenge::select_challenge;
use crate::credential::ClientCredential;
use crate::error::{BridgeError, Result};

const JSON: &str = "application/json";

/// Builds the HTTP client shared by the transport and the token client.
///
/// `timeout` bounds each request end to end. Redirects are not followed.
///
/// # Errors
///
/// Returns [`BridgeError::Config`] if the TLS backend cannot be initialised.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(concat!("authz-bridge/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| BridgeError::Config(format!("failed to build HTTP client: {}", e)).into())
}

/// Posts authorization requests over HTTP(S).
#[derive(Debug, Clone)]
pub struct RestTransport {
    http: Arc<reqwest::Client>,
}

impl RestTransport {
    /// Creates a transport with its own client and per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self::with_client(Arc::new(build_http_client(timeout)?)))
    }

    /// Creates a transport over an existing client.
    pub fn with_client(http: Arc<reqwest::Client>) -> Self {
        Self { http }
    }

    async fn classify(response: reqwest::Response) -> PostOutcome {
        let status = response.status();

        if status.is_success() {
            return match response.text().await {
                Ok(body) => PostOutcome::Success(body),
                Err(e) => service_fault(format!("failed to read response body: {}", e)),
            };
        }

        if status == StatusCode::UNAUTHORIZED {
            let values: Vec<&str> = response
                .headers()
                .get_all(WWW_AUTHENTICATE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect();
            return match select_challenge(values) {
                Some(challenge) => PostOutcome::NeedsClientAuth(challenge),
                None => service_fault(
                    "HTTP 401 without a parseable WWW-Authenticate challenge".to_string(),
                ),
            };
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(status = %status, error = %e, "Failed to read error response body");
                format!("<unreadable response body: {}>", e)
            }
        };

        if status == StatusCode::PROXY_AUTHENTICATION_REQUIRED {
            return service_fault(format!("HTTP {}: proxy authentication required", status));
        }

        if status.is_client_error() {
            return PostOutcome::ClientFault {
                status: status.as_u16(),
                body,
            };
        }

        service_fault(format!("HTTP {}: {}", status, body))
    }
}

#[async_trait]
impl AuthTransport for RestTransport {
    async fn post(
        &self,
        service_url: &Url,
        authorization_path: &str,
        credential: &ClientCredential,
        body: &str,
    ) -> PostOutcome {
        let url = match endpoint_url(service_url, authorization_path) {
            Ok(url) => url,
            Err(e) => return PostOutcome::ServiceFault(e),
        };

        let mut request = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, JSON)
            .header(ACCEPT, JSON)
            .body(body.to_string());

        if let Some(value) = authorization_header(credential, "POST", &request_uri(&url)) {
            request = request.header(AUTHORIZATION, value);
        }

        debug!(
            url = %url,
            scheme = credential.scheme_name(),
            "Posting authorization request"
        );

        match request.send().await {
            Ok(response) => Self::classify(response).await,
            Err(e) if e.is_timeout() => {
                service_fault(format!("request to {} timed out: {}", url, e))
            }
            Err(e) => service_fault(format!("request to {} failed: {}", url, e)),
        }
    }
}

/// Request target as it appears in the Digest `uri` field.
fn request_uri(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

fn service_fault(message: String) -> PostOutcome {
    PostOutcome::ServiceFault(BridgeError::ServiceFault(message).into())
}
