//! Authorization transport
//!
//! A transport posts an encoded subject to the decision service using the
//! current client credential and classifies what came back. Classification
//! is a value, not an error: the caller matches on [`PostOutcome`] and
//! decides whether to retry.
//!
//! # Module Layout
//!
//! - [`auth_header`] -- `Authorization` header values per credential variant
//! - [`rest`]        -- the `reqwest` implementation used in production

pub mod auth_header;
pub mod rest;

use std::fmt;

use async_trait::async_trait;
use url::Url;

use crate::credential::{ClientChallenge, ClientCredential};
use crate::error::{BridgeError, Result};

pub use rest::RestTransport;

/// Classified result of one POST to the authorization endpoint.
#[derive(Debug)]
pub enum PostOutcome {
    /// 2xx response; carries the raw response body.
    Success(String),

    /// The service requires this client to authenticate.
    NeedsClientAuth(ClientChallenge),

    /// The service rejected the request itself.
    ClientFault {
        /// HTTP status code
        status: u16,
        /// Response body, kept for diagnostics
        body: String,
    },

    /// Server error, timeout, connection failure, or an unanswerable
    /// response.
    ServiceFault(anyhow::Error),
}

impl PostOutcome {
    /// Short label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::NeedsClientAuth(_) => "needs_client_auth",
            Self::ClientFault { .. } => "client_fault",
            Self::ServiceFault(_) => "service_fault",
        }
    }
}

/// Sends authorization requests to the decision service.
///
/// Implementations must be safe to call from many tasks at once.
#[async_trait]
pub trait AuthTransport: Send + Sync + fmt::Debug {
    /// POSTs `body` to `{service_url}{authorization_path}`, authenticating
    /// with `credential`.
    async fn post(
        &self,
        service_url: &Url,
        authorization_path: &str,
        credential: &ClientCredential,
        body: &str,
    ) -> PostOutcome;
}

/// Joins the service base URL and the authorization path with exactly one
/// slash between them.
///
/// # Examples
///
/// ```
/// use authz_bridge::transport::endpoint_url;
/// use url::Url;
///
/// let base = Url::parse("https://authz.example.com/api/").unwrap();
/// let url = endpoint_url(&base, "/authorization").unwrap();
/// assert_eq!(url.as_str(), "https://authz.example.com/api/authorization");
/// ```
pub fn endpoint_url(service_url: &Url, authorization_path: &str) -> Result<Url> {
    let base = service_url.as_str().trim_end_matches('/');
    let path = authorization_path.trim_start_matches('/');
    Url::parse(&format!("{base}/{path}")).map_err(|e| {
        BridgeError::Config(format!(
            "invalid authorization endpoint '{base}/{path}': {e}"
        ))
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_joins_with_single_slash() {
        let cases = [
            ("https://h.example", "/authorization"),
            ("https://h.example/", "/authorization"),
            ("https://h.example/", "authorization"),
        ];
        for (base, path) in cases {
            let url = endpoint_url(&Url::parse(base).unwrap(), path).unwrap();
            assert_eq!(url.as_str(), "https://h.example/authorization");
        }
    }

    #[test]
    fn test_endpoint_url_keeps_base_path() {
        let base = Url::parse("http://127.0.0.1:8080/bridge").unwrap();
        let url = endpoint_url(&base, "/v1/authorize").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/bridge/v1/authorize");
    }

    #[test]
    fn test_outcome_kind_labels() {
        assert_eq!(PostOutcome::Success(String::new()).kind(), "success");
        assert_eq!(
            PostOutcome::ClientFault {
                status: 400,
                body: String::new()
            }
            .kind(),
            "client_fault"
        );
        assert_eq!(
            PostOutcome::ServiceFault(anyhow::anyhow!("boom")).kind(),
            "service_fault"
        );
    }
}
