//! The subject of an authorization request
//!
//! A [`Subject`] is the end user being authorized: the credentials they
//! presented plus metadata from the originating request. It is built once
//! per request, eagerly copying everything it needs from the host, and is
//! immutable afterwards.
//!
//! Hosts describe their request objects through the [`SubjectSource`]
//! capability trait; the bridge never reads host request types directly.

use indexmap::IndexMap;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

/// Ordered mapping of header name to the ordered values received for it.
pub type RequestHeaders = IndexMap<String, Vec<String>>;

/// Read-only view over a host's user credentials and originating request.
///
/// # Examples
///
/// ```
/// use authz_bridge::subject::{RequestHeaders, Subject, SubjectSource};
///
/// struct Login;
///
/// impl SubjectSource for Login {
///     fn username(&self) -> Option<String> { Some("alice".to_string()) }
///     fn password(&self) -> Option<String> { None }
///     fn remote_address(&self) -> Option<String> { Some("10.0.0.7".to_string()) }
///     fn remote_hostname(&self) -> Option<String> { None }
///     fn headers(&self) -> Option<RequestHeaders> { None }
/// }
///
/// let subject = Subject::from_source(&Login);
/// assert_eq!(subject.username.as_deref(), Some("alice"));
/// assert!(subject.headers.is_none());
/// ```
pub trait SubjectSource {
    /// Username presented by the user, if any.
    fn username(&self) -> Option<String>;

    /// Password presented by the user, if any.
    fn password(&self) -> Option<String>;

    /// Network address the request originated from.
    fn remote_address(&self) -> Option<String>;

    /// Hostname the request originated from.
    fn remote_hostname(&self) -> Option<String>;

    /// Request headers, or `None` when no transport request is associated
    /// with the login attempt.
    fn headers(&self) -> Option<RequestHeaders>;
}

/// The entity being authorized.
///
/// Serializes to the wire shape expected by the decision service: absent
/// attributes are written as explicit `null`, and `headers` is written as
/// `null` when no request is associated with the subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// Username presented by the user.
    pub username: Option<String>,

    /// Password presented by the user.
    pub password: Option<String>,

    /// Network address the request originated from.
    pub remote_address: Option<String>,

    /// Hostname the request originated from.
    pub remote_hostname: Option<String>,

    /// Headers of the originating request.
    #[serde(default)]
    pub headers: Option<RequestHeaders>,
}

impl Subject {
    /// Creates a subject with only credentials set.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    /// Copies every attribute out of a host [`SubjectSource`].
    pub fn from_source(source: &dyn SubjectSource) -> Self {
        Self {
            username: source.username(),
            password: source.password(),
            remote_address: source.remote_address(),
            remote_hostname: source.remote_hostname(),
            headers: source.headers(),
        }
    }

    /// Sets the originating network address.
    pub fn with_remote_address(mut self, address: impl Into<String>) -> Self {
        self.remote_address = Some(address.into());
        self
    }

    /// Sets the originating hostname.
    pub fn with_remote_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.remote_hostname = Some(hostname.into());
        self
    }

    /// Attaches the headers of the originating request.
    pub fn with_headers(mut self, headers: RequestHeaders) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Attaches headers copied from an HTTP header map.
    pub fn with_header_map(self, headers: &HeaderMap) -> Self {
        self.with_headers(headers_from_map(headers))
    }
}

/// Copies an HTTP header map into an ordered, multi-valued mapping.
///
/// Header names keep the order in which they first appear; values that are
/// not valid UTF-8 are converted lossily.
pub fn headers_from_map(headers: &HeaderMap) -> RequestHeaders {
    let mut map = RequestHeaders::new();
    for (name, value) in headers {
        map.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    map
}
