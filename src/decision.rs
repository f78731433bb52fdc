//! Interpretation of authorization decisions
//!
//! The decision service answers with a JSON object of the form:
//!
//! ```json
//! {
//!   "authorized": true,
//!   "configurations": {
//!     "build-host": {
//!       "protocol": "ssh",
//!       "parameters": { "hostname": "10.0.0.5", "port": 22 }
//!     }
//!   }
//! }
//! ```
//!
//! [`interpret`] reads that tree defensively: a missing, non-boolean, or
//! false `authorized` flag is a denial, while an authorized decision without
//! `configurations` is a fault in the remote service.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{BridgeError, Result};

/// Key of the grant flag in a decision document.
pub const AUTHORIZED_KEY: &str = "authorized";
/// Key of the named configuration mapping in a decision document.
pub const CONFIGURATIONS_KEY: &str = "configurations";
/// Key of the protocol name in a configuration record.
pub const PROTOCOL_KEY: &str = "protocol";
/// Key of the parameter mapping in a configuration record.
pub const PARAMETERS_KEY: &str = "parameters";

/// A named target configuration granted to the subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TargetConfiguration {
    /// Protocol used to reach the target, if the service named one.
    pub protocol: Option<String>,

    /// Connection parameters, every value coerced to its string form.
    pub parameters: IndexMap<String, String>,
}

impl TargetConfiguration {
    /// Looks up a parameter value by name.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }
}

/// The result of an authorization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The subject was not granted access. This is a business outcome,
    /// not an error.
    NotAuthorized,

    /// The subject was granted access to the named configurations.
    Authorized {
        /// Granted configurations keyed by name, in response order.
        configurations: IndexMap<String, TargetConfiguration>,
    },
}

impl Outcome {
    /// Returns `true` when access was granted.
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized { .. })
    }

    /// Returns the granted configurations, or `None` for a denial.
    pub fn configurations(&self) -> Option<&IndexMap<String, TargetConfiguration>> {
        match self {
            Self::Authorized { configurations } => Some(configurations),
            Self::NotAuthorized => None,
        }
    }
}

/// Reads an authorization decision tree.
///
/// # Errors
///
/// Returns [`BridgeError::Service`] with the cause "configurations
/// required" when the decision grants access but carries no configuration
/// mapping, or when a configuration record is not an object.
///
/// # Examples
///
/// ```
/// use authz_bridge::decision::interpret;
///
/// let decision = serde_json::json!({"authorized": false});
/// assert!(!interpret(&decision).unwrap().is_authorized());
/// ```
pub fn interpret(decision: &Value) -> Result<Outcome> {
    if !authorized_flag(decision) {
        return Ok(Outcome::NotAuthorized);
    }

    let configs = decision
        .get(CONFIGURATIONS_KEY)
        .filter(|v| !v.is_null())
        .ok_or_else(|| rejected("configurations required"))?;
    let configs = configs
        .as_object()
        .ok_or_else(|| rejected("configurations must be a JSON object"))?;

    let mut configurations = IndexMap::with_capacity(configs.len());
    for (name, record) in configs {
        configurations.insert(name.clone(), configuration(name, record)?);
    }

    Ok(Outcome::Authorized { configurations })
}

/// A malformed grant, reported as the service-layer error with `cause`.
fn rejected(cause: impl Into<String>) -> anyhow::Error {
    let cause = cause.into();
    anyhow::Error::new(BridgeError::ServiceFault(cause.clone()))
        .context(BridgeError::Service(cause))
}

fn authorized_flag(decision: &Value) -> bool {
    decision
        .get(AUTHORIZED_KEY)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn configuration(name: &str, record: &Value) -> Result<TargetConfiguration> {
    let record = record
        .as_object()
        .ok_or_else(|| rejected(format!("configuration '{name}' must be a JSON object")))?;

    let protocol = record
        .get(PROTOCOL_KEY)
        .and_then(Value::as_str)
        .map(str::to_string);

    let parameters = match record.get(PARAMETERS_KEY) {
        Some(Value::Object(params)) => parameters(name, params),
        Some(Value::Null) | None => IndexMap::new(),
        Some(_) => {
            return Err(rejected(format!(
                "parameters of configuration '{name}' must be a JSON object"
            )))
        }
    };

    Ok(TargetConfiguration {
        protocol,
        parameters,
    })
}

fn parameters(config_name: &str, params: &Map<String, Value>) -> IndexMap<String, String> {
    let mut out = IndexMap::with_capacity(params.len());
    for (key, value) in params {
        match value {
            Value::Null => {
                tracing::warn!(
                    configuration = %config_name,
                    parameter = %key,
                    "Skipping null parameter value in authorization decision"
                );
            }
            Value::String(s) => {
                out.insert(key.clone(), s.clone());
            }
            other => {
                out.insert(key.clone(), other.to_string());
            }
        }
    }
    out
}
