//! JSON codec for authorization requests and responses
//!
//! Requests are the JSON encoding of a [`Subject`]; responses are decoded
//! into a generic [`serde_json::Value`] tree that the
//! [`decision`](crate::decision) module validates on read. Key order of
//! objects is preserved.
//!
//! The codec holds no state and can be shared freely between tasks.

use serde_json::Value;

use crate::error::{BridgeError, Result};
use crate::subject::Subject;

/// Stateless JSON encoder/decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Encodes a subject as a UTF-8 JSON object.
    ///
    /// # Examples
    ///
    /// ```
    /// use authz_bridge::codec::JsonCodec;
    /// use authz_bridge::subject::Subject;
    ///
    /// let json = JsonCodec.encode(&Subject::new("alice", "secret")).unwrap();
    /// assert!(json.contains(r#""remoteAddress":null"#));
    /// ```
    pub fn encode(&self, subject: &Subject) -> Result<String> {
        serde_json::to_string(subject).map_err(|e| {
            BridgeError::Codec(format!("failed to encode authorization subject: {e}")).into()
        })
    }

    /// Decodes a response document into a generic value tree.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Codec`] if the text is not valid JSON or if
    /// the top-level value is not an object.
    pub fn decode(&self, json: &str) -> Result<Value> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| BridgeError::Codec(format!("malformed JSON document: {e}")))?;
        if !value.is_object() {
            return Err(BridgeError::Codec(format!(
                "expected a JSON object at top level, found {}",
                kind_of(&value)
            ))
            .into());
        }
        Ok(value)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
