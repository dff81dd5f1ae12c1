//! Ceremony parameters issued by the server peer.
//!
//! The reply to a parameter request is either the options object itself or the
//! `{ "publicKey": ... }` wrapper produced by webauthn-rs. Options stay in their
//! JSON form: the platform expands them with its own `parse*OptionsFromJSON`
//! rule, so members this crate does not model (extensions such as `prf` or
//! `largeBlob`, hints) reach the ceremony untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PasskeyError, Result};

/// `PublicKeyCredentialCreationOptionsJSON` as sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreationOptions(Map<String, Value>);

/// `PublicKeyCredentialRequestOptionsJSON` as sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestOptions(Map<String, Value>);

impl CreationOptions {
    pub fn challenge(&self) -> &str {
        challenge(&self.0)
    }

    /// `rp.id`, when the server names one (the platform defaults it otherwise).
    pub fn rp_id(&self) -> Option<&str> {
        self.0.get("rp")?.get("id")?.as_str()
    }

    pub fn as_json(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.0)
    }
}

impl RequestOptions {
    pub fn challenge(&self) -> &str {
        challenge(&self.0)
    }

    pub fn rp_id(&self) -> Option<&str> {
        self.0.get("rpId")?.as_str()
    }

    pub fn as_json(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.0)
    }
}

/// Parse a registration-parameters reply into creation options.
pub fn parse_creation_options(reply: Value) -> Result<CreationOptions> {
    parse_options(reply, "creation").map(CreationOptions)
}

/// Parse an authentication-parameters reply into request options.
pub fn parse_request_options(reply: Value) -> Result<RequestOptions> {
    parse_options(reply, "request").map(RequestOptions)
}

/// Unwrap the envelope and check the one member both forms require.
fn parse_options(reply: Value, kind: &str) -> Result<Map<String, Value>> {
    let Value::Object(mut object) = reply else {
        return Err(PasskeyError::InvalidOptions(format!(
            "expected {kind} options object, got {}",
            json_kind(&reply)
        )));
    };

    let options = match object.remove("publicKey") {
        Some(Value::Object(inner)) => inner,
        Some(other) => {
            return Err(PasskeyError::InvalidOptions(format!(
                "expected {kind} options object under publicKey, got {}",
                json_kind(&other)
            )))
        }
        None => object,
    };

    match options.get("challenge") {
        Some(Value::String(_)) => Ok(options),
        Some(other) => Err(PasskeyError::InvalidOptions(format!(
            "{kind} options: challenge must be a string, got {}",
            json_kind(other)
        ))),
        None => Err(PasskeyError::InvalidOptions(format!(
            "{kind} options: missing challenge"
        ))),
    }
}

fn challenge(options: &Map<String, Value>) -> &str {
    options
        .get("challenge")
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
