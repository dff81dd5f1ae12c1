//! Common utility functions shared across CLI commands.

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use passkey_core::{EncodedAssertion, EncodedRegistration};
use serde_json::Value;
use tracing::debug;

/// A captured `store_credential` or `authenticate_credential` payload.
#[derive(Debug)]
pub enum Submission {
    Registration(EncodedRegistration),
    Assertion(EncodedAssertion),
}

/// Read a file, or stdin when the path is `-`.
pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Parse a submission payload, with or without its `{ "credential": ... }` envelope.
pub fn parse_submission(bytes: &[u8]) -> Result<Submission> {
    let value: Value = serde_json::from_slice(bytes).context("Failed to parse submission JSON")?;
    let credential = match value {
        Value::Object(mut map) if map.contains_key("credential") => map
            .remove("credential")
            .unwrap_or(Value::Null),
        other => other,
    };

    let Some(response) = credential.get("response").and_then(Value::as_object) else {
        bail!("Not a credential: missing response object");
    };

    if response.contains_key("attestationObject") {
        debug!(kind = "registration", "Detected submission");
        let registration = serde_json::from_value(credential)
            .context("Failed to parse registration credential")?;
        Ok(Submission::Registration(registration))
    } else if response.contains_key("signature") {
        debug!(kind = "assertion", "Detected submission");
        let assertion =
            serde_json::from_value(credential).context("Failed to parse assertion credential")?;
        Ok(Submission::Assertion(assertion))
    } else {
        bail!("Not a credential: response has neither attestationObject nor signature")
    }
}

/// COSE algorithm identifier as a name.
pub fn algorithm_name(alg: i64) -> &'static str {
    match alg {
        -7 => "ES256",
        -8 => "EdDSA",
        -35 => "ES384",
        -36 => "ES512",
        -257 => "RS256",
        _ => "unknown",
    }
}

/// Flags byte and signature counter from raw authenticator data.
pub fn authenticator_data_summary(data: &[u8]) -> Option<(u8, u32)> {
    let flags = *data.get(32)?;
    let counter: [u8; 4] = data.get(33..37)?.try_into().ok()?;
    Some((flags, u32::from_be_bytes(counter)))
}

/// Human-readable authenticator flags (UP, UV, BE, BS, AT, ED).
pub fn describe_flags(flags: u8) -> String {
    const NAMES: [(u8, &str); 6] = [
        (0x01, "UP"),
        (0x04, "UV"),
        (0x08, "BE"),
        (0x10, "BS"),
        (0x40, "AT"),
        (0x80, "ED"),
    ];
    let set: Vec<&str> = NAMES
        .iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, name)| *name)
        .collect();
    if set.is_empty() {
        "none".to_string()
    } else {
        set.join(" ")
    }
}
