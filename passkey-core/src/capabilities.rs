//! Platform-reported WebAuthn client capabilities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Capability flags as reported by `PublicKeyCredential.getClientCapabilities()`.
///
/// Serialized verbatim when pushed to the server peer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientCapabilities(BTreeMap<String, bool>);

impl ClientCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, supported: bool) -> Self {
        self.0.insert(name.into(), supported);
        self
    }

    /// Whether `name` is reported and true.
    pub fn supports(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }

    /// Conditional mediation for credential retrieval (autofill).
    pub fn conditional_get(&self) -> bool {
        self.supports("conditionalGet")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
