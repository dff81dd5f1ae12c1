//! Hook configuration
//!
//! Controls how each ceremony type treats failures and which mediation mode
//! the authentication ceremony requests.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{PasskeyError, Result};

/// What a listener-triggered ceremony does with a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Hand the error to the host's unhandled-failure path
    Surface,
    /// Log it and carry on
    Absorb,
}

impl FailurePolicy {
    /// Settle a failed ceremony according to this policy.
    pub fn settle(self, ceremony: &'static str, err: PasskeyError) -> Result<()> {
        match self {
            Self::Surface => {
                error!(ceremony, error = %err, "Credential ceremony failed");
                Err(err)
            }
            Self::Absorb => {
                debug!(ceremony, error = %err, "Credential ceremony failed, absorbed");
                Ok(())
            }
        }
    }
}

impl std::str::FromStr for FailurePolicy {
    type Err = PasskeyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "surface" => Ok(Self::Surface),
            "absorb" => Ok(Self::Absorb),
            other => Err(PasskeyError::ConfigError(format!(
                "unknown failure policy: {other}"
            ))),
        }
    }
}

/// Credential mediation requirement passed to the retrieval ceremony.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mediation {
    Silent,
    Optional,
    Conditional,
    Required,
}

impl Mediation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Silent => "silent",
            Self::Optional => "optional",
            Self::Conditional => "conditional",
            Self::Required => "required",
        }
    }
}

impl std::str::FromStr for Mediation {
    type Err = PasskeyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "silent" => Ok(Self::Silent),
            "optional" => Ok(Self::Optional),
            "conditional" => Ok(Self::Conditional),
            "required" => Ok(Self::Required),
            other => Err(PasskeyError::ConfigError(format!(
                "unknown mediation: {other}"
            ))),
        }
    }
}

/// Configuration shared by both hooks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Failure policy for registration (default: surface)
    pub registration_failure: FailurePolicy,
    /// Failure policy for authentication (default: absorb)
    pub authentication_failure: FailurePolicy,
    /// Mediation for the authentication ceremony (default: conditional)
    pub mediation: Mediation,
    /// Log filter directive for the binding's subscriber (default: "info")
    pub log_filter: String,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            registration_failure: FailurePolicy::Surface,
            authentication_failure: FailurePolicy::Absorb,
            mediation: Mediation::Conditional,
            log_filter: "info".to_string(),
        }
    }
}

impl HookConfig {
    /// Parse configuration from a JSON object. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `PASSKEY_REGISTRATION_FAILURE` - `surface` or `absorb`
    /// - `PASSKEY_AUTHENTICATION_FAILURE` - `surface` or `absorb`
    /// - `PASSKEY_MEDIATION` - `silent`, `optional`, `conditional` or `required`
    /// - `PASSKEY_LOG` - log filter directive
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let registration_failure = match std::env::var("PASSKEY_REGISTRATION_FAILURE") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.registration_failure,
        };
        let authentication_failure = match std::env::var("PASSKEY_AUTHENTICATION_FAILURE") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.authentication_failure,
        };
        let mediation = match std::env::var("PASSKEY_MEDIATION") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.mediation,
        };
        let log_filter = std::env::var("PASSKEY_LOG").unwrap_or(defaults.log_filter);

        Ok(Self {
            registration_failure,
            authentication_failure,
            mediation,
            log_filter,
        })
    }
}
