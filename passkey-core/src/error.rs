use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PasskeyError {
    #[error("Server peer error: {0}")]
    Peer(String),

    #[error("Invalid ceremony options: {0}")]
    InvalidOptions(String),

    #[error("Credential ceremony rejected ({name}): {message}")]
    Rejected { name: String, message: String },

    #[error("Credential ceremony aborted")]
    Aborted,

    #[error("Platform does not support {0}")]
    Unsupported(String),

    #[error("A registration ceremony is already in flight")]
    CeremonyInFlight,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),
}

impl PasskeyError {
    /// Map a platform rejection (a `DOMException` name and message) to an error.
    pub fn from_dom_exception(name: impl Into<String>, message: impl Into<String>) -> Self {
        let name = name.into();
        if name == "AbortError" {
            return Self::Aborted;
        }
        Self::Rejected {
            name,
            message: message.into(),
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

impl From<serde_json::Error> for PasskeyError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<base64::DecodeError> for PasskeyError {
    fn from(err: base64::DecodeError) -> Self {
        Self::DecodeError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PasskeyError>;
