//! Credential results and their transport-safe forms.
//!
//! The platform hands back raw credentials with binary fields. Before anything
//! reaches the server peer they are rebuilt with every binary field encoded
//! (see [`crate::encoding`]); scalar fields and extension results are copied
//! verbatim.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use webauthn_rs_proto::{PublicKeyCredential, RegisterPublicKeyCredential};

use crate::encoding::{decode, encode, encode_optional, to_url_safe};
use crate::error::{PasskeyError, Result};

/// Credential produced by the platform creation ceremony.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationCredential {
    pub id: String,
    pub raw_id: Vec<u8>,
    pub credential_type: String,
    pub authenticator_attachment: Option<String>,
    pub response: AttestationResponse,
    pub client_extension_results: Map<String, Value>,
}

/// `AuthenticatorAttestationResponse` fields, read through its accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct AttestationResponse {
    pub attestation_object: Vec<u8>,
    pub authenticator_data: Vec<u8>,
    pub client_data_json: Vec<u8>,
    /// `None` when the algorithm is not one the platform can export
    pub public_key: Option<Vec<u8>>,
    /// COSE algorithm identifier
    pub public_key_algorithm: i64,
    pub transports: Vec<String>,
}

/// Credential produced by the platform retrieval ceremony.
#[derive(Debug, Clone, PartialEq)]
pub struct AssertionCredential {
    pub id: String,
    pub raw_id: Vec<u8>,
    pub credential_type: String,
    pub authenticator_attachment: Option<String>,
    pub response: AssertionResponse,
    pub client_extension_results: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssertionResponse {
    pub authenticator_data: Vec<u8>,
    pub client_data_json: Vec<u8>,
    pub signature: Vec<u8>,
    pub user_handle: Option<Vec<u8>>,
}

/// Payload wrapper for `store_credential` and `authenticate_credential`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialSubmission<T> {
    pub credential: T,
}

impl<T> CredentialSubmission<T> {
    pub fn new(credential: T) -> Self {
        Self { credential }
    }
}

/// Unwrap a submission payload received by the server peer.
pub fn decode_submission<T: DeserializeOwned>(payload: Value) -> Result<T> {
    let submission: CredentialSubmission<T> = serde_json::from_value(payload)?;
    Ok(submission.credential)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedRegistration {
    pub id: String,
    pub raw_id: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>,
    #[serde(default)]
    pub client_extension_results: Map<String, Value>,
    pub response: EncodedAttestationResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedAttestationResponse {
    pub attestation_object: String,
    pub authenticator_data: String,
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub public_key: String,
    pub public_key_algorithm: i64,
    #[serde(default)]
    pub transports: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedAssertion {
    pub id: String,
    pub raw_id: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>,
    #[serde(default)]
    pub client_extension_results: Map<String, Value>,
    pub response: EncodedAssertionResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedAssertionResponse {
    pub authenticator_data: String,
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub signature: String,
    pub user_handle: String,
}

impl From<&RegistrationCredential> for EncodedRegistration {
    fn from(credential: &RegistrationCredential) -> Self {
        let response = &credential.response;
        Self {
            id: credential.id.clone(),
            raw_id: encode(&credential.raw_id),
            credential_type: credential.credential_type.clone(),
            authenticator_attachment: credential.authenticator_attachment.clone(),
            client_extension_results: credential.client_extension_results.clone(),
            response: EncodedAttestationResponse {
                attestation_object: encode(&response.attestation_object),
                authenticator_data: encode(&response.authenticator_data),
                client_data_json: encode(&response.client_data_json),
                public_key: encode_optional(response.public_key.as_deref()),
                public_key_algorithm: response.public_key_algorithm,
                transports: response.transports.clone(),
            },
        }
    }
}

impl From<&AssertionCredential> for EncodedAssertion {
    fn from(credential: &AssertionCredential) -> Self {
        let response = &credential.response;
        Self {
            id: credential.id.clone(),
            raw_id: encode(&credential.raw_id),
            credential_type: credential.credential_type.clone(),
            authenticator_attachment: credential.authenticator_attachment.clone(),
            client_extension_results: credential.client_extension_results.clone(),
            response: EncodedAssertionResponse {
                authenticator_data: encode(&response.authenticator_data),
                client_data_json: encode(&response.client_data_json),
                signature: encode(&response.signature),
                user_handle: encode_optional(response.user_handle.as_deref()),
            },
        }
    }
}

impl EncodedRegistration {
    /// Decoded raw credential id.
    pub fn raw_id_bytes(&self) -> Result<Vec<u8>> {
        decode(&self.raw_id)
    }

    /// Rebuild the credential in the form webauthn-rs verifies on the server.
    pub fn into_register_credential(self) -> Result<RegisterPublicKeyCredential> {
        let value = json!({
            "id": self.id,
            "rawId": to_url_safe(&self.raw_id)?,
            "type": self.credential_type,
            "response": {
                "attestationObject": to_url_safe(&self.response.attestation_object)?,
                "clientDataJSON": to_url_safe(&self.response.client_data_json)?,
                "transports": self.response.transports,
            },
            "extensions": self.client_extension_results,
        });
        serde_json::from_value(value)
            .map_err(|e| PasskeyError::DecodeError(format!("registration credential: {e}")))
    }
}

impl EncodedAssertion {
    /// Decoded raw credential id.
    pub fn raw_id_bytes(&self) -> Result<Vec<u8>> {
        decode(&self.raw_id)
    }

    /// Rebuild the assertion in the form webauthn-rs verifies on the server.
    pub fn into_public_key_credential(self) -> Result<PublicKeyCredential> {
        let user_handle = if self.response.user_handle.is_empty() {
            Value::Null
        } else {
            Value::String(to_url_safe(&self.response.user_handle)?)
        };
        let value = json!({
            "id": self.id,
            "rawId": to_url_safe(&self.raw_id)?,
            "type": self.credential_type,
            "response": {
                "authenticatorData": to_url_safe(&self.response.authenticator_data)?,
                "clientDataJSON": to_url_safe(&self.response.client_data_json)?,
                "signature": to_url_safe(&self.response.signature)?,
                "userHandle": user_handle,
            },
            "extensions": self.client_extension_results,
        });
        serde_json::from_value(value)
            .map_err(|e| PasskeyError::DecodeError(format!("assertion credential: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{sample_assertion, sample_registration};

    #[test]
    fn test_registration_binary_fields_encoded() {
        let credential = sample_registration();
        let encoded = EncodedRegistration::from(&credential);

        assert_eq!(encoded.id, credential.id);
        assert_eq!(encoded.raw_id, encode(&credential.raw_id));
        assert_eq!(
            decode(&encoded.response.attestation_object).unwrap(),
            credential.response.attestation_object
        );
        assert_eq!(
            decode(&encoded.response.public_key).unwrap(),
            credential.response.public_key.clone().unwrap()
        );
        assert_eq!(encoded.response.public_key_algorithm, -7);
        assert_eq!(encoded.response.transports, vec!["internal", "hybrid"]);
    }

    #[test]
    fn test_registration_wire_shape() {
        let encoded = EncodedRegistration::from(&sample_registration());
        let value = serde_json::to_value(CredentialSubmission::new(&encoded)).unwrap();
        let credential = &value["credential"];

        assert_eq!(credential["type"], "public-key");
        assert!(credential["rawId"].is_string());
        assert!(credential["response"]["clientDataJSON"].is_string());
        assert_eq!(credential["response"]["publicKeyAlgorithm"], -7);
        assert_eq!(credential["clientExtensionResults"]["credProps"]["rk"], true);
    }

    #[test]
    fn test_missing_public_key_and_user_handle_encode_empty() {
        let mut registration = sample_registration();
        registration.response.public_key = None;
        assert_eq!(EncodedRegistration::from(&registration).response.public_key, "");

        let mut assertion = sample_assertion();
        assertion.response.user_handle = None;
        assert_eq!(EncodedAssertion::from(&assertion).response.user_handle, "");
    }

    #[test]
    fn test_server_side_decode_of_submission() {
        let encoded = EncodedAssertion::from(&sample_assertion());
        let payload = serde_json::to_value(CredentialSubmission::new(&encoded)).unwrap();

        let decoded: EncodedAssertion = decode_submission(payload).unwrap();
        assert_eq!(decoded, encoded);
        assert_eq!(decoded.raw_id_bytes().unwrap(), sample_assertion().raw_id);
    }

    #[test]
    fn test_into_register_credential() {
        let encoded = EncodedRegistration::from(&sample_registration());
        let credential = encoded.into_register_credential().unwrap();
        assert_eq!(credential.id, "Y3JlZC0x");
        assert_eq!(credential.type_, "public-key");
    }

    #[test]
    fn test_into_public_key_credential() {
        let encoded = EncodedAssertion::from(&sample_assertion());
        let credential = encoded.into_public_key_credential().unwrap();
        assert_eq!(credential.id, "Y3JlZC0x");
        assert_eq!(credential.type_, "public-key");
    }
}
