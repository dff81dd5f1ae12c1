//! Browser credential platform: `navigator.credentials` and `PublicKeyCredential`.

use async_trait::async_trait;
use js_sys::Object;
use passkey_core::{
    AssertionCredential, AssertionResponse, AttestationResponse, ClientCapabilities,
    CreationOptions, CredentialPlatform, CredentialRequest, PasskeyError, RegistrationCredential,
    Result,
};
use serde_json::{Map, Value};
use tracing::debug;
use wasm_bindgen::JsValue;

use crate::js::{
    bytes, call_method, from_js, get, has_method, optional_bytes, set, settle, string, to_js,
};

/// [`CredentialPlatform`] backed by the WebAuthn browser API.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserPlatform;

impl BrowserPlatform {
    pub fn new() -> Self {
        Self
    }

    /// The global `PublicKeyCredential` interface, if the browser has one.
    fn public_key_credential() -> Option<JsValue> {
        get(&js_sys::global(), "PublicKeyCredential")
            .ok()
            .filter(|v| !v.is_undefined() && !v.is_null())
    }

    fn require_public_key_credential() -> Result<JsValue> {
        Self::public_key_credential()
            .ok_or_else(|| PasskeyError::Unsupported("PublicKeyCredential".into()))
    }

    fn credentials_container() -> Result<JsValue> {
        let navigator = get(&js_sys::global(), "navigator")?;
        let credentials = get(&navigator, "credentials")?;
        if credentials.is_undefined() {
            return Err(PasskeyError::Unsupported("navigator.credentials".into()));
        }
        Ok(credentials)
    }

    /// Expand server JSON with the browser's own `parse*OptionsFromJSON` rule.
    fn parse_with(method: &str, options: &impl serde::Serialize) -> Result<JsValue> {
        let interface = Self::require_public_key_credential()?;
        let mut json = serde_json::to_value(options)?;
        strip_nulls(&mut json);
        call_method(&interface, method, &[to_js(&json)?])
    }
}

#[async_trait(?Send)]
impl CredentialPlatform for BrowserPlatform {
    fn supports_client_capabilities(&self) -> bool {
        Self::public_key_credential()
            .map(|interface| has_method(&interface, "getClientCapabilities"))
            .unwrap_or(false)
    }

    async fn client_capabilities(&self) -> Result<ClientCapabilities> {
        let interface = Self::require_public_key_credential()?;
        let capabilities = settle(call_method(&interface, "getClientCapabilities", &[])?).await?;
        from_js(&capabilities)
    }

    async fn create_credential(&self, options: CreationOptions) -> Result<RegistrationCredential> {
        let public_key = Self::parse_with("parseCreationOptionsFromJSON", &options)?;
        let request: JsValue = Object::new().into();
        set(&request, "publicKey", &public_key)?;

        let credentials = Self::credentials_container()?;
        let credential = settle(call_method(&credentials, "create", &[request])?).await?;
        if credential.is_null() {
            return Err(PasskeyError::from_dom_exception(
                "NotAllowedError",
                "no credential returned",
            ));
        }
        read_registration(&credential)
    }

    async fn get_credential(&self, request: CredentialRequest) -> Result<AssertionCredential> {
        let public_key = Self::parse_with("parseRequestOptionsFromJSON", &request.public_key)?;
        let options: JsValue = Object::new().into();
        set(&options, "publicKey", &public_key)?;
        set(
            &options,
            "mediation",
            &JsValue::from_str(request.mediation.as_str()),
        )?;

        if let Some(signal) = request.signal {
            let controller = web_sys::AbortController::new().map_err(crate::js::platform_error)?;
            let js_signal: JsValue = controller.signal().into();
            set(&options, "signal", &js_signal)?;

            if signal.is_aborted() {
                controller.abort();
            } else {
                // Forward our abort to the browser; exits when the ceremony's
                // controller is released without aborting.
                wasm_bindgen_futures::spawn_local(async move {
                    if signal.aborted().await {
                        debug!("Forwarding abort to navigator.credentials.get");
                        controller.abort();
                    }
                });
            }
        }

        let credentials = Self::credentials_container()?;
        let credential = settle(call_method(&credentials, "get", &[options])?).await?;
        if credential.is_null() {
            return Err(PasskeyError::from_dom_exception(
                "NotAllowedError",
                "no credential returned",
            ));
        }
        read_assertion(&credential)
    }
}

/// Drop `null` members. WebIDL dictionaries treat a missing member as its
/// default but reject `null` for sequences and enums.
fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

fn extension_results(credential: &JsValue) -> Result<Map<String, Value>> {
    let results = call_method(credential, "getClientExtensionResults", &[])?;
    match from_js::<Value>(&results)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

fn attachment(credential: &JsValue) -> Result<Option<String>> {
    Ok(get(credential, "authenticatorAttachment")?.as_string())
}

fn read_registration(credential: &JsValue) -> Result<RegistrationCredential> {
    let response = get(credential, "response")?;

    let public_key = optional_bytes(&call_method(&response, "getPublicKey", &[])?);
    let public_key_algorithm = call_method(&response, "getPublicKeyAlgorithm", &[])?
        .as_f64()
        .ok_or_else(|| PasskeyError::SerializationError("publicKeyAlgorithm".into()))?
        as i64;
    let transports: Vec<String> = from_js(&call_method(&response, "getTransports", &[])?)?;

    Ok(RegistrationCredential {
        id: string(&get(credential, "id")?, "id")?,
        raw_id: bytes(&get(credential, "rawId")?),
        credential_type: string(&get(credential, "type")?, "type")?,
        authenticator_attachment: attachment(credential)?,
        response: AttestationResponse {
            attestation_object: bytes(&get(&response, "attestationObject")?),
            authenticator_data: bytes(&call_method(&response, "getAuthenticatorData", &[])?),
            client_data_json: bytes(&get(&response, "clientDataJSON")?),
            public_key,
            public_key_algorithm,
            transports,
        },
        client_extension_results: extension_results(credential)?,
    })
}

fn read_assertion(credential: &JsValue) -> Result<AssertionCredential> {
    let response = get(credential, "response")?;

    Ok(AssertionCredential {
        id: string(&get(credential, "id")?, "id")?,
        raw_id: bytes(&get(credential, "rawId")?),
        credential_type: string(&get(credential, "type")?, "type")?,
        authenticator_attachment: attachment(credential)?,
        response: AssertionResponse {
            authenticator_data: bytes(&get(&response, "authenticatorData")?),
            client_data_json: bytes(&get(&response, "clientDataJSON")?),
            signature: bytes(&get(&response, "signature")?),
            user_handle: optional_bytes(&get(&response, "userHandle")?),
        },
        client_extension_results: extension_results(credential)?,
    })
}
