//! Small helpers for talking to untyped JS objects.

use js_sys::{Array, Function, Promise, Reflect, Uint8Array, JSON};
use passkey_core::{PasskeyError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

/// Read `target[name]`, treating a throwing getter as a platform error.
pub fn get(target: &JsValue, name: &str) -> Result<JsValue> {
    Reflect::get(target, &JsValue::from_str(name)).map_err(platform_error)
}

pub fn set(target: &JsValue, name: &str, value: &JsValue) -> Result<()> {
    Reflect::set(target, &JsValue::from_str(name), value)
        .map(|_| ())
        .map_err(platform_error)
}

/// Whether `target[name]` is a callable function.
pub fn has_method(target: &JsValue, name: &str) -> bool {
    get(target, name).map(|v| v.is_function()).unwrap_or(false)
}

/// Call `target[name](...args)` with `target` as `this`.
pub fn call_method(target: &JsValue, name: &str, args: &[JsValue]) -> Result<JsValue> {
    let method = get(target, name)?
        .dyn_into::<Function>()
        .map_err(|_| PasskeyError::Unsupported(name.to_string()))?;
    let args: Array = args.iter().collect();
    Reflect::apply(&method, target, &args).map_err(platform_error)
}

/// Await `value` if it is a promise, otherwise pass it through.
pub async fn settle(value: JsValue) -> Result<JsValue> {
    match value.dyn_into::<Promise>() {
        Ok(promise) => JsFuture::from(promise).await.map_err(platform_error),
        Err(value) => Ok(value),
    }
}

/// Map a thrown value or rejection reason (usually a `DOMException`).
pub fn platform_error(reason: JsValue) -> PasskeyError {
    let field = |name: &str| {
        Reflect::get(&reason, &JsValue::from_str(name))
            .ok()
            .and_then(|v| v.as_string())
    };
    match (field("name"), field("message")) {
        (Some(name), message) => PasskeyError::from_dom_exception(name, message.unwrap_or_default()),
        (None, _) => PasskeyError::Rejected {
            name: "Error".into(),
            message: reason.as_string().unwrap_or_else(|| format!("{reason:?}")),
        },
    }
}

pub fn to_js<T: Serialize>(value: &T) -> Result<JsValue> {
    let json = serde_json::to_string(value)?;
    JSON::parse(&json).map_err(|e| PasskeyError::SerializationError(format!("{e:?}")))
}

pub fn from_js<T: DeserializeOwned>(value: &JsValue) -> Result<T> {
    if value.is_undefined() || value.is_null() {
        return Ok(serde_json::from_value(serde_json::Value::Null)?);
    }
    let json: String = JSON::stringify(value)
        .map_err(|e| PasskeyError::SerializationError(format!("{e:?}")))?
        .into();
    Ok(serde_json::from_str(&json)?)
}

/// Copy an `ArrayBuffer` (or view) into Rust.
pub fn bytes(value: &JsValue) -> Vec<u8> {
    Uint8Array::new(value).to_vec()
}

/// Like [`bytes`], but `null`/`undefined` stay absent.
pub fn optional_bytes(value: &JsValue) -> Option<Vec<u8>> {
    if value.is_null() || value.is_undefined() {
        None
    } else {
        Some(bytes(value))
    }
}

pub fn string(value: &JsValue, what: &str) -> Result<String> {
    value
        .as_string()
        .ok_or_else(|| PasskeyError::SerializationError(format!("{what} is not a string")))
}

pub fn js_error(err: &PasskeyError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}
