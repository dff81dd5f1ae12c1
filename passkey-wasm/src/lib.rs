//! WebAssembly bindings for the passkey ceremony hooks.
//!
//! Exposes `CreateCredentialHook` and `GetCredentialHook` to JavaScript. A
//! page wires them into its view framework's hook lifecycle:
//!
//! ```js
//! import init, { CreateCredentialHook } from "passkey_wasm";
//! await init();
//!
//! Hooks.CreateCredential = {
//!   mounted() {
//!     this.passkey = new CreateCredentialHook(this);
//!     this.passkey.mounted();
//!   },
//!   destroyed() { this.passkey.destroyed(); },
//! };
//! ```

mod dom;
mod js;
mod logging;
mod peer;
mod platform;

use std::rc::Rc;

use js_sys::Promise;
use passkey_core::{AuthenticationHook, HookConfig, HookContext, RegistrationHook};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

pub use dom::{DocumentEvents, PromiseSpawner};
pub use peer::LiveViewPeer;
pub use platform::BrowserPlatform;

use crate::js::{js_error, to_js};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Install console logging with the given filter directive (e.g. `"passkey_core=debug"`).
///
/// Returns `false` if logging was already installed. Throws on a bad directive.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(filter: &str) -> Result<bool, JsValue> {
    logging::init(filter).map_err(|e| js_error(&e))
}

/// Get the version of the passkey bindings.
#[wasm_bindgen(js_name = getVersion)]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn parse_config(config_json: Option<String>) -> passkey_core::Result<HookConfig> {
    let config = match config_json.as_deref().map(str::trim) {
        None | Some("") => HookConfig::default(),
        Some(json) => HookConfig::from_json(json)?,
    };
    logging::build_filter(&config.log_filter)?;
    Ok(config)
}

/// Assemble the browser collaborators around a framework hook object.
fn browser_context(view_hook: JsValue, config_json: Option<String>) -> Result<HookContext, JsValue> {
    let config = parse_config(config_json).map_err(|e| js_error(&e))?;
    if !logging::init(&config.log_filter).map_err(|e| js_error(&e))? {
        tracing::debug!("Console logging already installed, keeping its filter");
    }

    let peer = LiveViewPeer::new(view_hook).map_err(|e| js_error(&e))?;
    let events = DocumentEvents::new().map_err(|e| js_error(&e))?;
    Ok(HookContext::new(
        Rc::new(peer),
        Rc::new(BrowserPlatform::new()),
        Rc::new(events),
        Rc::new(PromiseSpawner),
    )
    .with_config(config))
}

/// Registration hook: runs a creation ceremony on each `create_credential` event.
#[wasm_bindgen]
pub struct CreateCredentialHook {
    inner: Rc<RegistrationHook>,
}

#[wasm_bindgen]
impl CreateCredentialHook {
    #[wasm_bindgen(constructor)]
    pub fn new(view_hook: JsValue, config_json: Option<String>) -> Result<CreateCredentialHook, JsValue> {
        let ctx = browser_context(view_hook, config_json)?;
        Ok(Self {
            inner: Rc::new(RegistrationHook::new(ctx)),
        })
    }

    /// Bind the trigger listener and report client capabilities.
    pub fn mounted(&self) -> Promise {
        let hook = self.inner.clone();
        future_to_promise(async move {
            hook.mounted().await.map_err(|e| js_error(&e))?;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn destroyed(&self) {
        self.inner.destroyed();
    }

    /// Run one registration ceremony now; resolves to the submitted credential.
    #[wasm_bindgen(js_name = createCredential)]
    pub fn create_credential(&self) -> Promise {
        let hook = self.inner.clone();
        future_to_promise(async move {
            let encoded = hook.create_credential().await.map_err(|e| js_error(&e))?;
            to_js(&encoded).map_err(|e| js_error(&e))
        })
    }
}

/// Authentication hook: conditional (autofill) login, cancellable with
/// `abort_get_credential`.
#[wasm_bindgen]
pub struct GetCredentialHook {
    inner: Rc<AuthenticationHook>,
}

#[wasm_bindgen]
impl GetCredentialHook {
    #[wasm_bindgen(constructor)]
    pub fn new(view_hook: JsValue, config_json: Option<String>) -> Result<GetCredentialHook, JsValue> {
        let ctx = browser_context(view_hook, config_json)?;
        Ok(Self {
            inner: Rc::new(AuthenticationHook::new(ctx)),
        })
    }

    /// Resolves to whether a conditional ceremony was started.
    pub fn mounted(&self) -> Promise {
        let hook = self.inner.clone();
        future_to_promise(async move {
            let started = hook.mounted().await.map_err(|e| js_error(&e))?;
            Ok(JsValue::from_bool(started))
        })
    }

    /// Run one authentication ceremony now, aborting any in flight.
    #[wasm_bindgen(js_name = getCredential)]
    pub fn get_credential(&self) -> Promise {
        let hook = self.inner.clone();
        future_to_promise(async move {
            let encoded = hook.get_credential().await.map_err(|e| js_error(&e))?;
            to_js(&encoded).map_err(|e| js_error(&e))
        })
    }

    /// Abort the in-flight ceremony. Returns `false` if none was running.
    pub fn cancel(&self) -> bool {
        self.inner.cancel()
    }

    pub fn destroyed(&self) {
        self.inner.destroyed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use passkey_core::{FailurePolicy, Mediation};

    #[test]
    fn test_parse_config_defaults_when_absent() {
        assert_eq!(parse_config(None).unwrap(), HookConfig::default());
        assert_eq!(parse_config(Some("  ".into())).unwrap(), HookConfig::default());
    }

    #[test]
    fn test_parse_config_overrides() {
        let config = parse_config(Some(
            r#"{"authentication_failure":"surface","mediation":"optional"}"#.into(),
        ))
        .unwrap();
        assert_eq!(config.authentication_failure, FailurePolicy::Surface);
        assert_eq!(config.mediation, Mediation::Optional);
        assert_eq!(config.registration_failure, FailurePolicy::Surface);
    }

    #[test]
    fn test_parse_config_rejects_bad_log_filter() {
        let err = parse_config(Some(r#"{"log_filter":"passkey_core=verbose"}"#.into())).unwrap_err();
        assert!(matches!(err, passkey_core::PasskeyError::ConfigError(_)));
    }

    #[test]
    fn test_parse_config_rejects_bad_json() {
        assert!(parse_config(Some("{".into())).is_err());
    }

    #[test]
    fn test_version_is_set() {
        assert!(!get_version().is_empty());
    }
}
