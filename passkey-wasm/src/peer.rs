//! Server peer over a view hook's `pushEvent`.

use async_trait::async_trait;
use js_sys::Function;
use passkey_core::{PasskeyError, Result, ServerPeer};
use serde_json::Value;
use wasm_bindgen::{JsCast, JsValue};

use crate::js::{from_js, get, settle, to_js};

/// [`ServerPeer`] that pushes through the framework hook object.
///
/// `pushEvent(event, payload)` returns a promise resolving to the server's
/// reply.
pub struct LiveViewPeer {
    hook: JsValue,
    push_event: Function,
}

impl LiveViewPeer {
    pub fn new(hook: JsValue) -> Result<Self> {
        let push_event = get(&hook, "pushEvent")?
            .dyn_into::<Function>()
            .map_err(|_| PasskeyError::Peer("hook object has no pushEvent method".into()))?;
        Ok(Self { hook, push_event })
    }

    async fn push(&self, event: &str, payload: &Value) -> Result<JsValue> {
        let returned = self
            .push_event
            .call2(&self.hook, &JsValue::from_str(event), &to_js(payload)?)
            .map_err(|e| PasskeyError::Peer(format!("{event}: {e:?}")))?;
        settle(returned)
            .await
            .map_err(|e| PasskeyError::Peer(format!("{event}: {e}")))
    }
}

#[async_trait(?Send)]
impl ServerPeer for LiveViewPeer {
    async fn push_event_reply(&self, event: &str, payload: Value) -> Result<Value> {
        let reply = self.push(event, &payload).await?;
        from_js(&reply)
    }

    async fn push_event(&self, event: &str, payload: Value) -> Result<()> {
        self.push(event, &payload).await.map(|_| ())
    }
}
