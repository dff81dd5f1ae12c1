//! Document event target and promise-backed spawner.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use passkey_core::{EventTarget, Listener, ListenerId, LocalTask, PasskeyError, Result, Spawn};
use tracing::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

use crate::js::{js_error, platform_error};

type DomCallback = Closure<dyn FnMut(web_sys::Event)>;

/// [`EventTarget`] over the page's `document`.
///
/// The JS closures are owned here so they live exactly as long as the
/// binding, and are dropped when the listener is removed.
pub struct DocumentEvents {
    document: web_sys::Document,
    next_id: Cell<u64>,
    bound: RefCell<HashMap<ListenerId, (String, DomCallback)>>,
}

impl DocumentEvents {
    pub fn new() -> Result<Self> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| PasskeyError::Unsupported("document".into()))?;
        Ok(Self {
            document,
            next_id: Cell::new(0),
            bound: RefCell::new(HashMap::new()),
        })
    }
}

impl EventTarget for DocumentEvents {
    fn add_listener(&self, event: &str, listener: Listener) -> Result<ListenerId> {
        let callback = DomCallback::new(move |_event: web_sys::Event| listener());
        self.document
            .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            .map_err(platform_error)?;

        let id = ListenerId::new(self.next_id.get());
        self.next_id.set(id.get() + 1);
        self.bound
            .borrow_mut()
            .insert(id, (event.to_string(), callback));
        Ok(id)
    }

    fn remove_listener(&self, event: &str, id: ListenerId) -> bool {
        let mut bound = self.bound.borrow_mut();
        match bound.get(&id) {
            Some((name, _)) if name == event => {}
            _ => return false,
        }
        let Some((_, callback)) = bound.remove(&id) else {
            return false;
        };
        if let Err(e) = self
            .document
            .remove_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
        {
            warn!(event, error = ?e, "Failed to unbind document listener");
        }
        true
    }
}

impl Drop for DocumentEvents {
    fn drop(&mut self) {
        for (_, (event, callback)) in self.bound.get_mut().drain() {
            let _ = self
                .document
                .remove_event_listener_with_callback(&event, callback.as_ref().unchecked_ref());
        }
    }
}

/// [`Spawn`] that turns each task into a detached promise.
///
/// A failed ceremony becomes a rejected promise nobody awaits, which the
/// browser reports as an unhandled rejection.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromiseSpawner;

impl Spawn for PromiseSpawner {
    fn spawn(&self, task: LocalTask) {
        let _ = wasm_bindgen_futures::future_to_promise(async move {
            task.await.map(|()| JsValue::UNDEFINED).map_err(|e| js_error(&e))
        });
    }
}
