//! DOM-scoped event bus and task spawning.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use crate::error::Result;

/// Custom event that starts a registration ceremony.
pub const CREATE_CREDENTIAL: &str = "create_credential";
/// Custom event that aborts the in-flight authentication ceremony.
pub const ABORT_GET_CREDENTIAL: &str = "abort_get_credential";

pub type Listener = Rc<dyn Fn()>;

/// A ceremony started from a listener. Its error, if any, belongs to the host.
pub type LocalTask = Pin<Box<dyn Future<Output = Result<()>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Something custom events can be listened on (the document, in a browser).
pub trait EventTarget {
    fn add_listener(&self, event: &str, listener: Listener) -> Result<ListenerId>;

    /// Returns `false` if no such listener was bound.
    fn remove_listener(&self, event: &str, id: ListenerId) -> bool;
}

/// Runs listener-triggered ceremonies on the UI thread.
pub trait Spawn {
    fn spawn(&self, task: LocalTask);
}

/// In-process [`EventTarget`] for native hosts and tests.
#[derive(Default)]
pub struct LocalEventBus {
    next_id: Cell<u64>,
    listeners: RefCell<HashMap<String, Vec<(ListenerId, Listener)>>>,
}

impl LocalEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke every listener bound to `event`. Returns how many ran.
    pub fn dispatch(&self, event: &str) -> usize {
        // Snapshot so listeners may bind or unbind while running.
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .get(event)
            .map(|bound| bound.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();

        for listener in &listeners {
            listener();
        }
        listeners.len()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.borrow().get(event).map_or(0, Vec::len)
    }
}

impl EventTarget for LocalEventBus {
    fn add_listener(&self, event: &str, listener: Listener) -> Result<ListenerId> {
        let id = ListenerId::new(self.next_id.get());
        self.next_id.set(id.get() + 1);
        self.listeners
            .borrow_mut()
            .entry(event.to_string())
            .or_default()
            .push((id, listener));
        Ok(id)
    }

    fn remove_listener(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(bound) = listeners.get_mut(event) else {
            return false;
        };
        let before = bound.len();
        bound.retain(|(bound_id, _)| *bound_id != id);
        before != bound.len()
    }
}
