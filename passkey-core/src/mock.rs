//! Mock collaborators for testing.
//! WARNING: Do not use in production - the platform hands out fixed credentials!

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::capabilities::ClientCapabilities;
use crate::config::Mediation;
use crate::credential::{
    AssertionCredential, AssertionResponse, AttestationResponse, RegistrationCredential,
};
use crate::error::{PasskeyError, Result};
use crate::events::{LocalEventBus, LocalTask, Spawn};
use crate::hooks::HookContext;
use crate::options::CreationOptions;
use crate::peer::ServerPeer;
use crate::platform::{CredentialPlatform, CredentialRequest};

/// Server peer that records every push and answers from canned replies.
#[derive(Default)]
pub struct RecordingPeer {
    replies: RefCell<HashMap<String, Value>>,
    on_push: RefCell<HashMap<String, Rc<dyn Fn()>>>,
    pushes: RefCell<Vec<(String, Value)>>,
}

impl RecordingPeer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reply(&self, event: &str, reply: Value) {
        self.replies.borrow_mut().insert(event.to_string(), reply);
    }

    /// Run `callback` whenever `event` is pushed, before replying.
    pub fn on_push(&self, event: &str, callback: impl Fn() + 'static) {
        self.on_push
            .borrow_mut()
            .insert(event.to_string(), Rc::new(callback));
    }

    /// Payloads pushed under `event`, oldest first.
    pub fn pushed(&self, event: &str) -> Vec<Value> {
        self.pushes
            .borrow()
            .iter()
            .filter(|(name, _)| name == event)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn count(&self, event: &str) -> usize {
        self.pushes
            .borrow()
            .iter()
            .filter(|(name, _)| name == event)
            .count()
    }

    pub fn event_names(&self) -> Vec<String> {
        self.pushes
            .borrow()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn record(&self, event: &str, payload: Value) {
        self.pushes.borrow_mut().push((event.to_string(), payload));
        let callback = self.on_push.borrow().get(event).cloned();
        if let Some(callback) = callback {
            callback();
        }
    }
}

#[async_trait(?Send)]
impl ServerPeer for RecordingPeer {
    async fn push_event_reply(&self, event: &str, payload: Value) -> Result<Value> {
        self.record(event, payload);
        self.replies
            .borrow()
            .get(event)
            .cloned()
            .ok_or_else(|| PasskeyError::Peer(format!("no reply for {event}")))
    }

    async fn push_event(&self, event: &str, payload: Value) -> Result<()> {
        self.record(event, payload);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum RegistrationBehavior {
    Resolve(RegistrationCredential),
    Reject(PasskeyError),
    /// Never settles, like a prompt the user walked away from
    Pending,
}

#[derive(Debug, Clone)]
pub enum AssertionBehavior {
    Resolve(AssertionCredential),
    Reject(PasskeyError),
    /// Settles only when the request's abort signal fires
    AwaitAbort,
}

/// What the platform was asked for in one retrieval ceremony.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub options: Value,
    pub mediation: Mediation,
    pub had_signal: bool,
}

/// Scripted credential platform.
pub struct MockPlatform {
    capabilities: RefCell<Option<ClientCapabilities>>,
    registration: RefCell<RegistrationBehavior>,
    assertion: RefCell<AssertionBehavior>,
    create_calls: RefCell<Vec<Value>>,
    get_calls: RefCell<Vec<RecordedRequest>>,
    observed_aborts: Cell<usize>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            capabilities: RefCell::new(Some(ClientCapabilities::new())),
            registration: RefCell::new(RegistrationBehavior::Resolve(sample_registration())),
            assertion: RefCell::new(AssertionBehavior::Resolve(sample_assertion())),
            create_calls: RefCell::new(Vec::new()),
            get_calls: RefCell::new(Vec::new()),
            observed_aborts: Cell::new(0),
        }
    }

    /// `None` models a platform without `getClientCapabilities`.
    pub fn set_capabilities(&self, capabilities: Option<ClientCapabilities>) {
        *self.capabilities.borrow_mut() = capabilities;
    }

    pub fn set_registration(&self, behavior: RegistrationBehavior) {
        *self.registration.borrow_mut() = behavior;
    }

    pub fn set_assertion(&self, behavior: AssertionBehavior) {
        *self.assertion.borrow_mut() = behavior;
    }

    /// Creation options received, as JSON.
    pub fn create_calls(&self) -> Vec<Value> {
        self.create_calls.borrow().clone()
    }

    pub fn get_calls(&self) -> Vec<RecordedRequest> {
        self.get_calls.borrow().clone()
    }

    /// How many retrieval ceremonies ended because their signal fired.
    pub fn observed_aborts(&self) -> usize {
        self.observed_aborts.get()
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl CredentialPlatform for MockPlatform {
    fn supports_client_capabilities(&self) -> bool {
        self.capabilities.borrow().is_some()
    }

    async fn client_capabilities(&self) -> Result<ClientCapabilities> {
        self.capabilities
            .borrow()
            .clone()
            .ok_or_else(|| PasskeyError::Unsupported("getClientCapabilities".into()))
    }

    async fn create_credential(&self, options: CreationOptions) -> Result<RegistrationCredential> {
        self.create_calls.borrow_mut().push(options.into_json());

        let behavior = self.registration.borrow().clone();
        match behavior {
            RegistrationBehavior::Resolve(credential) => Ok(credential),
            RegistrationBehavior::Reject(err) => Err(err),
            RegistrationBehavior::Pending => std::future::pending().await,
        }
    }

    async fn get_credential(&self, request: CredentialRequest) -> Result<AssertionCredential> {
        self.get_calls.borrow_mut().push(RecordedRequest {
            options: request.public_key.clone().into_json(),
            mediation: request.mediation,
            had_signal: request.signal.is_some(),
        });

        let behavior = self.assertion.borrow().clone();
        match behavior {
            AssertionBehavior::Resolve(credential) => Ok(credential),
            AssertionBehavior::Reject(err) => Err(err),
            AssertionBehavior::AwaitAbort => {
                let Some(signal) = request.signal else {
                    return std::future::pending().await;
                };
                if !signal.aborted().await {
                    return std::future::pending().await;
                }
                self.observed_aborts.set(self.observed_aborts.get() + 1);
                Err(PasskeyError::Aborted)
            }
        }
    }
}

/// Spawner that queues tasks until the test drives them.
#[derive(Default)]
pub struct QueueSpawner {
    pending: RefCell<Vec<LocalTask>>,
}

impl QueueSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_pending(&self) -> Vec<LocalTask> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }

    /// Drive queued tasks (and any they queue) to completion, in order.
    /// Returns the failures that would have reached the host.
    pub async fn run_pending(&self) -> Vec<PasskeyError> {
        let mut failures = Vec::new();
        loop {
            let tasks = self.take_pending();
            if tasks.is_empty() {
                return failures;
            }
            for task in tasks {
                if let Err(err) = task.await {
                    failures.push(err);
                }
            }
        }
    }
}

impl Spawn for QueueSpawner {
    fn spawn(&self, task: LocalTask) {
        self.pending.borrow_mut().push(task);
    }
}

/// One of each mock, wired into a [`HookContext`].
pub struct MockHarness {
    pub peer: Rc<RecordingPeer>,
    pub platform: Rc<MockPlatform>,
    pub events: Rc<LocalEventBus>,
    pub spawner: Rc<QueueSpawner>,
}

impl MockHarness {
    pub fn new() -> Self {
        Self {
            peer: Rc::new(RecordingPeer::new()),
            platform: Rc::new(MockPlatform::new()),
            events: Rc::new(LocalEventBus::new()),
            spawner: Rc::new(QueueSpawner::new()),
        }
    }

    pub fn context(&self) -> HookContext {
        HookContext::new(
            self.peer.clone(),
            self.platform.clone(),
            self.events.clone(),
            self.spawner.clone(),
        )
    }
}

impl Default for MockHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration-parameters reply in the webauthn-rs `CreationChallengeResponse` shape.
pub fn sample_creation_reply() -> Value {
    json!({
        "publicKey": {
            "rp": { "name": "Passkey Demo", "id": "localhost" },
            "user": { "id": "dXNlci0x", "name": "alice", "displayName": "Alice" },
            "challenge": "Y2hhbGxlbmdlLWJ5dGVz",
            "pubKeyCredParams": [
                { "type": "public-key", "alg": -7 },
                { "type": "public-key", "alg": -257 }
            ],
            "timeout": 60000,
            "attestation": "none"
        }
    })
}

/// Authentication-parameters reply in the webauthn-rs `RequestChallengeResponse` shape.
pub fn sample_request_reply() -> Value {
    json!({
        "publicKey": {
            "challenge": "Y2hhbGxlbmdlLWJ5dGVz",
            "timeout": 60000,
            "rpId": "localhost",
            "allowCredentials": [],
            "userVerification": "preferred"
        },
        "mediation": "conditional"
    })
}

fn sample_authenticator_data(flags: u8) -> Vec<u8> {
    let mut data = vec![0x49; 32];
    data.push(flags);
    data.extend_from_slice(&[0, 0, 0, 0]);
    data
}

pub fn sample_registration() -> RegistrationCredential {
    let mut extensions = Map::new();
    extensions.insert("credProps".into(), json!({ "rk": true }));

    RegistrationCredential {
        id: "Y3JlZC0x".into(),
        raw_id: b"cred-1".to_vec(),
        credential_type: "public-key".into(),
        authenticator_attachment: Some("platform".into()),
        response: AttestationResponse {
            attestation_object: vec![0xa3, 0x63, 0x66, 0x6d, 0x74, 0x64, 0x6e, 0x6f, 0x6e, 0x65],
            authenticator_data: sample_authenticator_data(0x45),
            client_data_json: br#"{"type":"webauthn.create","challenge":"Y2hhbGxlbmdlLWJ5dGVz","origin":"http://localhost:4000"}"#.to_vec(),
            public_key: Some(vec![0x30, 0x59, 0x30, 0x13, 0x06, 0x07, 0x2a, 0x86, 0x48]),
            public_key_algorithm: -7,
            transports: vec!["internal".into(), "hybrid".into()],
        },
        client_extension_results: extensions,
    }
}

pub fn sample_assertion() -> AssertionCredential {
    AssertionCredential {
        id: "Y3JlZC0x".into(),
        raw_id: b"cred-1".to_vec(),
        credential_type: "public-key".into(),
        authenticator_attachment: Some("platform".into()),
        response: AssertionResponse {
            authenticator_data: sample_authenticator_data(0x05),
            client_data_json: br#"{"type":"webauthn.get","challenge":"Y2hhbGxlbmdlLWJ5dGVz","origin":"http://localhost:4000"}"#.to_vec(),
            signature: vec![0x30, 0x44, 0x02, 0x20, 0x11, 0x22, 0x33],
            user_handle: Some(b"user-1".to_vec()),
        },
        client_extension_results: Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_peer_without_reply_errors() {
        let peer = RecordingPeer::new();
        let err = peer
            .push_event_reply("generate_credential_registration", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, PasskeyError::Peer(_)));
        assert_eq!(peer.count("generate_credential_registration"), 1);
    }

    #[tokio::test]
    async fn test_platform_without_capability_query() {
        let platform = MockPlatform::new();
        platform.set_capabilities(None);
        assert!(!platform.supports_client_capabilities());
        assert!(platform.client_capabilities().await.is_err());
    }

    #[tokio::test]
    async fn test_queue_spawner_collects_failures() {
        let spawner = QueueSpawner::new();
        spawner.spawn(Box::pin(async { Ok(()) }));
        spawner.spawn(Box::pin(async { Err(PasskeyError::Aborted) }));
        assert_eq!(spawner.run_pending().await, vec![PasskeyError::Aborted]);
        assert!(spawner.take_pending().is_empty());
    }
}
