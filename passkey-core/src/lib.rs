//! Passkey Core - WebAuthn ceremony sessions for socket-driven web views
//!
//! This crate drives the two browser-side passkey ceremonies of a
//! server-rendered application whose server is reachable only through named
//! event pushes:
//!
//! - **Registration**: on a `create_credential` event, fetch creation options
//!   from the server, run the platform creation ceremony, and push the encoded
//!   credential back under `store_credential`.
//! - **Authentication**: when the platform supports conditional mediation,
//!   fetch request options, run a non-blocking (autofill) retrieval ceremony,
//!   and push the encoded assertion under `authenticate_credential`. An
//!   `abort_get_credential` event cancels it.
//!
//! The server peer, the platform credential API, the DOM event target and the
//! task spawner are traits, so the same sessions run in the browser (see the
//! `passkey-wasm` crate) and against the mocks in [`mock`].
//!
//! # Example
//!
//! ```no_run
//! use passkey_core::mock::MockHarness;
//! use passkey_core::{RegistrationHook, CREATE_CREDENTIAL};
//!
//! # async fn example() -> passkey_core::Result<()> {
//! let harness = MockHarness::new();
//! let hook = RegistrationHook::new(harness.context());
//! hook.mounted().await?;
//!
//! // The page asks for a new passkey
//! harness.events.dispatch(CREATE_CREDENTIAL);
//! let failures = harness.spawner.run_pending().await;
//! assert!(failures.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod abort;
pub mod capabilities;
pub mod config;
pub mod credential;
pub mod encoding;
pub mod error;
pub mod events;
pub mod hooks;
pub mod mock;
pub mod options;
pub mod peer;
pub mod platform;

// Re-export main types for convenience
pub use abort::{AbortController, AbortSignal};
pub use capabilities::ClientCapabilities;
pub use config::{FailurePolicy, HookConfig, Mediation};
pub use credential::{
    decode_submission, AssertionCredential, AssertionResponse, AttestationResponse,
    CredentialSubmission, EncodedAssertion, EncodedAssertionResponse,
    EncodedAttestationResponse, EncodedRegistration, RegistrationCredential,
};
pub use error::{PasskeyError, Result};
pub use events::{
    EventTarget, Listener, ListenerId, LocalEventBus, LocalTask, Spawn, ABORT_GET_CREDENTIAL,
    CREATE_CREDENTIAL,
};
pub use hooks::{AuthenticationHook, HookContext, RegistrationHook};
pub use options::{parse_creation_options, parse_request_options, CreationOptions, RequestOptions};
pub use peer::{
    ServerPeer, AUTHENTICATE_CREDENTIAL, GENERATE_CREDENTIAL_AUTHENTICATION,
    GENERATE_CREDENTIAL_REGISTRATION, STORE_CREDENTIAL, UPDATE_CAPABILITIES,
};
pub use platform::{CredentialPlatform, CredentialRequest};
