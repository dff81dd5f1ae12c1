//! Server peer channel.
//!
//! The server is reachable only through named event pushes, either awaiting a
//! reply or fire-and-forget.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Request registration parameters. Reply: creation options.
pub const GENERATE_CREDENTIAL_REGISTRATION: &str = "generate_credential_registration";
/// Submit an encoded registration credential.
pub const STORE_CREDENTIAL: &str = "store_credential";
/// Report client capabilities.
pub const UPDATE_CAPABILITIES: &str = "update_capabilities";
/// Request authentication parameters. Reply: request options.
pub const GENERATE_CREDENTIAL_AUTHENTICATION: &str = "generate_credential_authentication";
/// Submit an encoded assertion.
pub const AUTHENTICATE_CREDENTIAL: &str = "authenticate_credential";

/// Bidirectional event channel to the server peer.
///
/// Execution is single-threaded, so implementations need not be `Send`.
#[async_trait(?Send)]
pub trait ServerPeer {
    /// Push an event and wait for the server's reply.
    async fn push_event_reply(&self, event: &str, payload: Value) -> Result<Value>;

    /// Push an event without a reply contract.
    async fn push_event(&self, event: &str, payload: Value) -> Result<()>;
}
