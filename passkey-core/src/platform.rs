//! Platform credential API.
//!
//! In a browser this is `navigator.credentials` plus the static helpers on
//! `PublicKeyCredential`.

use async_trait::async_trait;
use crate::abort::AbortSignal;
use crate::capabilities::ClientCapabilities;
use crate::config::Mediation;
use crate::credential::{AssertionCredential, RegistrationCredential};
use crate::error::Result;
use crate::options::{CreationOptions, RequestOptions};

/// Arguments for the retrieval ceremony.
#[derive(Debug, Clone)]
pub struct CredentialRequest {
    pub public_key: RequestOptions,
    pub mediation: Mediation,
    pub signal: Option<AbortSignal>,
}

/// Trait for platform credential ceremonies.
///
/// Both ceremonies may suspend indefinitely waiting for the user and may be
/// rejected by the platform (cancellation, timeout, policy, no authenticator).
#[async_trait(?Send)]
pub trait CredentialPlatform {
    /// Whether `getClientCapabilities` is available at all.
    fn supports_client_capabilities(&self) -> bool;

    async fn client_capabilities(&self) -> Result<ClientCapabilities>;

    /// Run the credential-creation ceremony. `options` is still in its JSON
    /// form and is expanded by the platform's own parsing rule.
    async fn create_credential(&self, options: CreationOptions) -> Result<RegistrationCredential>;

    /// Run the credential-retrieval ceremony. Must observe `request.signal`.
    async fn get_credential(&self, request: CredentialRequest) -> Result<AssertionCredential>;
}
