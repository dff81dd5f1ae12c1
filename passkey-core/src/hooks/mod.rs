//! Credential ceremony hooks.
//!
//! Each hook is a session object with an explicit lifecycle: `mounted` when its
//! view attaches, `destroyed` when it detaches. The registration hook is
//! started by the `create_credential` event; the authentication hook starts
//! itself when the platform supports conditional mediation.

mod authentication;
mod registration;

pub use authentication::AuthenticationHook;
pub use registration::RegistrationHook;

use std::rc::Rc;

use crate::config::HookConfig;
use crate::events::{EventTarget, Spawn};
use crate::peer::ServerPeer;
use crate::platform::CredentialPlatform;

/// Collaborators shared by both hooks
#[derive(Clone)]
pub struct HookContext {
    pub peer: Rc<dyn ServerPeer>,
    pub platform: Rc<dyn CredentialPlatform>,
    pub events: Rc<dyn EventTarget>,
    pub spawner: Rc<dyn Spawn>,
    pub config: HookConfig,
}

impl HookContext {
    pub fn new(
        peer: Rc<dyn ServerPeer>,
        platform: Rc<dyn CredentialPlatform>,
        events: Rc<dyn EventTarget>,
        spawner: Rc<dyn Spawn>,
    ) -> Self {
        Self {
            peer,
            platform,
            events,
            spawner,
            config: HookConfig::default(),
        }
    }

    pub fn with_config(mut self, config: HookConfig) -> Self {
        self.config = config;
        self
    }
}

impl std::fmt::Debug for HookContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
