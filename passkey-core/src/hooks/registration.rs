//! Registration hook: drives the credential-creation ceremony.

use std::cell::Cell;
use std::rc::Rc;

use serde_json::json;
use tracing::{debug, info, instrument, warn};

use super::HookContext;
use crate::credential::{CredentialSubmission, EncodedRegistration};
use crate::error::{PasskeyError, Result};
use crate::events::{ListenerId, Listener, CREATE_CREDENTIAL};
use crate::options::parse_creation_options;
use crate::peer::{GENERATE_CREDENTIAL_REGISTRATION, STORE_CREDENTIAL, UPDATE_CAPABILITIES};

/// Session object for the "create a new credential" ceremony.
///
/// Dropping the hook unbinds its listener.
pub struct RegistrationHook {
    session: Rc<RegistrationSession>,
    listener: Cell<Option<ListenerId>>,
}

struct RegistrationSession {
    ctx: HookContext,
    in_flight: Cell<bool>,
}

/// Clears the in-flight flag when the ceremony settles, however it settles.
struct InFlight<'a>(&'a Cell<bool>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl RegistrationHook {
    pub fn new(ctx: HookContext) -> Self {
        Self {
            session: Rc::new(RegistrationSession {
                ctx,
                in_flight: Cell::new(false),
            }),
            listener: Cell::new(None),
        }
    }

    /// Bind the `create_credential` listener and report client capabilities.
    #[instrument(level = "debug", skip_all)]
    pub async fn mounted(&self) -> Result<()> {
        self.bind()?;

        let ctx = &self.session.ctx;
        if !ctx.platform.supports_client_capabilities() {
            debug!("Client capabilities query unavailable, skipping report");
            return Ok(());
        }

        let capabilities = ctx.platform.client_capabilities().await?;
        ctx.peer
            .push_event(UPDATE_CAPABILITIES, serde_json::to_value(&capabilities)?)
            .await?;
        debug!("Reported client capabilities");
        Ok(())
    }

    /// Unbind the listener. Later `create_credential` events are ignored.
    pub fn destroyed(&self) {
        if let Some(id) = self.listener.take() {
            self.session.ctx.events.remove_listener(CREATE_CREDENTIAL, id);
            debug!("Registration hook detached");
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.listener.get().is_some()
    }

    pub fn in_flight(&self) -> bool {
        self.session.in_flight.get()
    }

    /// Run one registration ceremony and return what was submitted.
    ///
    /// Errors are returned as-is; the failure policy only applies to
    /// listener-triggered runs.
    pub async fn create_credential(&self) -> Result<EncodedRegistration> {
        self.session.create_credential().await
    }

    fn bind(&self) -> Result<()> {
        if self.listener.get().is_some() {
            return Ok(());
        }

        let session = Rc::downgrade(&self.session);
        let listener: Listener = Rc::new(move || {
            let Some(session) = session.upgrade() else {
                return;
            };
            let spawner = session.ctx.spawner.clone();
            spawner.spawn(Box::pin(session.on_trigger()));
        });

        let id = self
            .session
            .ctx
            .events
            .add_listener(CREATE_CREDENTIAL, listener)?;
        self.listener.set(Some(id));
        Ok(())
    }
}

impl Drop for RegistrationHook {
    fn drop(&mut self) {
        self.destroyed();
    }
}

impl RegistrationSession {
    async fn on_trigger(self: Rc<Self>) -> Result<()> {
        match self.create_credential().await {
            Ok(_) => Ok(()),
            Err(PasskeyError::CeremonyInFlight) => {
                warn!("Ignoring create_credential while a registration is in flight");
                Ok(())
            }
            Err(err) => self.ctx.config.registration_failure.settle("registration", err),
        }
    }

    #[instrument(level = "debug", skip_all)]
    async fn create_credential(&self) -> Result<EncodedRegistration> {
        if self.in_flight.replace(true) {
            return Err(PasskeyError::CeremonyInFlight);
        }
        let _in_flight = InFlight(&self.in_flight);

        let reply = self
            .ctx
            .peer
            .push_event_reply(GENERATE_CREDENTIAL_REGISTRATION, json!({}))
            .await?;
        let options = parse_creation_options(reply)?;
        debug!(rp_id = ?options.rp_id(), "Starting credential creation");

        let credential = self.ctx.platform.create_credential(options).await?;
        let encoded = EncodedRegistration::from(&credential);

        self.ctx
            .peer
            .push_event(
                STORE_CREDENTIAL,
                serde_json::to_value(CredentialSubmission::new(&encoded))?,
            )
            .await?;

        info!(credential_id = %encoded.id, "Credential registration submitted");
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::ClientCapabilities;
    use crate::config::{FailurePolicy, HookConfig};
    use crate::encoding::encode;
    use crate::mock::{sample_creation_reply, sample_registration, MockHarness, RegistrationBehavior};

    fn harness() -> MockHarness {
        let harness = MockHarness::new();
        harness
            .peer
            .set_reply(GENERATE_CREDENTIAL_REGISTRATION, sample_creation_reply());
        harness
            .platform
            .set_registration(RegistrationBehavior::Resolve(sample_registration()));
        harness
    }

    #[tokio::test]
    async fn test_trigger_runs_one_ceremony() {
        let h = harness();
        let hook = RegistrationHook::new(h.context());
        hook.mounted().await.unwrap();

        assert_eq!(h.events.dispatch(CREATE_CREDENTIAL), 1);
        let failures = h.spawner.run_pending().await;
        assert!(failures.is_empty());

        assert_eq!(h.peer.count(GENERATE_CREDENTIAL_REGISTRATION), 1);
        assert_eq!(h.platform.create_calls().len(), 1);
        assert_eq!(
            h.platform.create_calls()[0],
            sample_creation_reply()["publicKey"]
        );

        let stored = h.peer.pushed(STORE_CREDENTIAL);
        assert_eq!(stored.len(), 1);
        let credential = &stored[0]["credential"];
        let raw = sample_registration();
        assert_eq!(credential["rawId"], encode(&raw.raw_id));
        assert_eq!(
            credential["response"]["attestationObject"],
            encode(&raw.response.attestation_object)
        );
        assert_eq!(
            credential["response"]["authenticatorData"],
            encode(&raw.response.authenticator_data)
        );
        assert_eq!(
            credential["response"]["clientDataJSON"],
            encode(&raw.response.client_data_json)
        );
    }

    #[tokio::test]
    async fn test_request_precedes_ceremony_precedes_submit() {
        let h = harness();
        let hook = RegistrationHook::new(h.context());
        hook.create_credential().await.unwrap();

        assert_eq!(
            h.peer.event_names(),
            vec![GENERATE_CREDENTIAL_REGISTRATION, STORE_CREDENTIAL]
        );
    }

    #[tokio::test]
    async fn test_rejection_skips_submit_and_surfaces() {
        let h = harness();
        h.platform.set_registration(RegistrationBehavior::Reject(
            PasskeyError::from_dom_exception("NotAllowedError", "user cancelled"),
        ));
        let hook = RegistrationHook::new(h.context());
        hook.mounted().await.unwrap();

        h.events.dispatch(CREATE_CREDENTIAL);
        let failures = h.spawner.run_pending().await;

        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], PasskeyError::Rejected { .. }));
        assert!(h.peer.pushed(STORE_CREDENTIAL).is_empty());
        assert!(!hook.in_flight());
    }

    #[tokio::test]
    async fn test_absorb_policy_hides_rejection() {
        let h = harness();
        h.platform.set_registration(RegistrationBehavior::Reject(
            PasskeyError::from_dom_exception("NotAllowedError", "timed out"),
        ));
        let config = HookConfig {
            registration_failure: FailurePolicy::Absorb,
            ..HookConfig::default()
        };
        let hook = RegistrationHook::new(h.context().with_config(config));
        hook.mounted().await.unwrap();

        h.events.dispatch(CREATE_CREDENTIAL);
        assert!(h.spawner.run_pending().await.is_empty());
        assert!(h.peer.pushed(STORE_CREDENTIAL).is_empty());
    }

    #[tokio::test]
    async fn test_capabilities_reported_on_mount() {
        let h = harness();
        h.platform
            .set_capabilities(Some(ClientCapabilities::new().with("conditionalGet", true)));
        let hook = RegistrationHook::new(h.context());
        hook.mounted().await.unwrap();

        let pushed = h.peer.pushed(UPDATE_CAPABILITIES);
        assert_eq!(pushed, vec![json!({ "conditionalGet": true })]);
    }

    #[tokio::test]
    async fn test_no_capability_query_no_report() {
        let h = harness();
        h.platform.set_capabilities(None);
        let hook = RegistrationHook::new(h.context());
        hook.mounted().await.unwrap();

        assert!(hook.is_mounted());
        assert!(h.peer.pushed(UPDATE_CAPABILITIES).is_empty());
    }

    #[tokio::test]
    async fn test_detached_hook_ignores_signal() {
        let h = harness();
        let hook = RegistrationHook::new(h.context());
        hook.mounted().await.unwrap();
        hook.destroyed();

        assert_eq!(h.events.dispatch(CREATE_CREDENTIAL), 0);
        h.spawner.run_pending().await;
        assert_eq!(h.peer.count(GENERATE_CREDENTIAL_REGISTRATION), 0);
        assert!(!hook.is_mounted());
    }

    #[tokio::test]
    async fn test_drop_unbinds_listener() {
        let h = harness();
        {
            let hook = RegistrationHook::new(h.context());
            hook.mounted().await.unwrap();
            assert_eq!(h.events.listener_count(CREATE_CREDENTIAL), 1);
        }
        assert_eq!(h.events.listener_count(CREATE_CREDENTIAL), 0);
    }

    #[tokio::test]
    async fn test_reentrant_trigger_refused() {
        let h = harness();
        h.platform.set_registration(RegistrationBehavior::Pending);
        let hook = RegistrationHook::new(h.context());
        hook.mounted().await.unwrap();

        h.events.dispatch(CREATE_CREDENTIAL);
        h.events.dispatch(CREATE_CREDENTIAL);

        let mut tasks = h.spawner.take_pending();
        assert_eq!(tasks.len(), 2);
        let second = tasks.pop().unwrap();
        let first = tasks.pop().unwrap();

        tokio::select! {
            biased;
            _ = first => panic!("pending ceremony settled"),
            result = async {
                tokio::task::yield_now().await;
                second.await
            } => assert!(result.is_ok()),
        }

        assert_eq!(h.peer.count(GENERATE_CREDENTIAL_REGISTRATION), 1);
        assert_eq!(h.platform.create_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_extensions_reach_platform_unchanged() {
        let h = harness();
        let mut reply = sample_creation_reply();
        reply["publicKey"]["extensions"] = serde_json::json!({
            "largeBlob": { "support": "preferred" },
            "prf": {},
            "credProps": true
        });
        h.peer.set_reply(GENERATE_CREDENTIAL_REGISTRATION, reply);
        let hook = RegistrationHook::new(h.context());

        hook.create_credential().await.unwrap();

        let calls = h.platform.create_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0]["extensions"]["largeBlob"]["support"], "preferred");
        assert_eq!(calls[0]["extensions"]["prf"], serde_json::json!({}));
        assert_eq!(calls[0]["extensions"]["credProps"], true);
    }

    #[tokio::test]
    async fn test_invalid_options_skip_ceremony() {
        let h = harness();
        h.peer.set_reply(GENERATE_CREDENTIAL_REGISTRATION, serde_json::Value::Null);
        let hook = RegistrationHook::new(h.context());

        let err = hook.create_credential().await.unwrap_err();
        assert!(matches!(err, PasskeyError::InvalidOptions(_)));
        assert!(h.platform.create_calls().is_empty());
    }
}
