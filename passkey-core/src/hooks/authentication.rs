//! Authentication hook: drives the conditional credential-retrieval ceremony.
//!
//! Conditional ceremonies integrate with browser autofill and routinely end
//! without a credential (the user ignores the prompt, navigates away, or the
//! page aborts). Under the default policy those endings are absorbed.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::json;
use tracing::{debug, info, instrument};

use super::HookContext;
use crate::abort::AbortController;
use crate::credential::{CredentialSubmission, EncodedAssertion};
use crate::error::{PasskeyError, Result};
use crate::events::{ListenerId, ABORT_GET_CREDENTIAL};
use crate::options::parse_request_options;
use crate::peer::{AUTHENTICATE_CREDENTIAL, GENERATE_CREDENTIAL_AUTHENTICATION};
use crate::platform::CredentialRequest;

/// Session object for the "assert an existing credential" ceremony.
pub struct AuthenticationHook {
    session: Rc<AuthenticationSession>,
}

struct AuthenticationSession {
    ctx: HookContext,
    current: RefCell<Option<ActiveCeremony>>,
    next_ceremony: Cell<u64>,
}

/// The ceremony that currently owns the abort handle.
struct ActiveCeremony {
    id: u64,
    controller: AbortController,
}

/// Unbinds the abort listener and releases the controller on settle.
struct Settle<'a> {
    session: &'a AuthenticationSession,
    ceremony: u64,
    listener: ListenerId,
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        self.session
            .ctx
            .events
            .remove_listener(ABORT_GET_CREDENTIAL, self.listener);

        let mut current = self.session.current.borrow_mut();
        if current.as_ref().is_some_and(|c| c.id == self.ceremony) {
            *current = None;
        }
    }
}

impl AuthenticationHook {
    pub fn new(ctx: HookContext) -> Self {
        Self {
            session: Rc::new(AuthenticationSession {
                ctx,
                current: RefCell::new(None),
                next_ceremony: Cell::new(0),
            }),
        }
    }

    /// Query capabilities and, if conditional mediation is supported, start a
    /// ceremony in the background. Returns whether one was started.
    #[instrument(level = "debug", skip_all)]
    pub async fn mounted(&self) -> Result<bool> {
        let ctx = &self.session.ctx;
        if !ctx.platform.supports_client_capabilities() {
            debug!("Client capabilities query unavailable, conditional login disabled");
            return Ok(false);
        }

        let capabilities = ctx.platform.client_capabilities().await?;
        if !capabilities.conditional_get() {
            debug!("Conditional mediation unsupported");
            return Ok(false);
        }

        let session = self.session.clone();
        ctx.spawner.spawn(Box::pin(session.attempt()));
        Ok(true)
    }

    /// Run one ceremony and return the submitted assertion.
    ///
    /// Errors are returned as-is; the failure policy only applies to
    /// ceremonies started by [`mounted`](Self::mounted).
    pub async fn get_credential(&self) -> Result<EncodedAssertion> {
        self.session.get_credential().await
    }

    /// Abort the in-flight ceremony. Returns whether one was aborted.
    pub fn cancel(&self) -> bool {
        self.session
            .current
            .borrow()
            .as_ref()
            .is_some_and(|c| c.controller.abort())
    }

    pub fn in_flight(&self) -> bool {
        self.session.current.borrow().is_some()
    }

    pub fn destroyed(&self) {
        if self.cancel() {
            debug!("Authentication hook detached, ceremony aborted");
        }
    }
}

impl AuthenticationSession {
    async fn attempt(self: Rc<Self>) -> Result<()> {
        match self.get_credential().await {
            Ok(_) => Ok(()),
            Err(err) => self
                .ctx
                .config
                .authentication_failure
                .settle("authentication", err),
        }
    }

    /// Install a fresh controller, aborting whichever ceremony held the last one.
    fn begin(&self, controller: AbortController) -> u64 {
        let id = self.next_ceremony.get();
        self.next_ceremony.set(id + 1);

        let previous = self
            .current
            .borrow_mut()
            .replace(ActiveCeremony { id, controller });
        if let Some(previous) = previous {
            if previous.controller.abort() {
                debug!(ceremony = previous.id, "Superseded authentication ceremony aborted");
            }
        }
        id
    }

    #[instrument(level = "debug", skip_all)]
    async fn get_credential(&self) -> Result<EncodedAssertion> {
        let controller = AbortController::new();

        let on_abort = controller.clone();
        let listener = self.ctx.events.add_listener(
            ABORT_GET_CREDENTIAL,
            Rc::new(move || {
                if on_abort.abort() {
                    debug!("Authentication ceremony abort requested");
                }
            }),
        )?;
        // Nothing fallible between taking the handle and arming the guard.
        let ceremony = self.begin(controller.clone());
        let _settle = Settle {
            session: self,
            ceremony,
            listener,
        };

        let reply = self
            .ctx
            .peer
            .push_event_reply(GENERATE_CREDENTIAL_AUTHENTICATION, json!({}))
            .await?;
        let public_key = parse_request_options(reply)?;

        if controller.is_aborted() {
            return Err(PasskeyError::Aborted);
        }

        debug!(
            ceremony,
            mediation = self.ctx.config.mediation.as_str(),
            "Starting credential retrieval"
        );
        let credential = self
            .ctx
            .platform
            .get_credential(CredentialRequest {
                public_key,
                mediation: self.ctx.config.mediation,
                signal: Some(controller.signal()),
            })
            .await?;
        let encoded = EncodedAssertion::from(&credential);

        self.ctx
            .peer
            .push_event(
                AUTHENTICATE_CREDENTIAL,
                serde_json::to_value(CredentialSubmission::new(&encoded))?,
            )
            .await?;

        info!(credential_id = %encoded.id, "Credential assertion submitted");
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::ClientCapabilities;
    use crate::config::{FailurePolicy, HookConfig, Mediation};
    use crate::encoding::encode;
    use crate::events::{EventTarget, Listener, LocalEventBus};
    use crate::mock::{sample_assertion, sample_request_reply, AssertionBehavior, MockHarness};
    use serde_json::json;

    /// Event target that can be told to refuse new listeners.
    #[derive(Default)]
    struct FlakyEvents {
        bus: LocalEventBus,
        refuse: Cell<bool>,
    }

    impl EventTarget for FlakyEvents {
        fn add_listener(&self, event: &str, listener: Listener) -> Result<ListenerId> {
            if self.refuse.get() {
                return Err(PasskeyError::Unsupported("addEventListener".into()));
            }
            self.bus.add_listener(event, listener)
        }

        fn remove_listener(&self, event: &str, id: ListenerId) -> bool {
            self.bus.remove_listener(event, id)
        }
    }

    fn flaky_context(h: &MockHarness, events: Rc<FlakyEvents>) -> HookContext {
        HookContext::new(h.peer.clone(), h.platform.clone(), events, h.spawner.clone())
    }

    fn harness() -> MockHarness {
        let harness = MockHarness::new();
        harness
            .peer
            .set_reply(GENERATE_CREDENTIAL_AUTHENTICATION, sample_request_reply());
        harness
            .platform
            .set_capabilities(Some(ClientCapabilities::new().with("conditionalGet", true)));
        harness
            .platform
            .set_assertion(AssertionBehavior::Resolve(sample_assertion()));
        harness
    }

    /// Yield until the platform has been asked for a credential.
    async fn until_ceremony_started(h: &MockHarness, calls: usize) {
        while h.platform.get_calls().len() < calls {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_conditional_support_starts_ceremony() {
        let h = harness();
        let hook = AuthenticationHook::new(h.context());

        assert!(hook.mounted().await.unwrap());
        assert!(h.spawner.run_pending().await.is_empty());

        let calls = h.platform.get_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].mediation, Mediation::Conditional);
        assert!(calls[0].had_signal);

        let submitted = h.peer.pushed(AUTHENTICATE_CREDENTIAL);
        assert_eq!(submitted.len(), 1);
        let raw = sample_assertion();
        let credential = &submitted[0]["credential"];
        assert_eq!(credential["rawId"], encode(&raw.raw_id));
        assert_eq!(credential["response"]["signature"], encode(&raw.response.signature));
        assert_eq!(
            credential["response"]["userHandle"],
            encode(raw.response.user_handle.as_deref().unwrap())
        );
        assert!(!hook.in_flight());
    }

    #[tokio::test]
    async fn test_no_conditional_support_no_ceremony() {
        let h = harness();
        h.platform
            .set_capabilities(Some(ClientCapabilities::new().with("conditionalGet", false)));
        let hook = AuthenticationHook::new(h.context());

        assert!(!hook.mounted().await.unwrap());
        h.spawner.run_pending().await;
        assert_eq!(h.peer.count(GENERATE_CREDENTIAL_AUTHENTICATION), 0);
    }

    #[tokio::test]
    async fn test_no_capability_query_no_ceremony() {
        let h = harness();
        h.platform.set_capabilities(None);
        let hook = AuthenticationHook::new(h.context());

        assert!(!hook.mounted().await.unwrap());
        assert!(h.platform.get_calls().is_empty());
    }

    #[tokio::test]
    async fn test_abort_signal_cancels_silently() {
        let h = harness();
        h.platform.set_assertion(AssertionBehavior::AwaitAbort);
        let hook = AuthenticationHook::new(h.context());
        hook.mounted().await.unwrap();

        let (failures, _) = tokio::join!(h.spawner.run_pending(), async {
            until_ceremony_started(&h, 1).await;
            assert_eq!(h.events.dispatch(ABORT_GET_CREDENTIAL), 1);
            // A second signal finds the handle already triggered.
            h.events.dispatch(ABORT_GET_CREDENTIAL);
        });

        assert!(failures.is_empty());
        assert_eq!(h.platform.observed_aborts(), 1);
        assert!(h.peer.pushed(AUTHENTICATE_CREDENTIAL).is_empty());
        assert_eq!(h.events.listener_count(ABORT_GET_CREDENTIAL), 0);
        assert!(!hook.in_flight());
    }

    #[tokio::test]
    async fn test_rejection_absorbed_and_listener_released() {
        let h = harness();
        h.platform.set_assertion(AssertionBehavior::Reject(
            PasskeyError::from_dom_exception("NotAllowedError", "no matching credential"),
        ));
        let hook = AuthenticationHook::new(h.context());
        hook.mounted().await.unwrap();

        assert!(h.spawner.run_pending().await.is_empty());
        assert!(h.peer.pushed(AUTHENTICATE_CREDENTIAL).is_empty());
        assert_eq!(h.events.listener_count(ABORT_GET_CREDENTIAL), 0);
    }

    #[tokio::test]
    async fn test_surface_policy_reports_rejection() {
        let h = harness();
        h.platform.set_assertion(AssertionBehavior::Reject(
            PasskeyError::from_dom_exception("SecurityError", "bad rp id"),
        ));
        let config = HookConfig {
            authentication_failure: FailurePolicy::Surface,
            ..HookConfig::default()
        };
        let hook = AuthenticationHook::new(h.context().with_config(config));
        hook.mounted().await.unwrap();

        let failures = h.spawner.run_pending().await;
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], PasskeyError::Rejected { ref name, .. } if name == "SecurityError"));
    }

    #[tokio::test]
    async fn test_new_ceremony_aborts_previous() {
        let h = harness();
        h.platform.set_assertion(AssertionBehavior::AwaitAbort);
        let hook = AuthenticationHook::new(h.context());

        let (first, second) = tokio::join!(hook.get_credential(), async {
            until_ceremony_started(&h, 1).await;
            let (second, _) = tokio::join!(hook.get_credential(), async {
                until_ceremony_started(&h, 2).await;
                assert!(hook.cancel());
            });
            second
        });

        assert_eq!(first, Err(PasskeyError::Aborted));
        assert_eq!(second, Err(PasskeyError::Aborted));
        assert_eq!(h.platform.observed_aborts(), 2);
        assert!(!hook.in_flight());
    }

    #[tokio::test]
    async fn test_cancel_without_ceremony() {
        let h = harness();
        let hook = AuthenticationHook::new(h.context());
        assert!(!hook.cancel());
    }

    #[tokio::test]
    async fn test_abort_during_parameter_request_skips_platform() {
        let h = harness();
        let hook = AuthenticationHook::new(h.context());
        h.peer.on_push(GENERATE_CREDENTIAL_AUTHENTICATION, {
            let events = h.events.clone();
            move || {
                events.dispatch(ABORT_GET_CREDENTIAL);
            }
        });

        assert_eq!(hook.get_credential().await, Err(PasskeyError::Aborted));
        assert!(h.platform.get_calls().is_empty());
    }

    #[tokio::test]
    async fn test_destroyed_aborts_in_flight() {
        let h = harness();
        h.platform.set_assertion(AssertionBehavior::AwaitAbort);
        let hook = AuthenticationHook::new(h.context());

        let (result, _) = tokio::join!(hook.get_credential(), async {
            until_ceremony_started(&h, 1).await;
            hook.destroyed();
        });
        assert!(result.unwrap_err().is_aborted());
    }

    #[tokio::test]
    async fn test_challenge_only_reply_reaches_platform() {
        let h = harness();
        h.peer
            .set_reply(GENERATE_CREDENTIAL_AUTHENTICATION, json!({ "challenge": "Y2hhbGxlbmdl" }));
        let hook = AuthenticationHook::new(h.context());

        assert!(hook.mounted().await.unwrap());
        assert!(h.spawner.run_pending().await.is_empty());

        let calls = h.platform.get_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].options, json!({ "challenge": "Y2hhbGxlbmdl" }));
        assert_eq!(h.peer.count(AUTHENTICATE_CREDENTIAL), 1);
    }

    #[tokio::test]
    async fn test_listener_bind_failure_leaves_no_ceremony() {
        let h = harness();
        let events = Rc::new(FlakyEvents::default());
        events.refuse.set(true);
        let hook = AuthenticationHook::new(flaky_context(&h, events));

        let err = hook.get_credential().await.unwrap_err();
        assert!(matches!(err, PasskeyError::Unsupported(_)));
        assert!(!hook.in_flight());
        assert!(!hook.cancel());
        assert_eq!(h.peer.count(GENERATE_CREDENTIAL_AUTHENTICATION), 0);
    }

    #[tokio::test]
    async fn test_listener_bind_failure_keeps_previous_ceremony() {
        let h = harness();
        h.platform.set_assertion(AssertionBehavior::AwaitAbort);
        let events = Rc::new(FlakyEvents::default());
        let hook = AuthenticationHook::new(flaky_context(&h, events.clone()));

        let (first, _) = tokio::join!(hook.get_credential(), async {
            until_ceremony_started(&h, 1).await;

            events.refuse.set(true);
            let err = hook.get_credential().await.unwrap_err();
            assert!(matches!(err, PasskeyError::Unsupported(_)));
            assert_eq!(h.platform.observed_aborts(), 0);
            assert!(hook.in_flight());

            // The surviving ceremony still owns the handle.
            assert!(hook.cancel());
        });

        assert_eq!(first, Err(PasskeyError::Aborted));
        assert_eq!(h.platform.observed_aborts(), 1);
        assert!(!hook.in_flight());
        assert_eq!(events.bus.listener_count(ABORT_GET_CREDENTIAL), 0);
    }
}
