//! Cancellation for in-flight credential ceremonies.

use std::rc::Rc;

use tokio::sync::watch;

/// Owner side of a one-shot abort channel.
///
/// Clones share the same channel. Dropping every clone without aborting
/// releases waiting signals with `false`.
#[derive(Debug, Clone)]
pub struct AbortController {
    sender: Rc<watch::Sender<bool>>,
}

/// Observer side handed to the platform ceremony.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    receiver: watch::Receiver<bool>,
}

impl AbortController {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Rc::new(sender),
        }
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            receiver: self.sender.subscribe(),
        }
    }

    /// Trigger the abort. Returns `true` only for the call that changed state.
    pub fn abort(&self) -> bool {
        self.sender.send_if_modified(|aborted| {
            if *aborted {
                false
            } else {
                *aborted = true;
                true
            }
        })
    }

    pub fn is_aborted(&self) -> bool {
        *self.sender.borrow()
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Wait until the controller aborts (`true`) or is dropped (`false`).
    #[allow(clippy::let_and_return)]
    pub async fn aborted(&self) -> bool {
        let mut receiver = self.receiver.clone();
        let aborted = receiver.wait_for(|aborted| *aborted).await.is_ok();
        aborted
    }
}
