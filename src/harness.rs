//! Event-wait harness for tests.
//!
//! A wait is registered before the action that should produce the event:
//! subscribe, then trigger, then await the event, then verify. The whole
//! sequence runs under one timeout, and the subscription is cancelled on
//! every outcome.

use std::{future::Future, time::Duration};

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
    contract::{ContractEvent, EventSubscription},
    error::{Error, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    /// Listener registered, event not seen yet
    Waiting,
    /// Event fired and verification ran
    Settled,
}

#[derive(Debug)]
pub struct EventWait<E> {
    subscription: EventSubscription<E>,
    event: &'static str,
    timeout: Duration,
    state: WaitState,
}

impl<E: ContractEvent> EventWait<E> {
    /// Wrap a live subscription waiting for `event`
    pub fn new(subscription: EventSubscription<E>, event: &'static str, timeout: Duration) -> Self {
        Self {
            subscription,
            event,
            timeout,
            state: WaitState::Waiting,
        }
    }

    pub fn state(&self) -> WaitState {
        self.state
    }

    pub fn event(&self) -> &'static str {
        self.event
    }

    /// Whether the underlying listener is still registered
    pub fn is_listening(&self) -> bool {
        self.subscription.is_active()
    }

    /// Run `trigger`, wait for the event, then hand it to `verify`.
    ///
    /// Fails with [`Error::Timeout`] when trigger, event and verification
    /// together take longer than the timeout. Trigger and verification
    /// errors are returned as is. No retries.
    pub async fn settle<T, Trigger, Verify, Fut>(&mut self, trigger: Trigger, verify: Verify) -> Result<T>
    where
        Trigger: Future<Output = Result<()>>,
        Verify: FnOnce(E) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let event = self.event;
        let timeout = self.timeout;
        let deadline = Instant::now() + timeout;
        let subscription = &mut self.subscription;

        let outcome = tokio::time::timeout_at(deadline, async {
            trigger.await?;
            subscription
                .next_named(event)
                .await
                .ok_or_else(|| Error::SubscriptionClosed(event.to_string()))
        })
        .await;
        self.subscription.cancel();

        let Ok(fired) = outcome else {
            warn!(event, ?timeout, "event did not fire in time");
            return Err(Error::Timeout {
                event: event.to_string(),
                timeout,
            });
        };
        let fired = fired?;

        self.state = WaitState::Settled;
        debug!(event, ?fired, "event fired");
        match tokio::time::timeout_at(deadline, verify(fired)).await {
            Ok(verified) => verified,
            Err(_) => {
                warn!(event, ?timeout, "verification did not finish in time");
                Err(Error::Timeout {
                    event: event.to_string(),
                    timeout,
                })
            }
        }
    }
}
