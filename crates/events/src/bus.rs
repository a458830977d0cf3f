//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus is how a host learns that session state changed: the enrollment
//! engine publishes every applied event, and observers (a persistence writer,
//! a screen refresh, a test) subscribe.
//!
//! Delivery is best-effort fan-out. The session store is the source of truth;
//! a subscriber that misses events can always re-read the session.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvError, TryRecvError};

/// A subscription to an event stream.
///
/// Each subscription gets a copy of every message published after it was
/// created (broadcast semantics). Meant to be drained by a single thread.
///
/// ```ignore
/// let subscription = bus.subscribe();
/// while let Ok(envelope) = subscription.try_recv() {
///     persist(envelope)?;
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Drain every message that is already queued.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Domain-agnostic event bus (pub/sub abstraction).
///
/// ```text
/// EnrollmentEngine (apply to session) → EventBus (publish) → observers
/// ```
///
/// Events are applied to the session **first**, then published. A failed
/// publish never rolls the session back; the caller decides whether to log
/// or retry.
///
/// Implementations must be `Send + Sync` so one bus can be shared by every
/// thread driving the engine.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    /// Publish a batch in order, stopping at the first failure.
    ///
    /// Returns how many messages went out before the failure alongside it.
    fn publish_all(&self, messages: impl IntoIterator<Item = M>) -> Result<usize, (usize, Self::Error)>
    where
        Self: Sized,
    {
        let mut sent = 0;
        for message in messages {
            self.publish(message).map_err(|err| (sent, err))?;
            sent += 1;
        }
        Ok(sent)
    }

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
