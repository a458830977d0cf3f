//! Domain events and the observer fan-out used by hosts.
//!
//! Aggregates describe what happened as [`Event`]s; the enrollment engine wraps
//! them in [`EventEnvelope`]s and publishes them on an [`EventBus`] after the
//! state change has been applied.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
