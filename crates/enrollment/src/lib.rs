//! Class enrollment and waitlist engine.
//!
//! [`EnrollmentEngine`] is the only entry point that changes a session's
//! attendees, waitlist or bookings. It composes three injected collaborators:
//!
//! - a [`SessionStore`] that serializes access per session,
//! - a [`UserDirectory`](studio_identity::UserDirectory) for identity checks,
//! - an [`EventBus`](studio_events::EventBus) that observers subscribe to.

pub mod config;
pub mod engine;
pub mod error;
pub mod store;

pub use config::EnrollmentConfig;
pub use engine::{EnrollmentEngine, NewSession, Roster};
pub use error::EnrollmentError;
pub use store::{InMemorySessionStore, SessionStore, StoreError};
