//! `studio-core`: identifiers, errors and aggregate traits shared by every studio crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot};
pub use error::{DomainError, DomainResult};
pub use id::{BookingId, SessionId, TeacherId, UserId};
