//! User identity store.
//!
//! The enrollment engine only needs to know whether a user exists and whether
//! their membership is active; everything else about a user is host data.

pub mod directory;
pub mod user;

pub use directory::{InMemoryUserDirectory, UserDirectory};
pub use user::{Membership, Role, User};
