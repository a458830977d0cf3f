//! User directory: read-shared, write-exclusive store of user identities.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use studio_core::{DomainError, DomainResult, UserId};

use crate::user::{Membership, User};

/// Store of user identities consumed by the enrollment engine.
///
/// Implementations must be safe to share across threads.
pub trait UserDirectory: Send + Sync {
    /// Look up a user by id.
    fn get(&self, id: &UserId) -> Option<User>;

    fn contains(&self, id: &UserId) -> bool {
        self.get(id).is_some()
    }

    /// Register a new user. Fails if the id is already taken.
    fn insert(&self, user: User) -> DomainResult<()>;

    /// All users, ordered by id.
    fn list(&self) -> Vec<User>;

    /// Flip a user's membership between active and inactive.
    ///
    /// Returns the new membership.
    fn toggle_membership(&self, id: &UserId) -> DomainResult<Membership>;
}

/// In-memory user directory.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from already-validated users.
    pub fn with_users(users: impl IntoIterator<Item = User>) -> DomainResult<Self> {
        let directory = Self::new();
        for user in users {
            directory.insert(user)?;
        }
        Ok(directory)
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn get(&self, id: &UserId) -> Option<User> {
        // Writers never leave a half-updated map behind, so a poisoned lock is still readable.
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        users.get(id).cloned()
    }

    fn insert(&self, user: User) -> DomainResult<()> {
        user.validate()?;

        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if users.contains_key(&user.id) {
            return Err(DomainError::duplicate("user", &user.id));
        }

        tracing::debug!(user_id = %user.id, role = %user.role, "user registered");
        users.insert(user.id.clone(), user);
        Ok(())
    }

    fn list(&self) -> Vec<User> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    fn toggle_membership(&self, id: &UserId) -> DomainResult<Membership> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        let user = users.get_mut(id).ok_or_else(|| DomainError::not_found("user", id))?;

        user.membership = user.membership.toggled();
        tracing::info!(user_id = %id, membership = %user.membership, "membership toggled");
        Ok(user.membership)
    }
}
