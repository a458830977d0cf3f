//! Studio user identity (admin staff and clients).

use serde::{Deserialize, Serialize};

use studio_core::{DomainError, DomainResult, UserId};

// ─────────────────────────────────────────────────────────────────────────────
// Role
// ─────────────────────────────────────────────────────────────────────────────

/// What a user is allowed to do in the studio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Studio staff: manages classes, users, finances.
    Admin,
    /// A customer who books classes.
    Client,
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Role::Admin => write!(f, "ADMIN"),
            Role::Client => write!(f, "CLIENT"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Membership
// ─────────────────────────────────────────────────────────────────────────────

/// Membership standing of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Membership {
    #[default]
    Active,
    Inactive,
}

impl Membership {
    pub fn is_active(self) -> bool {
        matches!(self, Membership::Active)
    }

    /// The opposite standing (admin toggle).
    pub fn toggled(self) -> Self {
        match self {
            Membership::Active => Membership::Inactive,
            Membership::Inactive => Membership::Active,
        }
    }
}

impl core::fmt::Display for Membership {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Membership::Active => write!(f, "active"),
            Membership::Inactive => write!(f, "inactive"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

/// A studio user.
///
/// # Invariants
/// - `name` is non-empty.
/// - `email` contains exactly one `@` with text on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub membership: Membership,
}

impl User {
    /// Build a validated user with an active membership.
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> DomainResult<Self> {
        let user = Self {
            id,
            name: name.into(),
            email: email.into(),
            role,
            avatar_url: None,
            membership: Membership::Active,
        };
        user.validate()?;
        Ok(user)
    }

    pub fn with_membership(mut self, membership: Membership) -> Self {
        self.membership = membership;
        self
    }

    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("user name must not be empty"));
        }

        let mut parts = self.email.split('@');
        let valid_email = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty()
        );
        if !valid_email {
            return Err(DomainError::validation(format!(
                "invalid email address: {}",
                self.email
            )));
        }

        Ok(())
    }
}
