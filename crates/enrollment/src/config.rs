//! Engine configuration.

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

/// Environment variable toggling the active-membership requirement.
pub const REQUIRE_ACTIVE_MEMBERSHIP_VAR: &str = "STUDIO_REQUIRE_ACTIVE_MEMBERSHIP";

/// Enrollment policy knobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollmentConfig {
    /// Reject Book/JoinWaitlist from users whose membership is inactive.
    pub require_active_membership: bool,
}

impl EnrollmentConfig {
    /// Load from process environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (used by `from_env` and tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(REQUIRE_ACTIVE_MEMBERSHIP_VAR) {
            config.require_active_membership = parse_flag(&raw)
                .with_context(|| format!("invalid value for {REQUIRE_ACTIVE_MEMBERSHIP_VAR}"))?;
        }

        Ok(config)
    }
}

fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("expected a boolean flag, got {other:?}"),
    }
}
