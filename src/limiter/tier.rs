//! Gate tiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which gate, and which limit table, protects a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Public,
    Authenticated,
    Admin,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Public, Tier::Authenticated, Tier::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Public => "public",
            Tier::Authenticated => "authenticated",
            Tier::Admin => "admin",
        }
    }

    /// `type` discriminator in 429 bodies, also the counter key prefix.
    pub fn limit_type(&self) -> &'static str {
        match self {
            Tier::Public => "public_rate_limit",
            Tier::Authenticated => "authenticated_rate_limit",
            Tier::Admin => "admin_rate_limit",
        }
    }

    /// Limit used when no table entry matches.
    pub fn default_max_attempts(&self) -> u32 {
        match self {
            Tier::Public => 60,
            Tier::Authenticated | Tier::Admin => 100,
        }
    }

    pub fn violation_message(&self) -> &'static str {
        match self {
            Tier::Public => "Too many requests. Please try again later.",
            Tier::Authenticated => "Rate limit exceeded. Please slow down your requests.",
            Tier::Admin => "Admin rate limit exceeded. Please wait before retrying.",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the principal segment of a counter key is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Client IP plus a short user-agent hash.
    ClientFingerprint,
    /// Caller id, or `guest` without one.
    PrincipalId,
}

/// Per-tier gate behaviour, expressed as data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierConfig {
    pub tier: Tier,
    /// Reject non-admin callers with 403 before any counting.
    pub requires_admin: bool,
    pub key_strategy: KeyStrategy,
}

impl TierConfig {
    pub fn public() -> Self {
        Self {
            tier: Tier::Public,
            requires_admin: false,
            key_strategy: KeyStrategy::ClientFingerprint,
        }
    }

    pub fn authenticated() -> Self {
        Self {
            tier: Tier::Authenticated,
            requires_admin: false,
            key_strategy: KeyStrategy::PrincipalId,
        }
    }

    pub fn admin() -> Self {
        Self {
            tier: Tier::Admin,
            requires_admin: true,
            key_strategy: KeyStrategy::PrincipalId,
        }
    }

    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Public => Self::public(),
            Tier::Authenticated => Self::authenticated(),
            Tier::Admin => Self::admin(),
        }
    }
}
