//! Role classification.
//!
//! # Responsibilities
//! - Map a resolved caller (or none) to exactly one [`Role`]
//! - Priority: admin > premium > authenticated
//!
//! A missing caller classifies as `Authenticated`. That bucket only drives
//! the policy lookup; counter keys substitute `guest` on their own.

use std::fmt;

use crate::identity::principal::Principal;

const ADMIN_ROLES: &[&str] = &["admin", "administrator"];
const PREMIUM_ROLES: &[&str] = &["premium", "pro", "paid"];

/// Policy bucket for a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Premium,
    Authenticated,
}

impl Role {
    /// Key used in the `rate_limits` tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Premium => "premium",
            Role::Authenticated => "authenticated",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a caller into a [`Role`].
pub fn classify(principal: Option<&dyn Principal>) -> Role {
    match principal {
        Some(p) if is_admin(p) => Role::Admin,
        Some(p) if is_premium(p) => Role::Premium,
        _ => Role::Authenticated,
    }
}

/// Any of: role field in [`ADMIN_ROLES`], admin flag, or capability hook.
pub fn is_admin(principal: &dyn Principal) -> bool {
    matches_any(principal, ADMIN_ROLES) || principal.is_admin_flag()
}

pub fn is_premium(principal: &dyn Principal) -> bool {
    matches_any(principal, PREMIUM_ROLES) || principal.is_premium_flag()
}

fn matches_any(principal: &dyn Principal, names: &[&str]) -> bool {
    let by_field = principal
        .role()
        .map(|role| names.iter().any(|n| role.eq_ignore_ascii_case(n)))
        .unwrap_or(false);

    // The hook is only asked about the canonical name.
    by_field || principal.has_role(names[0])
}
