//! Caller identity as seen by the rate limiter.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Capabilities the limiter needs from a resolved caller.
///
/// Only `id` is required. The other checks default to "no", so an identity
/// type can expose whichever of them it actually has.
pub trait Principal: Send + Sync + fmt::Debug {
    /// Stable unique identifier, used in counter keys.
    fn id(&self) -> String;

    /// Single role field, if the identity carries one.
    fn role(&self) -> Option<&str> {
        None
    }

    fn is_admin_flag(&self) -> bool {
        false
    }

    fn is_premium_flag(&self) -> bool {
        false
    }

    /// Capability hook for identities with a role set.
    fn has_role(&self, _name: &str) -> bool {
        false
    }
}

/// Request extension carrying the resolved caller.
#[derive(Clone, Debug)]
pub struct Caller(pub Arc<dyn Principal>);

impl Caller {
    pub fn new(principal: impl Principal + 'static) -> Self {
        Self(Arc::new(principal))
    }

    pub fn principal(&self) -> &dyn Principal {
        self.0.as_ref()
    }
}

/// Plain identity record produced by the forwarded-header resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_premium: bool,
}

impl AuthenticatedUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    pub fn premium(mut self) -> Self {
        self.is_premium = true;
        self
    }
}

impl Principal for AuthenticatedUser {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    fn is_admin_flag(&self) -> bool {
        self.is_admin
    }

    fn is_premium_flag(&self) -> bool {
        self.is_premium
    }

    fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(name))
    }
}
