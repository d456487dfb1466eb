//! Policy resolution.
//!
//! Lookup order, first match wins:
//! ```text
//! [tier][endpoint_type][role][method]
//! [tier][endpoint_type][role]["get"]
//! [tier]["general"][role][method]
//! tier default (60 public, 100 otherwise)
//! ```
//! The public tier has no role level. The window length is global.

use std::time::Duration;

use axum::http::Method;

use crate::config::schema::{MethodLimits, RateLimitSettings};
use crate::identity::Role;
use crate::limiter::tier::Tier;

const GENERAL: &str = "general";
const GET: &str = "get";

/// Limits applied to one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyConfig {
    pub max_attempts: u32,
    pub decay_window: Duration,
}

/// Resolve the limits for a request. Never fails.
pub fn resolve(
    settings: &RateLimitSettings,
    tier: Tier,
    endpoint_type: &str,
    role: Role,
    method: &Method,
) -> PolicyConfig {
    let method = method.as_str().to_ascii_lowercase();
    let table = |endpoint_type: &str| method_table(settings, tier, endpoint_type, role);

    let max_attempts = table(endpoint_type)
        .and_then(|m| m.get(&method).or_else(|| m.get(GET)))
        .or_else(|| table(GENERAL).and_then(|m| m.get(&method)))
        .copied()
        .unwrap_or_else(|| tier.default_max_attempts());

    PolicyConfig {
        max_attempts,
        decay_window: decay_window(settings),
    }
}

pub fn decay_window(settings: &RateLimitSettings) -> Duration {
    Duration::from_secs(settings.decay_minutes.saturating_mul(60))
}

fn method_table<'a>(
    settings: &'a RateLimitSettings,
    tier: Tier,
    endpoint_type: &str,
    role: Role,
) -> Option<&'a MethodLimits> {
    match tier {
        Tier::Public => settings.public.get(endpoint_type),
        Tier::Authenticated => settings
            .authenticated
            .get(endpoint_type)
            .and_then(|by_role| by_role.get(role.as_str())),
        Tier::Admin => settings
            .admin
            .get(endpoint_type)
            .and_then(|by_role| by_role.get(role.as_str())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Only the tables present in `raw`, no built-in defaults.
    fn settings(raw: &str) -> RateLimitSettings {
        use crate::config::schema::{PublicLimits, RoleLimits};

        #[derive(serde::Deserialize, Default)]
        #[serde(default)]
        struct Tables {
            public: PublicLimits,
            authenticated: RoleLimits,
            admin: RoleLimits,
        }
        #[derive(serde::Deserialize)]
        struct Wrapper {
            rate_limits: Tables,
        }

        let tables = toml::from_str::<Wrapper>(raw).unwrap().rate_limits;
        RateLimitSettings {
            public: tables.public,
            authenticated: tables.authenticated,
            admin: tables.admin,
            ..RateLimitSettings::empty()
        }
    }

    fn max(settings: &RateLimitSettings, tier: Tier, ty: &str, role: Role, method: Method) -> u32 {
        resolve(settings, tier, ty, role, &method).max_attempts
    }

    #[test]
    fn test_exact_match() {
        let s = settings("[rate_limits.public.auth]\npost = 5\nget = 10\n");
        assert_eq!(max(&s, Tier::Public, "auth", Role::Authenticated, Method::POST), 5);
        assert_eq!(max(&s, Tier::Public, "auth", Role::Admin, Method::GET), 10);
    }

    #[test]
    fn test_method_falls_back_to_get() {
        let s = settings("[rate_limits.authenticated.search.premium]\nget = 50\n");
        assert_eq!(
            max(&s, Tier::Authenticated, "search", Role::Premium, Method::DELETE),
            50
        );
    }

    #[test]
    fn test_falls_back_to_general_same_method() {
        let s = settings(
            "[rate_limits.admin.general.admin]\npost = 7\nget = 70\n\
             [rate_limits.admin.users.admin]\nput = 3\n",
        );
        // users has no post and no get, so general.post applies.
        assert_eq!(max(&s, Tier::Admin, "users", Role::Admin, Method::POST), 7);
        assert_eq!(max(&s, Tier::Admin, "reports", Role::Admin, Method::GET), 70);
        // general does not fall back to its own get for other methods
        assert_eq!(max(&s, Tier::Admin, "reports", Role::Admin, Method::PATCH), 100);
    }

    #[test]
    fn test_role_tables_are_separate() {
        let s = settings(
            "[rate_limits.authenticated.search.authenticated]\nget = 30\n\
             [rate_limits.authenticated.search.premium]\nget = 50\n",
        );
        assert_eq!(
            max(&s, Tier::Authenticated, "search", Role::Authenticated, Method::GET),
            30
        );
        assert_eq!(max(&s, Tier::Authenticated, "search", Role::Premium, Method::GET), 50);
        assert_eq!(max(&s, Tier::Authenticated, "search", Role::Admin, Method::GET), 100);
    }

    #[test]
    fn test_tier_defaults() {
        let s = RateLimitSettings::empty();
        assert_eq!(
            max(&s, Tier::Public, "unknown_type", Role::Authenticated, Method::POST),
            60
        );
        assert_eq!(
            max(&s, Tier::Authenticated, "unknown_type", Role::Premium, Method::POST),
            100
        );
        assert_eq!(max(&s, Tier::Admin, "logs", Role::Admin, Method::GET), 100);
    }

    #[test]
    fn test_method_compared_case_insensitively() {
        let s = settings("[rate_limits.public.search]\npost = 4\n");
        let custom = Method::from_bytes(b"post").unwrap();
        assert_eq!(max(&s, Tier::Public, "search", Role::Authenticated, custom), 4);
    }

    #[test]
    fn test_decay_window_is_global() {
        let mut s = RateLimitSettings::empty();
        s.decay_minutes = 3;
        let policy = resolve(&s, Tier::Admin, "users", Role::Admin, &Method::GET);
        assert_eq!(policy.decay_window, Duration::from_secs(180));
        let policy = resolve(&s, Tier::Public, "auth", Role::Authenticated, &Method::GET);
        assert_eq!(policy.decay_window, Duration::from_secs(180));
    }
}
