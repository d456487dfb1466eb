//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::limiter::tier::Tier;

/// Limits per lowercase HTTP method, e.g. `get = 60`.
pub type MethodLimits = BTreeMap<String, u32>;

/// `[rate_limits.public.<endpoint_type>]` tables.
pub type PublicLimits = BTreeMap<String, MethodLimits>;

/// `[rate_limits.<tier>.<endpoint_type>.<role>]` tables.
pub type RoleLimits = BTreeMap<String, BTreeMap<String, MethodLimits>>;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address, client IP trust).
    pub listener: ListenerConfig,

    /// Where allowed requests are forwarded.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Route definitions mapping path prefixes to a tier and endpoint type.
    pub routes: Vec<RouteConfig>,

    /// Rate limit tables and toggles.
    pub rate_limits: RateLimitSettings,

    /// Counter store settings.
    pub store: StoreConfig,

    /// Caller identity resolution.
    pub identity: IdentityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Take the client IP from the first `X-Forwarded-For` hop.
    /// Only enable behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            trust_forwarded_for: false,
        }
    }
}

/// Upstream application the gateway protects.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Route configuration binding a path prefix to a gate.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path prefix to match.
    pub path_prefix: String,

    /// Which gate protects the route.
    pub tier: Tier,

    /// Tag selecting the limit table within the tier.
    #[serde(default = "default_endpoint_type")]
    pub endpoint_type: String,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,

    /// Answer 401 when no caller identity was resolved.
    #[serde(default)]
    pub require_auth: bool,
}

fn default_endpoint_type() -> String {
    "general".to_string()
}

/// Rate limit tables, keyed tier → endpoint type → role → method.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Window length shared by every tier.
    pub decay_minutes: u64,

    /// Attach `X-RateLimit-*` headers to responses.
    pub add_headers: bool,

    /// Log rejected requests.
    pub log_violations: bool,

    pub public: PublicLimits,
    pub authenticated: RoleLimits,
    pub admin: RoleLimits,
}

impl RateLimitSettings {
    /// Settings with no tables at all, so every lookup hits the tier default.
    pub fn empty() -> Self {
        Self {
            public: PublicLimits::new(),
            authenticated: RoleLimits::new(),
            admin: RoleLimits::new(),
            ..Self::default()
        }
    }
}

fn methods(entries: &[(&str, u32)]) -> MethodLimits {
    entries.iter().map(|(m, n)| (m.to_string(), *n)).collect()
}

fn roles(entries: &[(&str, MethodLimits)]) -> BTreeMap<String, MethodLimits> {
    entries
        .iter()
        .map(|(r, limits)| (r.to_string(), limits.clone()))
        .collect()
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        let mut public = PublicLimits::new();
        public.insert("auth".into(), methods(&[("get", 10), ("post", 5)]));
        public.insert(
            "general".into(),
            methods(&[("get", 60), ("post", 30), ("put", 30), ("patch", 30), ("delete", 10)]),
        );
        public.insert("search".into(), methods(&[("get", 30), ("post", 30)]));

        let mut authenticated = RoleLimits::new();
        authenticated.insert(
            "general".into(),
            roles(&[
                (
                    "authenticated",
                    methods(&[("get", 100), ("post", 60), ("put", 60), ("patch", 60), ("delete", 30)]),
                ),
                (
                    "premium",
                    methods(&[("get", 300), ("post", 150), ("put", 150), ("patch", 150), ("delete", 60)]),
                ),
                (
                    "admin",
                    methods(&[("get", 500), ("post", 300), ("put", 300), ("patch", 300), ("delete", 100)]),
                ),
            ]),
        );
        authenticated.insert(
            "search".into(),
            roles(&[
                ("authenticated", methods(&[("get", 30), ("post", 30)])),
                ("premium", methods(&[("get", 50), ("post", 50)])),
                ("admin", methods(&[("get", 200), ("post", 200)])),
            ]),
        );
        authenticated.insert(
            "upload".into(),
            roles(&[
                ("authenticated", methods(&[("post", 10)])),
                ("premium", methods(&[("post", 30)])),
                ("admin", methods(&[("post", 100)])),
            ]),
        );
        authenticated.insert(
            "heavy".into(),
            roles(&[
                ("authenticated", methods(&[("get", 5), ("post", 5)])),
                ("premium", methods(&[("get", 20), ("post", 20)])),
                ("admin", methods(&[("get", 50), ("post", 50)])),
            ]),
        );

        let mut admin = RoleLimits::new();
        admin.insert(
            "general".into(),
            roles(&[(
                "admin",
                methods(&[("get", 300), ("post", 100), ("put", 100), ("patch", 100), ("delete", 50)]),
            )]),
        );
        admin.insert(
            "users".into(),
            roles(&[(
                "admin",
                methods(&[("get", 200), ("post", 50), ("put", 50), ("patch", 50), ("delete", 20)]),
            )]),
        );
        admin.insert(
            "settings".into(),
            roles(&[(
                "admin",
                methods(&[("get", 100), ("post", 20), ("put", 20), ("patch", 20)]),
            )]),
        );
        admin.insert("logs".into(), roles(&[("admin", methods(&[("get", 60)]))]));
        admin.insert(
            "reports".into(),
            roles(&[("admin", methods(&[("get", 30), ("post", 10)]))]),
        );

        Self {
            decay_minutes: 1,
            add_headers: true,
            log_violations: true,
            public,
            authenticated,
            admin,
        }
    }
}

/// What a gate does when the counter store cannot answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Let the request through without rate limit headers.
    Open,
    /// Answer 503.
    Closed,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FailureModes {
    pub public: FailureMode,
    pub authenticated: FailureMode,
    pub admin: FailureMode,
}

impl FailureModes {
    pub fn for_tier(&self, tier: Tier) -> FailureMode {
        match tier {
            Tier::Public => self.public,
            Tier::Authenticated => self.authenticated,
            Tier::Admin => self.admin,
        }
    }
}

impl Default for FailureModes {
    fn default() -> Self {
        Self {
            public: FailureMode::Open,
            authenticated: FailureMode::Open,
            admin: FailureMode::Closed,
        }
    }
}

/// Counter store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Upper bound for one store round-trip in milliseconds.
    pub timeout_ms: u64,

    /// How often expired windows are purged, in seconds.
    pub sweep_interval_secs: u64,

    pub failure_mode: FailureModes,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 250,
            sweep_interval_secs: 60,
            failure_mode: FailureModes::default(),
        }
    }
}

/// Identity headers written by an upstream authenticator.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Read the caller from the headers below. Only enable when an
    /// authenticator in front of the gateway sets and strips them.
    pub trust_forwarded_headers: bool,

    pub id_header: String,
    pub role_header: String,
    /// Comma-separated role set.
    pub roles_header: String,
    pub admin_header: String,
    pub premium_header: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            trust_forwarded_headers: false,
            id_header: "x-auth-user-id".to_string(),
            role_header: "x-auth-user-role".to_string(),
            roles_header: "x-auth-user-roles".to_string(),
            admin_header: "x-auth-user-admin".to_string(),
            premium_header: "x-auth-user-premium".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
