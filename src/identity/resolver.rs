//! Caller lookup for incoming requests.
//!
//! Authentication happens before the gateway. The resolver only reads the
//! identity an authenticator in front of it already established.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::config::schema::IdentityConfig;
use crate::config::SharedConfig;
use crate::identity::principal::{AuthenticatedUser, Caller};

/// Finds the caller behind a request, if any.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Option<Caller>;
}

/// Reads identity headers named in [`IdentityConfig`].
///
/// Always consults the live configuration, so turning trust off takes
/// effect on reload.
#[derive(Clone)]
pub struct ForwardedIdentity {
    config: SharedConfig,
}

impl ForwardedIdentity {
    pub fn new(config: SharedConfig) -> Self {
        Self { config }
    }
}

impl IdentityResolver for ForwardedIdentity {
    fn resolve(&self, headers: &HeaderMap) -> Option<Caller> {
        let config = self.config.load();
        read_forwarded(&config.identity, headers).map(Caller::new)
    }
}

/// Build a user from forwarded headers. `None` without a non-empty id header
/// or when the headers are not trusted.
pub fn read_forwarded(config: &IdentityConfig, headers: &HeaderMap) -> Option<AuthenticatedUser> {
    if !config.trust_forwarded_headers {
        return None;
    }

    let text = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    let flag = |name: &str| {
        text(name)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
    };

    let id = text(&config.id_header)?;
    Some(AuthenticatedUser {
        id: id.to_string(),
        role: text(&config.role_header).map(str::to_string),
        roles: text(&config.roles_header)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        is_admin: flag(&config.admin_header),
        is_premium: flag(&config.premium_header),
    })
}

/// Insert the resolved [`Caller`] into request extensions.
pub async fn resolve_identity_middleware(
    State(resolver): State<Arc<dyn IdentityResolver>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(caller) = resolver.resolve(request.headers()) {
        request.extensions_mut().insert(caller);
    }
    next.run(request).await
}
