//! axum middleware binding a gate and an endpoint type to a route.
//!
//! ```rust,ignore
//! let search = RouteLimit::new(gates.authenticated.clone(), "search");
//! let app = Router::new()
//!     .route("/search", get(search_handler))
//!     .route_layer(middleware::from_fn_with_state(search, rate_limit_middleware));
//! ```

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::limiter::gate::RateLimitGate;

/// Middleware state: which gate, and the endpoint type it is applied with.
#[derive(Clone)]
pub struct RouteLimit {
    pub gate: Arc<RateLimitGate>,
    pub endpoint_type: Arc<str>,
}

impl RouteLimit {
    pub fn new(gate: Arc<RateLimitGate>, endpoint_type: impl Into<Arc<str>>) -> Self {
        Self {
            gate,
            endpoint_type: endpoint_type.into(),
        }
    }
}

pub async fn rate_limit_middleware(
    State(limit): State<RouteLimit>,
    request: Request<Body>,
    next: Next,
) -> Response {
    limit
        .gate
        .handle(request, &limit.endpoint_type, |req| next.run(req))
        .await
}
