//! Gate decisions and how they render as HTTP responses.

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::limiter::tier::Tier;

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Counter state reported back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub limit: u32,
    /// `max(0, limit - attempts)`.
    pub remaining: u64,
    /// Epoch seconds at which the window expires.
    pub reset_at: u64,
}

impl RateLimitSnapshot {
    pub fn new(limit: u32, attempts: u64, now: u64, available_in: u64) -> Self {
        Self {
            limit,
            remaining: u64::from(limit).saturating_sub(attempts),
            reset_at: now.saturating_add(available_in),
        }
    }

    /// Write the `X-RateLimit-*` headers.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(self.reset_at));
    }
}

/// A request over its limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub tier: Tier,
    pub limit: u32,
    /// Seconds until the window resets.
    pub retry_after: u64,
    pub snapshot: RateLimitSnapshot,
}

/// Outcome of [`RateLimitGate::evaluate`](crate::limiter::RateLimitGate::evaluate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Counted and within the limit.
    Allowed(RateLimitSnapshot),
    /// Admin gate: caller is not an admin. Nothing was counted.
    Forbidden,
    /// Over the limit. Nothing was counted.
    TooManyRequests(Violation),
    /// Store failed and the tier fails closed.
    Unavailable,
    /// Store failed and the tier fails open.
    Bypassed,
}

impl Decision {
    pub fn outcome(&self) -> &'static str {
        match self {
            Decision::Allowed(_) => "allowed",
            Decision::Forbidden => "forbidden",
            Decision::TooManyRequests(_) => "limited",
            Decision::Unavailable => "unavailable",
            Decision::Bypassed => "bypassed",
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed(_) | Decision::Bypassed)
    }
}

/// JSON body of a 403/503 rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }
}

/// JSON body of a 429.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenialBody {
    pub error: String,
    pub message: String,
    pub retry_after: u64,
    pub limit: u32,
    #[serde(rename = "type")]
    pub kind: String,
}

pub fn error_response(status: StatusCode, error: &str, message: &str) -> Response {
    (status, Json(ErrorBody::new(error, message))).into_response()
}

pub fn forbidden_response() -> Response {
    error_response(StatusCode::FORBIDDEN, "Forbidden", "Admin access required.")
}

pub fn unavailable_response() -> Response {
    error_response(
        StatusCode::SERVICE_UNAVAILABLE,
        "Service Unavailable",
        "Rate limiting is temporarily unavailable.",
    )
}

impl Violation {
    pub fn body(&self) -> DenialBody {
        DenialBody {
            error: "Too Many Requests".to_string(),
            message: self.tier.violation_message().to_string(),
            retry_after: self.retry_after,
            limit: self.limit,
            kind: self.tier.limit_type().to_string(),
        }
    }

    pub fn into_response(self, add_headers: bool) -> Response {
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(self.body())).into_response();
        let headers = response.headers_mut();
        headers.insert(header::RETRY_AFTER, HeaderValue::from(self.retry_after));
        if add_headers {
            self.snapshot.apply(headers);
        }
        response
    }
}
