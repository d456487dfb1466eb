//! Rate limiting subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (route-selected tier + endpoint_type):
//!     → request.rs (method, path, IP, user agent, caller)
//!     → gate.rs (admin check, key, policy, counter)
//!         → key.rs (counter key)
//!         → policy.rs (max_attempts, decay window)
//!         → store (check-and-increment)
//!         → violation.rs (log rejected requests)
//!     → decision.rs (403 / 429 / 503 bodies, X-RateLimit-* headers)
//! ```
//!
//! One [`RateLimitGate`] type serves all three tiers; the differences live
//! in [`TierConfig`].

pub mod decision;
pub mod gate;
pub mod key;
pub mod middleware;
pub mod policy;
pub mod request;
pub mod tier;
pub mod violation;

pub use decision::{Decision, DenialBody, ErrorBody, RateLimitSnapshot, Violation};
pub use gate::{RateLimitGate, TierGates};
pub use key::RateLimitKey;
pub use middleware::{rate_limit_middleware, RouteLimit};
pub use policy::PolicyConfig;
pub use request::RequestMeta;
pub use tier::{KeyStrategy, Tier, TierConfig};
pub use violation::{TracingSink, ViolationLogger, ViolationRecord, ViolationSink};
