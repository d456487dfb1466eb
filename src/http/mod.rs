//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace span, timeout)
//!     → identity middleware (Caller into extensions)
//!     → route lookup (tier, endpoint type)
//!     → tier gate (403 / 429 / 503, or count)
//!     → forward to upstream (hyper-util client)
//!     → X-RateLimit-* headers on the way back
//! ```

pub mod request;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
