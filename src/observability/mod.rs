//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gates, router, upstream client produce:
//!     → logging.rs (structured log events, violation records)
//!     → metrics.rs (decision counters, upstream latency)
//!
//! Request IDs (x-request-id) are attached by the HTTP layer and appear
//! on every access span.
//! ```

pub mod logging;
pub mod metrics;
