//! Tiered rate-limiting gateway library.
//!
//! Public, authenticated and admin gates share one counter store and one
//! live configuration. See [`limiter`] for the decision pipeline.

pub mod admin;
pub mod config;
pub mod http;
pub mod identity;
pub mod lifecycle;
pub mod limiter;
pub mod observability;
pub mod routing;
pub mod store;

pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
