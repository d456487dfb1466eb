//! Client helpers for services behind rate-gate.

pub mod client;

pub use client::{ClientError, Denial, GatewayClient, RateLimitHeaders};
