//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → shared via ArcSwap to the gates and the router
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<ServiceConfig>
//!     → next request resolves its policy against the new tables
//! ```
//!
//! Counters live in the store and survive a reload. Rate limit tables,
//! routes, identity headers, upstream address, store timeout and sweep
//! interval follow reloads. Bind addresses and `timeouts.request_secs`
//! need a restart.

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

use std::sync::Arc;

use arc_swap::ArcSwap;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, FailureMode, IdentityConfig, ObservabilityConfig, RateLimitSettings,
    RouteConfig, ServiceConfig, StoreConfig,
};

/// Live configuration shared by the gates, the router and the admin API.
pub type SharedConfig = Arc<ArcSwap<ServiceConfig>>;

pub fn shared(config: ServiceConfig) -> SharedConfig {
    Arc::new(ArcSwap::from_pointee(config))
}
