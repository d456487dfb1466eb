//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (ordered route lookup)
//!     → matcher.rs (segment-aware prefix match)
//!     → Return: matched Route (tier, endpoint_type) or NoMatch
//!
//! Route compilation (startup and every reload):
//!     RouteConfig[]
//!     → sort by priority, then prefix length
//!     → freeze as immutable RouteTable behind ArcSwap
//! ```

pub mod matcher;
pub mod router;

pub use router::{Route, RouteTable};
