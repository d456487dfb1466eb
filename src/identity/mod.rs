//! Caller identity subsystem.
//!
//! # Data Flow
//! ```text
//! Request headers
//!     → resolver.rs (IdentityResolver → Caller extension)
//!     → classifier.rs (Principal → Role: admin > premium > authenticated)
//!     → consumed by the gates for admin checks, keys and policy lookup
//! ```

pub mod classifier;
pub mod principal;
pub mod resolver;

pub use classifier::{classify, is_admin, is_premium, Role};
pub use principal::{AuthenticatedUser, Caller, Principal};
pub use resolver::{resolve_identity_middleware, ForwardedIdentity, IdentityResolver};
