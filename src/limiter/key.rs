//! Counter key construction.
//!
//! Keys look like `{tier}_rate_limit:{endpoint_type}:{principal}`.

use std::fmt;
use std::net::IpAddr;

use sha2::{Digest, Sha256};

use crate::identity::Principal;
use crate::limiter::tier::{KeyStrategy, Tier};

/// Hex characters of the user-agent digest kept in public keys.
const UA_HASH_LEN: usize = 8;

pub const GUEST: &str = "guest";

/// Counter key for one (tier, endpoint type, principal) combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    pub fn new(tier: Tier, endpoint_type: &str, principal: &str) -> Self {
        Self(format!("{}:{}:{}", tier.limit_type(), endpoint_type, principal))
    }

    /// Build the key for a request according to the tier's strategy.
    pub fn for_request(
        tier: Tier,
        strategy: KeyStrategy,
        endpoint_type: &str,
        ip: IpAddr,
        user_agent: Option<&str>,
        principal: Option<&dyn Principal>,
    ) -> Self {
        let segment = match strategy {
            KeyStrategy::ClientFingerprint => client_fingerprint(ip, user_agent),
            KeyStrategy::PrincipalId => principal
                .map(|p| p.id())
                .unwrap_or_else(|| GUEST.to_string()),
        };
        Self::new(tier, endpoint_type, &segment)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `{ip}|{first 8 hex chars of sha256(user agent)}`.
///
/// A missing user agent hashes as the empty string.
pub fn client_fingerprint(ip: IpAddr, user_agent: Option<&str>) -> String {
    let digest = Sha256::digest(user_agent.unwrap_or_default().as_bytes());
    let hash = hex::encode(digest);
    format!("{}|{}", ip, &hash[..UA_HASH_LEN])
}
