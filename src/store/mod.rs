//! Counter store subsystem.
//!
//! # Data Flow
//! ```text
//! RateLimitGate
//!     → TimedStore (bounds every round-trip)
//!     → CounterStore impl (MemoryStore, or a networked cache)
//!     → per-key Window { count, started_at, expires_at }
//! ```
//!
//! The store owns all counter state. The gate only talks to it through the
//! operations on [`CounterStore`]. Expiry is store-managed: a window vanishes
//! once `decay` has elapsed since its first hit.

pub mod clock;
pub mod memory;
pub mod timed;

use std::time::Duration;

use async_trait::async_trait;

pub use clock::{Clock, ManualClock, SystemClock};
pub use memory::MemoryStore;
pub use timed::TimedStore;

/// Errors surfaced by a counter store round-trip.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),

    #[error("counter store did not answer within {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Unavailable(_) => "unavailable",
            StoreError::Timeout(_) => "timeout",
        }
    }
}

/// Result of a check-and-increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// The hit was recorded; `count` is the post-increment value.
    Counted { count: u64, available_in: u64 },
    /// The key was already at or over the limit; nothing was recorded.
    Exceeded { count: u64, available_in: u64 },
}

impl Attempt {
    pub fn count(&self) -> u64 {
        match *self {
            Attempt::Counted { count, .. } | Attempt::Exceeded { count, .. } => count,
        }
    }

    pub fn available_in(&self) -> u64 {
        match *self {
            Attempt::Counted { available_in, .. } | Attempt::Exceeded { available_in, .. } => {
                available_in
            }
        }
    }
}

/// Key-value attempt counters with per-key expiry.
///
/// Implementations must be safe to share between request workers.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Current attempt count for `key`, 0 when no window is active.
    async fn attempts(&self, key: &str) -> Result<u64, StoreError>;

    /// Record one attempt. Opens a window of length `decay` when none is
    /// active. Returns the post-increment count.
    async fn hit(&self, key: &str, decay: Duration) -> Result<u64, StoreError>;

    /// Seconds until the active window expires, 0 when no window is active.
    async fn available_in(&self, key: &str) -> Result<u64, StoreError>;

    /// Drop the window for `key`.
    async fn clear(&self, key: &str) -> Result<(), StoreError>;

    /// Attempts left before `max_attempts` is reached.
    async fn retries_left(&self, key: &str, max_attempts: u64) -> Result<u64, StoreError> {
        let attempts = self.attempts(key).await?;
        Ok(max_attempts.saturating_sub(attempts))
    }

    async fn too_many_attempts(&self, key: &str, max_attempts: u64) -> Result<bool, StoreError> {
        Ok(self.attempts(key).await? >= max_attempts)
    }

    /// Check `key` against `max_attempts` and record a hit when below it.
    ///
    /// This default is a read followed by a separate write, so concurrent
    /// callers on one key can overshoot `max_attempts`. Stores that can lock
    /// a key should override it with a single atomic step.
    async fn attempt(
        &self,
        key: &str,
        max_attempts: u64,
        decay: Duration,
    ) -> Result<Attempt, StoreError> {
        let current = self.attempts(key).await?;
        if current >= max_attempts {
            let available_in = self.available_in(key).await?;
            return Ok(Attempt::Exceeded {
                count: current,
                available_in,
            });
        }
        let count = self.hit(key, decay).await?;
        let available_in = self.available_in(key).await?;
        Ok(Attempt::Counted {
            count,
            available_in,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Bare store that only implements the required operations, so the
    /// trait's default methods are what gets exercised.
    #[derive(Default)]
    struct PlainStore {
        counts: Mutex<HashMap<String, u64>>,
    }

    #[async_trait]
    impl CounterStore for PlainStore {
        async fn attempts(&self, key: &str) -> Result<u64, StoreError> {
            Ok(*self.counts.lock().unwrap().get(key).unwrap_or(&0))
        }

        async fn hit(&self, key: &str, _decay: Duration) -> Result<u64, StoreError> {
            let mut counts = self.counts.lock().unwrap();
            let count = counts.entry(key.to_string()).or_insert(0);
            *count += 1;
            Ok(*count)
        }

        async fn available_in(&self, _key: &str) -> Result<u64, StoreError> {
            Ok(42)
        }

        async fn clear(&self, key: &str) -> Result<(), StoreError> {
            self.counts.lock().unwrap().remove(key);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_default_attempt_stops_counting_at_limit() {
        let store = PlainStore::default();
        let decay = Duration::from_secs(60);

        for expected in 1..=3 {
            let outcome = store.attempt("k", 3, decay).await.unwrap();
            assert_eq!(
                outcome,
                Attempt::Counted {
                    count: expected,
                    available_in: 42
                }
            );
        }

        let outcome = store.attempt("k", 3, decay).await.unwrap();
        assert_eq!(
            outcome,
            Attempt::Exceeded {
                count: 3,
                available_in: 42
            }
        );
        assert_eq!(store.attempts("k").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_retries_left_saturates() {
        let store = PlainStore::default();
        let decay = Duration::from_secs(60);
        assert_eq!(store.retries_left("k", 2).await.unwrap(), 2);
        store.hit("k", decay).await.unwrap();
        store.hit("k", decay).await.unwrap();
        store.hit("k", decay).await.unwrap();
        assert_eq!(store.retries_left("k", 2).await.unwrap(), 0);
        assert!(store.too_many_attempts("k", 2).await.unwrap());
    }
}
