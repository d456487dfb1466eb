//! Round-trip deadline for counter store calls.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::store::{Attempt, CounterStore, StoreError};

/// Where the deadline comes from. Read once per call.
pub type TimeoutSource = Arc<dyn Fn() -> Duration + Send + Sync>;

/// Wraps a store so that no call blocks longer than the current timeout.
pub struct TimedStore<S> {
    inner: S,
    timeout: TimeoutSource,
}

impl<S> TimedStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self::with_source(inner, Arc::new(move || timeout))
    }

    /// Deadline re-read on every call, e.g. from a reloadable config.
    pub fn with_source(inner: S, timeout: TimeoutSource) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let timeout = (self.timeout)();
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(timeout)),
        }
    }
}

#[async_trait]
impl<S: CounterStore> CounterStore for TimedStore<S> {
    async fn attempts(&self, key: &str) -> Result<u64, StoreError> {
        self.bounded(self.inner.attempts(key)).await
    }

    async fn hit(&self, key: &str, decay: Duration) -> Result<u64, StoreError> {
        self.bounded(self.inner.hit(key, decay)).await
    }

    async fn available_in(&self, key: &str) -> Result<u64, StoreError> {
        self.bounded(self.inner.available_in(key)).await
    }

    async fn clear(&self, key: &str) -> Result<(), StoreError> {
        self.bounded(self.inner.clear(key)).await
    }

    async fn retries_left(&self, key: &str, max_attempts: u64) -> Result<u64, StoreError> {
        self.bounded(self.inner.retries_left(key, max_attempts)).await
    }

    async fn attempt(
        &self,
        key: &str,
        max_attempts: u64,
        decay: Duration,
    ) -> Result<Attempt, StoreError> {
        self.bounded(self.inner.attempt(key, max_attempts, decay)).await
    }
}
