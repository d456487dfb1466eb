//! In-process counter store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::store::clock::{Clock, SystemClock};
use crate::store::{Attempt, CounterStore, StoreError};

/// Attempt window for one key. Times are epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub count: u64,
    pub started_at: u64,
    pub expires_at: u64,
}

impl Window {
    fn open(now: u64, decay: Duration) -> Self {
        Self {
            count: 0,
            started_at: now,
            expires_at: now.saturating_add(decay_secs(decay)),
        }
    }

    fn is_live(&self, now: u64) -> bool {
        now < self.expires_at
    }

    fn available_in(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now)
    }
}

/// Windows shorter than a second would expire before anyone could read them.
fn decay_secs(decay: Duration) -> u64 {
    decay.as_secs().max(1)
}

/// Counter store backed by a concurrent map.
///
/// Expired windows are ignored on read and dropped on the next write to
/// the same key. [`MemoryStore::sweep`] removes the rest.
#[derive(Clone)]
pub struct MemoryStore {
    windows: Arc<DashMap<String, Window>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Snapshot of the live window for `key`.
    pub fn window(&self, key: &str) -> Option<Window> {
        let now = self.clock.now_secs();
        self.windows
            .get(key)
            .map(|w| *w.value())
            .filter(|w| w.is_live(now))
    }

    /// Number of tracked keys, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Drop every expired window. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_secs();
        let before = self.windows.len();
        self.windows.retain(|_, w| w.is_live(now));
        before.saturating_sub(self.windows.len())
    }

    /// Run [`MemoryStore::sweep`] until shutdown fires. `interval` is
    /// re-read before every wait.
    pub fn spawn_sweeper<F>(&self, interval: F, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()>
    where
        F: Fn() -> Duration + Send + 'static,
    {
        let store = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval()) => {
                        let removed = store.sweep();
                        if removed > 0 {
                            tracing::debug!(removed, remaining = store.len(), "Swept expired rate limit windows");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Counter sweeper stopping");
                        break;
                    }
                }
            }
        })
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn attempts(&self, key: &str) -> Result<u64, StoreError> {
        Ok(self.window(key).map(|w| w.count).unwrap_or(0))
    }

    async fn hit(&self, key: &str, decay: Duration) -> Result<u64, StoreError> {
        let now = self.clock.now_secs();
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| Window::open(now, decay));
        if !entry.is_live(now) {
            *entry = Window::open(now, decay);
        }
        entry.count += 1;
        Ok(entry.count)
    }

    async fn available_in(&self, key: &str) -> Result<u64, StoreError> {
        let now = self.clock.now_secs();
        Ok(self.window(key).map(|w| w.available_in(now)).unwrap_or(0))
    }

    async fn clear(&self, key: &str) -> Result<(), StoreError> {
        self.windows.remove(key);
        Ok(())
    }

    /// Check and increment under the key's shard lock.
    async fn attempt(
        &self,
        key: &str,
        max_attempts: u64,
        decay: Duration,
    ) -> Result<Attempt, StoreError> {
        let now = self.clock.now_secs();
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| Window::open(now, decay));
        if !entry.is_live(now) {
            *entry = Window::open(now, decay);
        }

        if entry.count >= max_attempts {
            return Ok(Attempt::Exceeded {
                count: entry.count,
                available_in: entry.available_in(now),
            });
        }

        entry.count += 1;
        Ok(Attempt::Counted {
            count: entry.count,
            available_in: entry.available_in(now),
        })
    }
}
