//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{parse_config, ConfigError};
use crate::config::schema::ServiceConfig;

/// Re-reads the configuration file and publishes validated updates.
///
/// Unchanged file contents are not republished; an invalid file is logged
/// and the running configuration stays in place.
#[derive(Clone)]
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ServiceConfig>,
    last_applied: Arc<Mutex<Option<String>>>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ServiceConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
                last_applied: Arc::new(Mutex::new(None)),
            },
            update_rx,
        )
    }

    /// Record the contents the service started with.
    pub fn mark_applied(&self, content: String) {
        if let Ok(mut last) = self.last_applied.lock() {
            *last = Some(content);
        }
    }

    /// Load the file now and publish it if it changed and validates.
    pub fn reload_now(&self) -> Result<bool, ConfigError> {
        let content = std::fs::read_to_string(&self.path)?;
        {
            let last = self
                .last_applied
                .lock()
                .map_err(|_| std::io::Error::other("reload state poisoned"))?;
            if last.as_deref() == Some(content.as_str()) {
                return Ok(false);
            }
        }

        let config = parse_config(&content)?;
        if self.update_tx.send(config).is_err() {
            tracing::debug!("Config update receiver dropped");
            return Ok(false);
        }
        self.mark_applied(content);
        Ok(true)
    }

    /// Start watching the file in a background thread.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let reloader = self.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    match reloader.reload_now() {
                        Ok(true) => tracing::info!(path = ?reloader.path, "Configuration reloaded"),
                        Ok(false) => {}
                        Err(e) => tracing::error!(
                            error = %e,
                            "Failed to reload config, keeping current configuration"
                        ),
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}
