//! OS signal handling.
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP triggers config reload, not shutdown

use crate::config::watcher::ConfigWatcher;
use crate::lifecycle::Shutdown;

/// Wait for SIGINT/SIGTERM and trigger `shutdown`. SIGHUP re-reads the
/// configuration through `watcher`, when there is one.
#[cfg(unix)]
pub async fn handle_signals(shutdown: Shutdown, watcher: Option<ConfigWatcher>) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("SIGINT received");
                break;
            }
            _ = terminate.recv() => {
                tracing::info!("SIGTERM received");
                break;
            }
            _ = hangup.recv() => reload(watcher.as_ref()),
        }
    }

    shutdown.trigger();
    Ok(())
}

#[cfg(not(unix))]
pub async fn handle_signals(shutdown: Shutdown, _watcher: Option<ConfigWatcher>) -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl+C received");
    shutdown.trigger();
    Ok(())
}

#[cfg_attr(not(unix), allow(dead_code))]
fn reload(watcher: Option<&ConfigWatcher>) {
    let Some(watcher) = watcher else {
        tracing::warn!("SIGHUP received but no config file is in use");
        return;
    };
    match watcher.reload_now() {
        Ok(true) => tracing::info!("Configuration reloaded on SIGHUP"),
        Ok(false) => tracing::info!("Configuration unchanged"),
        Err(e) => tracing::error!(error = %e, "Reload failed, keeping current configuration"),
    }
}
