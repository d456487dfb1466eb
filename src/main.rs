//! Tiered rate-limiting gateway.
//!
//! ```text
//!     Client ──▶ identity ──▶ route ──▶ tier gate ──▶ upstream
//!                                          │
//!                                   counter store
//!                                 (shared, in-process)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use rate_gate::config::watcher::ConfigWatcher;
use rate_gate::config::{parse_config, ServiceConfig};
use rate_gate::lifecycle::signals::handle_signals;
use rate_gate::observability::{logging, metrics};
use rate_gate::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "rate-gate")]
#[command(about = "Tiered rate-limiting gateway", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let (config, watcher, config_updates) = match &args.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            let config = parse_config(&content)?;
            let (watcher, updates) = ConfigWatcher::new(path);
            watcher.mark_applied(content);
            (config, Some(watcher), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (ServiceConfig::default(), None, updates)
        }
    };

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rate-gate starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        routes = config.routes.len(),
        decay_minutes = config.rate_limits.decay_minutes,
        "Configuration loaded"
    );

    // Keep the file watcher alive for the whole run.
    let _fs_watcher = match &watcher {
        Some(w) => match w.clone().run() {
            Ok(fs_watcher) => Some(fs_watcher),
            Err(e) => {
                tracing::error!(error = %e, "Config watcher failed to start, hot reload disabled");
                None
            }
        },
        None => None,
    };

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config.clone());

    if config.admin.enabled {
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");
        let admin = server.admin_router();
        let mut admin_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let served = axum::serve(admin_listener, admin)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin API stopped");
            }
        });
    }

    let signals = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = handle_signals(signals, watcher).await {
            tracing::error!(error = %e, "Failed to install signal handlers");
        }
    });

    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
