//! Download server binary.
//!
//! ```text
//!     Client ──▶ net::Listener ──▶ http router ──▶ transfer (full | throttled)
//!                     ▲                                   │
//!                     │                                   ▼
//!              lifecycle manager                     store (directory)
//!           (signals, drain, deadline)
//! ```

use std::sync::Arc;

use clap::Parser;

use download_server::cli::Cli;
use download_server::http::HttpServer;
use download_server::lifecycle::{signals, LifecycleManager, ReleaseOnComplete, Shutdown};
use download_server::observability::{logging, metrics};
use download_server::store::DirectoryStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    logging::init_logging(&config.observability)?;

    tracing::info!("download-server v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address(),
        max_connections = config.server.max_connections,
        throttle_enabled = config.throttle.enabled,
        chunk_size = config.throttle.chunk_size,
        interval_ms = config.throttle.interval_ms,
        root = %config.content.root.display(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let store = DirectoryStore::new(&config.content.root)?;

    let stop = Shutdown::new();
    let released = Shutdown::new();
    let signal_task = signals::forward_signals(stop.clone(), released.subscribe());

    let manager = LifecycleManager::new(config.server.clone(), stop.subscribe())
        .with_hooks(ReleaseOnComplete::new(released));
    let app = HttpServer::new(&config, Arc::new(store), manager.drain_signal()).into_router();

    let result = manager.run(app).await;
    let _ = signal_task.await;

    let report = result?;
    if report.forced {
        tracing::warn!(
            aborted_connections = report.aborted_connections,
            "Forced shutdown"
        );
    }
    tracing::info!("Exited");
    Ok(())
}
