//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGINT everywhere, SIGTERM on unix)
//! - Translate the first signal into a `Shutdown` trigger
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Signals are only one producer of the stop request; tests trigger the
//!   same `Shutdown` handle directly

use tokio::task::JoinHandle;

use crate::lifecycle::{Shutdown, ShutdownSignal};

/// Wait for SIGINT or SIGTERM and return the signal name.
pub async fn wait_for_signal() -> &'static str {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

/// Trigger `shutdown` when the process receives a stop signal.
///
/// The task exits early once `released` fires.
pub fn forward_signals(shutdown: Shutdown, mut released: ShutdownSignal) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            signal = wait_for_signal() => {
                tracing::info!(signal, "Shutdown signal received");
                shutdown.trigger();
            }
            _ = released.wait() => {
                tracing::debug!("Signal listener released");
            }
        }
    })
}
