//! Shutdown coordination for the server.

use std::future;
use std::sync::Arc;

use tokio::sync::watch;

/// Coordinator for a one-shot stop request.
///
/// Provides a latched signal that any number of tasks can subscribe to.
/// Subscribers created after [`Shutdown::trigger`] observe the signal
/// immediately.
#[derive(Debug, Clone)]
pub struct Shutdown {
    /// Latched flag; `true` once triggered.
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal. Repeated calls are no-ops.
    pub fn trigger(&self) {
        self.tx.send_if_modified(|triggered| !std::mem::replace(triggered, true));
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half of a [`Shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the signal is triggered.
    ///
    /// Cancel safe. If every [`Shutdown`] handle is dropped without
    /// triggering, this waits forever.
    pub async fn wait(&mut self) {
        if self.rx.wait_for(|triggered| *triggered).await.is_err() {
            future::pending::<()>().await;
        }
    }
}
