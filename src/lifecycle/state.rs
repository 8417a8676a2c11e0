//! Lifecycle state machine, events and hooks.
//!
//! # States
//! ```text
//! Created → Running → ShuttingDown → Stopped
//! ```
//!
//! Transitions only move forward. `Created → ShuttingDown` happens when the
//! listener cannot be bound.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};

use crate::lifecycle::Shutdown;
use crate::net::ServeError;

/// Externally observable server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    Created,
    Running,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Created => "created",
            LifecycleState::Running => "running",
            LifecycleState::ShuttingDown => "shutting_down",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Why [`await_stop`](super::LifecycleManager::await_stop) returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The stop signal (OS signal or caller cancellation) fired.
    Requested,
    /// The listener failed and the server is already shutting down.
    Abnormal,
}

/// Outcome of a completed shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// The deadline elapsed and connections were aborted.
    pub forced: bool,
    /// Connections still running when the deadline elapsed.
    pub aborted_connections: usize,
    /// Time spent draining.
    pub elapsed: Duration,
}

/// Lifecycle transitions published to subscribers.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    Started { addr: SocketAddr },
    StopRequested,
    AbnormalStop { error: String },
    ShutdownComplete(ShutdownReport),
}

/// Callbacks invoked on lifecycle transitions.
///
/// Both methods default to no-ops.
pub trait LifecycleHooks: Send + Sync {
    /// The listener failed to bind or the accept loop died.
    fn on_abnormal_stop(&self, _error: &ServeError) {}

    /// Shutdown finished, cleanly or at the deadline. Called exactly once.
    fn on_shutdown_complete(&self, _report: &ShutdownReport) {}
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl LifecycleHooks for NoopHooks {}

/// Hooks that trigger a [`Shutdown`] once shutdown completes, so components
/// outside the server can observe termination.
#[derive(Debug, Clone)]
pub struct ReleaseOnComplete {
    released: Shutdown,
}

impl ReleaseOnComplete {
    pub fn new(released: Shutdown) -> Self {
        Self { released }
    }
}

impl LifecycleHooks for ReleaseOnComplete {
    fn on_abnormal_stop(&self, error: &ServeError) {
        tracing::warn!(error = %error, "Server is shutting down");
    }

    fn on_shutdown_complete(&self, _report: &ShutdownReport) {
        self.released.trigger();
    }
}

/// State shared between the manager and its accept task.
pub(crate) struct Shared {
    state: watch::Sender<LifecycleState>,
    events: broadcast::Sender<LifecycleEvent>,
    hooks: Arc<dyn LifecycleHooks>,
}

impl Shared {
    pub(crate) fn new(hooks: Arc<dyn LifecycleHooks>) -> Self {
        let (state, _) = watch::channel(LifecycleState::Created);
        let (events, _) = broadcast::channel(16);
        Self {
            state,
            events,
            hooks,
        }
    }

    pub(crate) fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub(crate) fn watch(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub(crate) fn events(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    pub(crate) fn set_hooks(&mut self, hooks: Arc<dyn LifecycleHooks>) {
        self.hooks = hooks;
    }

    /// Move to `next` if it is ahead of the current state.
    pub(crate) fn advance(&self, next: LifecycleState) -> bool {
        let advanced = self.state.send_if_modified(|current| {
            if next > *current {
                *current = next;
                true
            } else {
                false
            }
        });
        if advanced {
            tracing::debug!(state = %next, "Lifecycle transition");
        }
        advanced
    }

    pub(crate) fn publish(&self, event: LifecycleEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub(crate) fn abnormal_stop(&self, error: &ServeError) {
        tracing::error!(error = %error, "Server stopped abnormally");
        self.advance(LifecycleState::ShuttingDown);
        self.hooks.on_abnormal_stop(error);
        self.publish(LifecycleEvent::AbnormalStop {
            error: error.to_string(),
        });
    }

    pub(crate) fn shutdown_complete(&self, report: &ShutdownReport) {
        self.advance(LifecycleState::Stopped);
        self.hooks.on_shutdown_complete(report);
        self.publish(LifecycleEvent::ShutdownComplete(report.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_monotonic() {
        let shared = Shared::new(Arc::new(NoopHooks));
        assert_eq!(shared.state(), LifecycleState::Created);
        assert!(shared.advance(LifecycleState::Running));
        assert!(shared.advance(LifecycleState::ShuttingDown));
        assert!(!shared.advance(LifecycleState::Running));
        assert!(!shared.advance(LifecycleState::ShuttingDown));
        assert_eq!(shared.state(), LifecycleState::ShuttingDown);
        assert!(shared.advance(LifecycleState::Stopped));
        assert!(!shared.advance(LifecycleState::Created));
    }

    #[test]
    fn release_hook_triggers_on_completion() {
        let released = Shutdown::new();
        let shared = Shared::new(Arc::new(ReleaseOnComplete::new(released.clone())));
        assert!(!released.is_triggered());
        shared.shutdown_complete(&ShutdownReport {
            forced: true,
            aborted_connections: 1,
            elapsed: Duration::from_millis(5),
        });
        assert!(released.is_triggered());
    }

    #[test]
    fn created_can_skip_to_shutting_down() {
        let shared = Shared::new(Arc::new(NoopHooks));
        assert!(shared.advance(LifecycleState::ShuttingDown));
        assert_eq!(shared.state(), LifecycleState::ShuttingDown);
    }

    #[tokio::test]
    async fn completion_is_published() {
        let shared = Shared::new(Arc::new(NoopHooks));
        let mut events = shared.events();
        let report = ShutdownReport {
            forced: false,
            aborted_connections: 0,
            elapsed: Duration::ZERO,
        };
        shared.shutdown_complete(&report);
        assert_eq!(shared.state(), LifecycleState::Stopped);
        match events.recv().await.unwrap() {
            LifecycleEvent::ShutdownComplete(r) => assert_eq!(r, report),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
