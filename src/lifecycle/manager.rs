//! Server lifecycle orchestration.
//!
//! # Responsibilities
//! - Bind the listener and run the accept loop on a background task
//! - Wait for the stop request or an abnormal listener exit
//! - Drain connections within a deadline, then abort the rest
//! - Notify hooks and publish state/events for every transition
//!
//! # Design Decisions
//! - Fail fast: a bind failure is reported once and never retried
//! - `shutdown` consumes the manager, so completion fires exactly once
//! - Three signals: `stop` (caller), `drain` (stop accepting, finish
//!   in-flight work), `force` (abort at the deadline)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::lifecycle::state::Shared;
use crate::lifecycle::{
    LifecycleEvent, LifecycleHooks, LifecycleState, NoopHooks, Shutdown, ShutdownReport,
    ShutdownSignal, StopReason,
};
use crate::net::{ConnectionSettings, DrainOutcome, Listener, ServeError};

/// Errors returned by [`LifecycleManager::start`].
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("server already started (state: {0})")]
    AlreadyStarted(LifecycleState),
    #[error(transparent)]
    Serve(#[from] ServeError),
}

/// Owns the listening socket and the start/stop sequence of one server run.
pub struct LifecycleManager {
    config: ServerConfig,
    shared: Arc<Shared>,
    stop: ShutdownSignal,
    drain: Shutdown,
    force: Shutdown,
    task: Option<JoinHandle<Result<DrainOutcome, ServeError>>>,
}

impl LifecycleManager {
    /// Create a manager that stops when `stop` fires.
    pub fn new(config: ServerConfig, stop: ShutdownSignal) -> Self {
        Self {
            config,
            shared: Arc::new(Shared::new(Arc::new(NoopHooks))),
            stop,
            drain: Shutdown::new(),
            force: Shutdown::new(),
            task: None,
        }
    }

    /// Replace the lifecycle hooks. Only effective before [`start`](Self::start).
    pub fn with_hooks(mut self, hooks: impl LifecycleHooks + 'static) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.set_hooks(Arc::new(hooks));
        } else {
            tracing::warn!("Hooks ignored: server already started");
        }
        self
    }

    /// Fires when shutdown begins. Handlers use it to end long transfers.
    pub fn drain_signal(&self) -> ShutdownSignal {
        self.drain.subscribe()
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.state()
    }

    pub fn watch_state(&self) -> watch::Receiver<LifecycleState> {
        self.shared.watch()
    }

    pub fn events(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.shared.events()
    }

    /// Bind the listener and start accepting connections in the background.
    ///
    /// On bind failure the abnormal-stop hook runs and the manager moves to
    /// `ShuttingDown`; call [`shutdown`](Self::shutdown) to finish.
    pub async fn start(&mut self, app: Router) -> Result<SocketAddr, LifecycleError> {
        let state = self.shared.state();
        if state != LifecycleState::Created {
            return Err(LifecycleError::AlreadyStarted(state));
        }

        let listener = match Listener::bind(&self.config).await {
            Ok(listener) => listener,
            Err(e) => {
                self.shared.abnormal_stop(&e);
                return Err(e.into());
            }
        };
        let addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(source) => {
                let e = ServeError::Bind {
                    addr: self.config.bind_address(),
                    source,
                };
                self.shared.abnormal_stop(&e);
                return Err(e.into());
            }
        };

        self.shared.advance(LifecycleState::Running);
        self.shared.publish(LifecycleEvent::Started { addr });
        tracing::info!(address = %addr, "Server running");

        let shared = Arc::clone(&self.shared);
        let settings = ConnectionSettings::from(&self.config);
        let drain = self.drain.subscribe();
        let force = self.force.subscribe();
        self.task = Some(tokio::spawn(async move {
            let result = listener.serve(app, settings, drain, force).await;
            if let Err(e) = &result {
                shared.abnormal_stop(e);
            }
            result
        }));

        Ok(addr)
    }

    /// Block until the stop signal fires or the server stops abnormally.
    pub async fn await_stop(&mut self) -> StopReason {
        let mut state = self.shared.watch();
        tokio::select! {
            biased;
            _ = state.wait_for(|s| *s >= LifecycleState::ShuttingDown) => StopReason::Abnormal,
            _ = self.stop.wait() => {
                tracing::info!("Stop requested");
                self.shared.publish(LifecycleEvent::StopRequested);
                StopReason::Requested
            }
        }
    }

    /// Stop accepting, drain in-flight connections until `deadline`, then
    /// abort whatever is left.
    pub async fn shutdown(mut self, deadline: Duration) -> ShutdownReport {
        self.shared.advance(LifecycleState::ShuttingDown);
        self.drain.trigger();
        let started = Instant::now();
        tracing::info!(deadline_ms = deadline.as_millis() as u64, "Shutting down");

        let outcome = match self.task.take() {
            None => DrainOutcome {
                forced: false,
                aborted: 0,
            },
            Some(mut task) => match tokio::time::timeout(deadline, &mut task).await {
                Ok(joined) => Self::drain_outcome(joined),
                Err(_) => {
                    tracing::warn!("Shutdown deadline elapsed, aborting connections");
                    self.force.trigger();
                    Self::drain_outcome(task.await)
                }
            },
        };

        let report = ShutdownReport {
            forced: outcome.forced,
            aborted_connections: outcome.aborted,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            forced = report.forced,
            aborted_connections = report.aborted_connections,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Shutdown complete"
        );
        self.shared.shutdown_complete(&report);
        report
    }

    /// Start, wait for the stop signal, and shut down within the configured
    /// shutdown timeout.
    pub async fn run(mut self, app: Router) -> Result<ShutdownReport, LifecycleError> {
        let deadline = self.config.shutdown_timeout();
        if let Err(e) = self.start(app).await {
            self.shutdown(deadline).await;
            return Err(e);
        }
        self.await_stop().await;
        Ok(self.shutdown(deadline).await)
    }

    fn drain_outcome(
        joined: Result<Result<DrainOutcome, ServeError>, tokio::task::JoinError>,
    ) -> DrainOutcome {
        match joined {
            Ok(Ok(outcome)) => outcome,
            // Already reported through the abnormal-stop path.
            Ok(Err(_)) => DrainOutcome {
                forced: false,
                aborted: 0,
            },
            Err(e) => {
                tracing::error!(error = %e, "Accept loop task failed");
                DrainOutcome {
                    forced: false,
                    aborted: 0,
                }
            }
        }
    }
}
