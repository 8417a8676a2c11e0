//! TCP listener implementation with backpressure.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Enforce max_connections limit via semaphore
//! - Back off when accept fails for lack of descriptors or memory
//! - Drain connections on shutdown, abort them at the deadline

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::ServerConfig;
use crate::lifecycle::ShutdownSignal;
use crate::net::connection::serve_connection;
use crate::net::{ConnectionSettings, ServeError};

/// How the drain phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainOutcome {
    /// The force signal fired before every connection finished.
    pub forced: bool,
    /// Connection tasks cancelled by the force signal.
    pub aborted: usize,
}

/// A bounded TCP listener that limits concurrent connections.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is reached,
/// new connections will wait until a slot becomes available.
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Semaphore to limit concurrent connections.
    connection_limit: Arc<Semaphore>,
}

impl Listener {
    /// Bind to the configured address with connection limits.
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServeError> {
        let addr = config.bind_address();
        let listener = TcpListener::bind(addr.as_str())
            .await
            .map_err(|source| ServeError::Bind {
                addr: addr.clone(),
                source,
            })?;

        let local_addr = listener
            .local_addr()
            .map_err(|source| ServeError::Bind { addr, source })?;

        tracing::info!(
            address = %local_addr,
            max_connections = config.max_connections,
            "Listener bound"
        );

        Ok(Self {
            inner: listener,
            connection_limit: Arc::new(Semaphore::new(config.max_connections)),
        })
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// This will wait if the connection limit has been reached.
    /// Returns the stream and a permit that must be held for the connection's lifetime.
    pub async fn accept(&self) -> io::Result<(TcpStream, SocketAddr, ConnectionPermit)> {
        // Acquire permit first (backpressure)
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| io::Error::other("connection limit closed"))?;

        let (stream, addr) = self.inner.accept().await?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, io::Error> {
        self.inner.local_addr()
    }

    /// Get current available connection slots.
    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    /// Run the accept loop until `drain` fires, then wait for in-flight
    /// connections until they finish or `force` fires.
    ///
    /// The socket is closed as soon as draining starts.
    pub async fn serve(
        self,
        app: Router,
        settings: ConnectionSettings,
        mut drain: ShutdownSignal,
        mut force: ShutdownSignal,
    ) -> Result<DrainOutcome, ServeError> {
        let mut connections = JoinSet::new();
        let mut backoff: Option<Duration> = None;

        loop {
            tokio::select! {
                _ = drain.wait() => break,
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    log_join_error(joined);
                }
                accepted = self.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        backoff = None;
                        connections.spawn(serve_connection(
                            stream,
                            peer,
                            app.clone(),
                            settings,
                            drain.clone(),
                            permit,
                        ));
                    }
                    Err(e) if is_transient(&e) => {
                        tracing::warn!(error = %e, "Transient accept error");
                    }
                    Err(e) if is_resource_exhausted(&e) => {
                        let delay = next_backoff(backoff);
                        backoff = Some(delay);
                        tracing::error!(
                            error = %e,
                            retry_in_ms = delay.as_millis() as u64,
                            in_flight = connections.len(),
                            "Accept failed, out of resources"
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = drain.wait() => break,
                        }
                    }
                    Err(e) => return Err(ServeError::Accept(e)),
                }
            }
        }

        drop(self);
        tracing::info!(in_flight = connections.len(), "Listener closed, draining connections");

        loop {
            tokio::select! {
                joined = connections.join_next() => match joined {
                    Some(joined) => log_join_error(joined),
                    None => return Ok(DrainOutcome { forced: false, aborted: 0 }),
                },
                _ = force.wait() => {
                    connections.abort_all();
                    let mut aborted = 0;
                    while let Some(joined) = connections.join_next().await {
                        match joined {
                            Err(e) if e.is_cancelled() => aborted += 1,
                            other => log_join_error(other),
                        }
                    }
                    tracing::warn!(aborted, "Drain deadline reached, connections aborted");
                    return Ok(DrainOutcome { forced: true, aborted });
                }
            }
        }
    }
}

/// Pause after the first resource-exhaustion accept error.
const MIN_ACCEPT_BACKOFF: Duration = Duration::from_millis(5);
/// Pauses double up to this cap until an accept succeeds.
const MAX_ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Errors about a single failed handshake; accept again immediately.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
    )
}

/// Out of file descriptors or kernel memory. Accepting again right away would
/// spin, so the loop pauses first.
fn is_resource_exhausted(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::OutOfMemory {
        return true;
    }
    match e.raw_os_error() {
        Some(code) => RESOURCE_ERRNOS.contains(&code),
        None => false,
    }
}

// ENOMEM, ENFILE, EMFILE, ENOBUFS
#[cfg(target_os = "linux")]
const RESOURCE_ERRNOS: &[i32] = &[12, 23, 24, 105];
#[cfg(all(unix, not(target_os = "linux")))]
const RESOURCE_ERRNOS: &[i32] = &[12, 23, 24, 55];
// WSAEMFILE, WSAENOBUFS
#[cfg(not(unix))]
const RESOURCE_ERRNOS: &[i32] = &[10024, 10055];

fn next_backoff(current: Option<Duration>) -> Duration {
    match current {
        None => MIN_ACCEPT_BACKOFF,
        Some(delay) => (delay * 2).min(MAX_ACCEPT_BACKOFF),
    }
}

fn log_join_error(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            tracing::error!(error = %e, "Connection task panicked");
        }
    }
}

/// A permit representing a connection slot.
///
/// When dropped, the connection slot is released back to the pool.
/// This ensures backpressure is maintained even if the connection handler panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}
