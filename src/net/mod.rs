//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits, drain/force)
//!     → connection.rs (idle timeout, hyper connection, graceful shutdown)
//!     → axum router
//!
//! Accept loop states:
//!     Accepting → Draining → (Drained | Forced)
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection runs on its own task inside a JoinSet so it can be
//!   aborted at the shutdown deadline
//! - Transient accept errors are logged, anything else stops the server

use std::time::Duration;

use crate::config::ServerConfig;

pub mod connection;
pub mod listener;

pub use connection::{ConnectionId, IdleTimeout};
pub use listener::{ConnectionPermit, DrainOutcome, Listener};

/// Errors that stop the accept loop.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// Failed to bind to address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// Failed to accept connection.
    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),
}

/// Per-connection protocol settings.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    /// Time allowed for the client to send request headers.
    pub read_timeout: Duration,
    /// Close the connection after this long without traffic.
    pub idle_timeout: Duration,
}

impl From<&ServerConfig> for ConnectionSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            read_timeout: config.read_timeout(),
            idle_timeout: config.idle_timeout(),
        }
    }
}
