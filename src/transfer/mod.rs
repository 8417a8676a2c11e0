//! Transfer engine.
//!
//! # Data Flow
//! ```text
//! TransferRequest { name, mode }
//!     → resolve() against the ResourceStore (NotFound / Stat before headers)
//!     → headers.rs (Content-Disposition, Content-Type, Content-Length)
//!     → full.rs      (large reads, no pacing)
//!       throttled.rs (one chunk per interval, progress per chunk)
//!     → body stream handed to the HTTP layer, one frame per chunk
//! ```
//!
//! # Design Decisions
//! - Every failure that can change the status happens before the body exists
//! - Mid-stream read errors are logged and end the body early
//! - Bodies never exceed the size announced in `Content-Length`
//! - Each transfer owns its resource and session, nothing is shared

pub mod full;
pub mod headers;
pub mod session;
pub mod throttled;

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::HeaderMap;
use futures_util::stream::BoxStream;

use crate::lifecycle::ShutdownSignal;
use crate::store::{Resource, ResourceStore, StoreError};

pub use headers::download_headers;
pub use session::{TransferProgress, TransferSession};

/// Callback receiving one observation per throttled chunk.
pub type ProgressObserver = Arc<dyn Fn(&TransferProgress) + Send + Sync>;

/// Chunk size and pause for throttled transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleSettings {
    pub chunk_size: usize,
    pub interval: Duration,
}

impl ThrottleSettings {
    /// Approximate target rate in bytes per second.
    pub fn target_rate(&self) -> f64 {
        self.chunk_size as f64 / self.interval.as_secs_f64()
    }
}

/// How a resource is streamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Full,
    Throttled(ThrottleSettings),
}

impl TransferMode {
    pub fn label(&self) -> &'static str {
        match self {
            TransferMode::Full => "full",
            TransferMode::Throttled(_) => "throttled",
        }
    }
}

/// One inbound download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub name: String,
    pub mode: TransferMode,
}

impl TransferRequest {
    pub fn new(name: impl Into<String>, mode: TransferMode) -> Self {
        Self {
            name: name.into(),
            mode,
        }
    }
}

/// How a transfer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Every byte was handed to the sink.
    Completed,
    /// A read error or short resource ended the body early.
    Truncated,
    /// Shutdown was requested between chunks.
    Cancelled,
    /// The body was dropped before completion, usually a client disconnect
    /// or a forced shutdown.
    Abandoned,
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransferOutcome::Completed => "completed",
            TransferOutcome::Truncated => "truncated",
            TransferOutcome::Cancelled => "cancelled",
            TransferOutcome::Abandoned => "abandoned",
        })
    }
}

/// Optional collaborators of a transfer.
#[derive(Clone, Default)]
pub struct TransferOptions {
    /// Stops throttled transfers at the next chunk boundary when fired.
    pub shutdown: Option<ShutdownSignal>,
    pub observer: Option<ProgressObserver>,
}

impl fmt::Debug for TransferOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferOptions")
            .field("shutdown", &self.shutdown.is_some())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

/// Headers plus body of a successful transfer.
pub struct Transfer {
    pub headers: HeaderMap,
    pub body: BoxStream<'static, io::Result<Bytes>>,
}

/// Look up `name`, logging the result.
pub async fn resolve(store: &dyn ResourceStore, name: &str) -> Result<Resource, StoreError> {
    tracing::debug!(name = %name, "Resolving resource");
    match store.open(name).await {
        Ok(resource) => {
            tracing::info!(name = %name, size = resource.size, "Resource found");
            Ok(resource)
        }
        Err(e) => {
            match &e {
                StoreError::NotFound { .. } => tracing::warn!(name = %name, error = %e, "Resource not found"),
                StoreError::Stat { .. } => tracing::error!(name = %name, error = %e, "Resource stat failed"),
            }
            Err(e)
        }
    }
}

/// Build the headers and body for a resolved resource.
pub fn serve(resource: Resource, mode: TransferMode, options: TransferOptions) -> Transfer {
    let headers = download_headers(&resource.name, resource.size);
    let body = match mode {
        TransferMode::Full => full::full_body(resource),
        TransferMode::Throttled(settings) => throttled::throttled_body(resource, settings, options),
    };
    Transfer { headers, body }
}
