//! Resource store subsystem.
//!
//! # Data Flow
//! ```text
//! download handler (filename path param)
//!     → ResourceStore::open(name)
//!     → Resource { name, size, reader }   (owned by one transfer)
//!     → transfer engine streams the reader
//! ```
//!
//! # Design Decisions
//! - Stores are read-only and shared across concurrent transfers via Arc
//! - Lookup and size resolution happen before any response header is written
//! - Names are logical single-component file names, never paths

pub mod directory;
pub mod memory;

use std::fmt;

use futures_util::future::BoxFuture;
use tokio::io::AsyncRead;

pub use directory::DirectoryStore;
pub use memory::MemoryStore;

/// Errors raised while resolving a resource.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No resource with that name.
    #[error("resource not found: {path}")]
    NotFound { path: String },

    /// The resource exists but its size could not be determined.
    #[error("failed to stat {name}: {source}")]
    Stat {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// A resolved resource, ready to be streamed.
pub struct Resource {
    pub name: String,
    pub size: u64,
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
}

impl Resource {
    pub fn new(
        name: impl Into<String>,
        size: u64,
        reader: impl AsyncRead + Send + Unpin + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            reader: Box::new(reader),
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Read-only lookup from a logical file name to a byte stream and its size.
pub trait ResourceStore: Send + Sync {
    fn open<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Resource, StoreError>>;
}

/// Returns true if `name` is a single, plain path component.
pub(crate) fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
