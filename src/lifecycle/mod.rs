//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (manager.rs):
//!     Bind listener → Running → accept loop on a background task
//!
//! Stop (signals.rs / shutdown.rs):
//!     SIGINT/SIGTERM or caller trigger → Shutdown → await_stop returns
//!
//! Shutdown (manager.rs):
//!     Stop accepting → Drain connections → Abort at deadline → Stopped
//! ```
//!
//! # Design Decisions
//! - States only move forward: Created → Running → ShuttingDown → Stopped
//! - Transitions are observable through a watch channel and an event stream
//! - Shutdown has timeout: forced abort after deadline

pub mod manager;
pub mod shutdown;
pub mod signals;
pub mod state;

pub use manager::{LifecycleError, LifecycleManager};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use state::{
    LifecycleEvent, LifecycleHooks, LifecycleState, NoopHooks, ReleaseOnComplete, ShutdownReport,
    StopReason,
};
