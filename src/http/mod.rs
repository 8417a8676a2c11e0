//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! hyper connection (net::connection)
//!     → request.rs (request ID, trace span)
//!     → server.rs (axum Router, timeout layer)
//!     → landing.rs ("/") | download.rs ("/download/...")
//!     → transfer engine → response.rs (status, headers, streamed body)
//!     → Send to client
//! ```

pub mod download;
pub mod landing;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
