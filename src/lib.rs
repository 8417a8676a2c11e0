//! HTTP download server with full-speed and throttled transfers.

pub mod cli;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod store;
pub mod transfer;

pub use config::schema::AppConfig;
pub use http::HttpServer;
pub use lifecycle::{LifecycleManager, Shutdown};
