//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → CLI overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared by value/Arc with all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the listener starts
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError};
pub use schema::{AppConfig, ContentConfig, LogFormat, ObservabilityConfig, ServerConfig, ThrottleConfig};
pub use validation::{validate_config, ValidationError};
