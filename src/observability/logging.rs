//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Pick the log format (pretty or JSON)
//! - Resolve the log level from `RUST_LOG` or config
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level
//! - JSON format for production, pretty format for development

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Default filter directives for a level.
pub fn default_directives(level: &str) -> String {
    format!("download_server={level},tower_http={level}")
}

/// Install the global subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directives(&config.log_level).into());

    let json = config.log_format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .try_init()
}
