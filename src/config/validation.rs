//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, chunk size > 0)
//! - Keep the throttle interval below the connection idle timeout
//! - Check that the content root exists
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a loaded configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let server = &config.server;

    if server.host.trim().is_empty() {
        errors.push(ValidationError::new("server.host", "must not be empty"));
    }
    for (field, value) in [
        ("server.read_timeout_secs", server.read_timeout_secs),
        ("server.write_timeout_secs", server.write_timeout_secs),
        ("server.idle_timeout_secs", server.idle_timeout_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }
    if server.max_connections == 0 {
        errors.push(ValidationError::new(
            "server.max_connections",
            "must be greater than zero",
        ));
    }

    if config.throttle.enabled {
        if config.throttle.chunk_size == 0 {
            errors.push(ValidationError::new(
                "throttle.chunk_size",
                "must be greater than zero",
            ));
        }
        if config.throttle.interval_ms == 0 {
            errors.push(ValidationError::new(
                "throttle.interval_ms",
                "must be greater than zero",
            ));
        }
        // The idle timer also runs while a throttled body waits between chunks.
        if server.idle_timeout_secs > 0
            && config.throttle.settings().interval >= server.idle_timeout()
        {
            errors.push(ValidationError::new(
                "throttle.interval_ms",
                format!(
                    "must be shorter than server.idle_timeout_secs ({}s)",
                    server.idle_timeout_secs
                ),
            ));
        }
    }

    if !config.content.root.is_dir() {
        errors.push(ValidationError::new(
            "content.root",
            format!("{} is not a directory", config.content.root.display()),
        ));
    }
    if config.content.sample_file.is_empty() {
        errors.push(ValidationError::new("content.sample_file", "must not be empty"));
    }

    let observability = &config.observability;
    if !matches!(
        observability.log_level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", observability.log_level),
        ));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
