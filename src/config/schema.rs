//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::transfer::ThrottleSettings;

/// Root configuration for the download server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener and connection settings.
    pub server: ServerConfig,

    /// Throttled download route settings.
    pub throttle: ThrottleConfig,

    /// Served content settings.
    pub content: ContentConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration. Immutable once the listener starts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host or IP address to bind.
    pub host: String,

    /// TCP port to bind. `0` picks an ephemeral port.
    pub port: u16,

    /// Time allowed for a client to send request headers, in seconds.
    pub read_timeout_secs: u64,

    /// Time allowed for a handler to produce its response head, in seconds.
    pub write_timeout_secs: u64,

    /// Connection idle timeout in seconds.
    pub idle_timeout_secs: u64,

    /// Graceful shutdown deadline in seconds.
    pub shutdown_timeout_secs: u64,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl ServerConfig {
    /// `host:port` as passed to the socket layer.
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            read_timeout_secs: 10,
            write_timeout_secs: 10,
            idle_timeout_secs: 10,
            shutdown_timeout_secs: 10,
            max_connections: 1024,
        }
    }
}

/// Throttled download configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Register the `/download/limited/{filename}` route.
    pub enabled: bool,

    /// Bytes written per chunk.
    pub chunk_size: usize,

    /// Pause between chunks in milliseconds.
    pub interval_ms: u64,

    /// End in-flight throttled transfers as soon as shutdown is requested
    /// instead of letting them run until the shutdown deadline.
    pub cancel_on_shutdown: bool,
}

impl ThrottleConfig {
    pub fn settings(&self) -> ThrottleSettings {
        ThrottleSettings {
            chunk_size: self.chunk_size,
            interval: Duration::from_millis(self.interval_ms),
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chunk_size: 200 * 1024,
            interval_ms: 1000,
            cancel_on_shutdown: true,
        }
    }
}

/// Served content configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Directory holding the downloadable files.
    pub root: PathBuf,

    /// File name advertised on the landing page.
    pub sample_file: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("downloads"),
            sample_file: "sample.txt".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
