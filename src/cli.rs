//! Command line interface.
//!
//! Flags override values from the optional config file, which override the
//! built-in defaults.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{read_config, validate_config, AppConfig, ConfigError, LogFormat};

#[derive(Debug, Parser)]
#[command(name = "download-server", version)]
#[command(about = "Serve files over HTTP at full speed or throttled", long_about = None)]
pub struct Cli {
    /// Host to bind [default: 0.0.0.0]
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind [default: 8080]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the downloadable files [default: downloads]
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Do not register the throttled download route
    #[arg(long)]
    pub no_throttle: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

impl Cli {
    /// Apply flag overrides on top of `config`.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(root) = &self.root {
            config.content.root = root.clone();
        }
        if self.no_throttle {
            config.throttle.enabled = false;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }
    }

    /// Resolve the effective, validated configuration.
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => AppConfig::default(),
        };
        self.apply(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_keeps_defaults() {
        let cli = Cli::try_parse_from(["download-server"]).unwrap();
        let mut config = AppConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
        assert!(config.throttle.enabled);
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "download-server",
            "--host",
            "127.0.0.1",
            "--port",
            "8081",
            "--no-throttle",
            "--log-format",
            "json",
        ])
        .unwrap();
        let mut config = AppConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.server.bind_address(), "127.0.0.1:8081");
        assert!(!config.throttle.enabled);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!(Cli::try_parse_from(["download-server", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn load_config_validates_after_overrides() {
        let root = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from([
            "download-server",
            "--root",
            root.path().to_str().unwrap(),
        ])
        .unwrap();
        assert_eq!(cli.load_config().unwrap().content.root, root.path());

        let cli = Cli::try_parse_from(["download-server", "--root", "/no/such/dir"]).unwrap();
        assert!(matches!(cli.load_config(), Err(ConfigError::Validation(_))));
    }
}
