//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML file without validating it.
///
/// Used when CLI overrides still have to be applied before validation.
pub fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_valid_file() {
        let root = tempfile::tempdir().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nport = 7000\n\n[content]\nroot = {:?}\n",
            root.path().display().to_string()
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.content.root, root.path());
    }

    #[test]
    fn reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = 1").unwrap();
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn reports_validation_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[content]\nroot = \"/no/such/dir\"").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("content.root"));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            load_config(Path::new("/no/such/config.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
