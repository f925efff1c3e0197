//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::WebhookConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<WebhookConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: WebhookConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("webhook.toml");
        fs::write(&path, content).expect("fixture write");
        path
    }

    #[test]
    fn test_loads_full_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(
            &dir,
            r#"
            host = "127.0.0.1"
            port = 9443
            secret_token = "hook-tok"
            health_endpoint = "^/ping$"
            max_body_bytes = 4096
            shutdown_grace_ms = 500

            [tls]
            pfx_path = "certs/bundle.p12"
            pfx_password = "changeit"
            "#,
        );

        let config = load_config(&path).expect("config should load");
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9443);
        assert_eq!(config.health_endpoint, "^/ping$");
        assert_eq!(config.max_body_bytes, 4096);
        assert_eq!(config.shutdown_grace_ms, Some(500));
        let tls = config.tls.expect("tls table present");
        assert_eq!(tls.pfx_password.as_deref(), Some("changeit"));
    }

    #[test]
    fn test_loads_minimal_config_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(&dir, r#"secret_token = "hook-tok""#);

        let config = load_config(&path).expect("config should load");
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8443);
        assert!(config.tls.is_none());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = load_config(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(&dir, "secret_token = ");
        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_empty_token_is_validation_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(&dir, r#"host = "127.0.0.1""#);
        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
