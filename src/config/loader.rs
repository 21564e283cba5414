//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ClientConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
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

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    tracing::debug!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ClientConfig, ConfigError> {
    let config: ClientConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InboundUnit;

    #[test]
    fn minimal_file_uses_defaults() {
        let config = parse_config("[target]\nhost = \"10.0.0.5\"\n").unwrap();
        assert_eq!(config.target.host, "10.0.0.5");
        assert_eq!(config.target.port, 6633);
        assert!(!config.security.secured);
        assert_eq!(config.session.sentinel, "bye");
        assert_eq!(config.receive.unit, InboundUnit::Frames);
    }

    #[test]
    fn full_file_round_trips_fields() {
        let config = parse_config(
            r#"
            [target]
            host = "switch.local"
            port = 6653

            [payload]
            path = "messages.bin"

            [security]
            secured = true
            server_name = "switch"

            [receive]
            threshold = 4
            unit = "bytes"

            [session]
            sentinel = "quit"
            connect_timeout_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.target.port, 6653);
        assert_eq!(config.payload.path.as_deref(), Some(Path::new("messages.bin")));
        assert!(config.security.secured);
        assert_eq!(config.receive.threshold, 4);
        assert_eq!(config.receive.unit, InboundUnit::Bytes);
        assert_eq!(config.session.sentinel, "quit");
        assert_eq!(config.session.shutdown_grace_ms, 2_000);
    }

    #[test]
    fn invalid_values_are_reported_together() {
        let err = parse_config("[target]\nhost = \"\"\nport = 0\n").unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn syntax_errors_are_parse_errors() {
        assert!(matches!(parse_config("[target"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            load_config(Path::new("/nonexistent/client.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
