//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (port non-zero, timeouts > 0, at least one worker)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: ClientConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;

use crate::config::schema::ClientConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("target.host must not be empty")]
    EmptyHost,

    #[error("target.port must not be 0")]
    ZeroPort,

    #[error("session.sentinel must not be empty")]
    EmptySentinel,

    #[error("session.connect_timeout_ms must be greater than 0")]
    ZeroConnectTimeout,

    #[error("session.worker_threads must be at least 1")]
    NoWorkers,
}

pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.target.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if config.target.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    if config.session.sentinel.is_empty() {
        errors.push(ValidationError::EmptySentinel);
    }
    if config.session.connect_timeout_ms == 0 {
        errors.push(ValidationError::ZeroConnectTimeout);
    }
    if config.session.worker_threads == 0 {
        errors.push(ValidationError::NoWorkers);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
