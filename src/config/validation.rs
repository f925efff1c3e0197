//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject values that break the routing contract (empty secret token)
//! - Verify the health pattern compiles before the server is built
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: WebhookConfig → Result<(), Vec<ValidationError>>
//! - Runs at config load and again at server construction

use regex::Regex;
use thiserror::Error;

use crate::config::schema::WebhookConfig;

/// A single semantic problem found in a [`WebhookConfig`].
#[derive(Debug, Error)]
pub enum ValidationError {
    /// An empty token turns the substring check into a wildcard: every
    /// request would be classified as an update.
    #[error("secret_token must not be empty")]
    EmptySecretToken,

    /// The health endpoint must compile as a regex.
    #[error("health_endpoint {pattern:?} is not a valid pattern: {source}")]
    InvalidHealthPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A zero cap would reject every update body.
    #[error("max_body_bytes must be greater than zero")]
    ZeroBodyCap,
}

/// Check a configuration for semantic problems, collecting every failure.
pub fn validate_config(config: &WebhookConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.secret_token.is_empty() {
        errors.push(ValidationError::EmptySecretToken);
    }

    if let Err(source) = Regex::new(&config.health_endpoint) {
        errors.push(ValidationError::InvalidHealthPattern {
            pattern: config.health_endpoint.clone(),
            source,
        });
    }

    if config.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyCap);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
