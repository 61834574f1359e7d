//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use crate::error::DeclarationError;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("application.id must not be 0")]
    MissingApplicationId,
    #[error("one of application.token or application.token_env is required")]
    MissingToken,
    #[error("application.public_key must be 64 hex characters")]
    InvalidPublicKey,
    #[error("api.base_url must start with http:// or https://, got '{0}'")]
    InvalidBaseUrl(String),
    #[error("api.timeout_secs must be greater than 0")]
    ZeroTimeout,
    #[error("sync.concurrency must be greater than 0")]
    ZeroConcurrency,
    #[error("command '{name}': {source}")]
    Command {
        name: String,
        #[source]
        source: DeclarationError,
    },
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Application identity
    let app = &config.application;
    if app.id.get() == 0 {
        errors.push(ValidationError::MissingApplicationId);
    }
    if app.token.is_none() && app.token_env.is_none() {
        errors.push(ValidationError::MissingToken);
    }
    if let Some(key) = &app.public_key
        && (key.len() != 64 || !key.chars().all(|c| c.is_ascii_hexdigit()))
    {
        errors.push(ValidationError::InvalidPublicKey);
    }

    // API client
    let base_url = &config.api.base_url;
    if !base_url.starts_with("https://") && !base_url.starts_with("http://") {
        errors.push(ValidationError::InvalidBaseUrl(base_url.clone()));
    }
    if config.api.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.sync.concurrency == 0 {
        errors.push(ValidationError::ZeroConcurrency);
    }

    // Manifest commands must build on their own; cross-command conflicts
    // are reported when they are registered.
    for spec in &config.commands {
        if let Err(source) = spec.build() {
            errors.push(ValidationError::Command {
                name: spec.name.clone(),
                source,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
