//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions (Config, ApplicationConfig, ApiConfig, SyncConfig, ...)
//! - [`defaults`]: serde default functions
//! - [`validation`]: startup checks that report every problem at once

mod defaults;
mod types;
pub mod validation;

pub use types::{
    ApiConfig, ApplicationConfig, Config, ConfigError, EndpointConfig, LogFormat, LoggingConfig,
    SyncConfig,
};
