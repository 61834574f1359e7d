//! Core configuration types.

use std::net::SocketAddr;
use std::path::Path;

use cordkit_proto::Snowflake;
use serde::Deserialize;
use thiserror::Error;

use super::defaults::*;
use crate::commands::{CommandManifest, CommandSpec};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no bot token: set application.token or application.token_env")]
    MissingToken,
    #[error("environment variable {0} is not set")]
    TokenEnvUnset(String),
    #[error("application.public_key is required to serve interactions")]
    MissingPublicKey,
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Application identity and credentials.
    pub application: ApplicationConfig,
    /// Remote command API client.
    #[serde(default)]
    pub api: ApiConfig,
    /// Reconciliation behaviour.
    #[serde(default)]
    pub sync: SyncConfig,
    /// HTTP interactions endpoint.
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Commands declared without code.
    #[serde(default)]
    pub commands: Vec<CommandSpec>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// The bot token, from the file or from `token_env`.
    pub fn token(&self) -> Result<String, ConfigError> {
        if let Some(token) = &self.application.token {
            return Ok(token.clone());
        }
        let Some(var) = &self.application.token_env else {
            return Err(ConfigError::MissingToken);
        };
        std::env::var(var).map_err(|_| ConfigError::TokenEnvUnset(var.clone()))
    }

    /// The hex public key interactions are signed with.
    pub fn public_key(&self) -> Result<&str, ConfigError> {
        self.application
            .public_key
            .as_deref()
            .ok_or(ConfigError::MissingPublicKey)
    }

    /// The `[[commands]]` entries as a manifest.
    pub fn manifest(&self) -> CommandManifest {
        CommandManifest {
            commands: self.commands.clone(),
        }
    }
}

/// Application identity.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationConfig {
    /// Application (client) id.
    pub id: Snowflake,
    /// Bot token. Prefer `token_env` outside of development.
    pub token: Option<String>,
    /// Environment variable holding the bot token.
    pub token_env: Option<String>,
    /// Hex-encoded Ed25519 key for verifying HTTP interactions.
    pub public_key: Option<String>,
}

/// REST client settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// Per-request timeout.
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_secs: default_api_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Reconciliation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Run a pass before serving.
    #[serde(default = "default_true")]
    pub on_startup: bool,
    /// Delete registered commands that are no longer declared.
    #[serde(default = "default_true")]
    pub delete_unknown: bool,
    /// Remote writes in flight at once.
    #[serde(default = "default_sync_concurrency")]
    pub concurrency: usize,
    /// Guilds to reconcile even when no command is declared in them, so
    /// their stale commands are deleted.
    #[serde(default)]
    pub guild_ids: Vec<Snowflake>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            on_startup: true,
            delete_unknown: true,
            concurrency: default_sync_concurrency(),
            guild_ids: Vec::new(),
        }
    }
}

/// HTTP endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_endpoint_listen")]
    pub listen: SocketAddr,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            listen: default_endpoint_listen(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging settings. `RUST_LOG` overrides `level`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
        }
    }
}
