//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

use std::net::SocketAddr;

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// API Defaults
// =============================================================================

pub fn default_api_base_url() -> String {
    "https://discord.com/api/v10".to_string()
}

pub fn default_api_timeout_secs() -> u64 {
    15
}

pub fn default_user_agent() -> String {
    format!("cordkit/{}", env!("CARGO_PKG_VERSION"))
}

// =============================================================================
// Sync Defaults
// =============================================================================

pub fn default_sync_concurrency() -> usize {
    4
}

// =============================================================================
// Endpoint / Logging Defaults
// =============================================================================

pub fn default_endpoint_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

pub fn default_log_level() -> String {
    "info".to_string()
}
