//! The remote command API, as the reconciler sees it.

use async_trait::async_trait;
use cordkit_proto::{RemoteCommand, Snowflake};
use serde_json::Value;

use crate::commands::Scope;
use crate::error::ApiError;

/// Registered-command endpoints of the platform.
///
/// Implementations do no retrying; a failed call is reported once.
#[async_trait]
pub trait CommandApi: Send + Sync {
    /// Every command currently registered in `scope`.
    async fn list_commands(&self, scope: Scope) -> Result<Vec<RemoteCommand>, ApiError>;

    /// Register a new command; returns it with its assigned id.
    async fn create_command(&self, scope: Scope, payload: &Value) -> Result<RemoteCommand, ApiError>;

    /// Replace an existing command's definition.
    async fn update_command(
        &self,
        scope: Scope,
        id: Snowflake,
        payload: &Value,
    ) -> Result<RemoteCommand, ApiError>;

    async fn delete_command(&self, scope: Scope, id: Snowflake) -> Result<(), ApiError>;
}
