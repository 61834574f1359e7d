//! Registered command records as returned by the platform.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ProtoError, Result};
use crate::kinds::CommandType;
use crate::snowflake::Snowflake;

/// Uniqueness key across the whole command space.
///
/// No two commands registered at the same time may share a signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature {
    /// Command name.
    pub name: String,
    /// Command kind.
    pub kind: CommandType,
    /// Guild the command lives in; `None` for global commands.
    pub guild_id: Option<Snowflake>,
}

impl Signature {
    /// Build a signature.
    pub fn new(name: impl Into<String>, kind: CommandType, guild_id: Option<Snowflake>) -> Self {
        Self {
            name: name.into(),
            kind,
            guild_id,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.guild_id {
            Some(guild) => write!(f, "{}/{}@{}", self.kind, self.name, guild),
            None => write!(f, "{}/{}@global", self.kind, self.name),
        }
    }
}

fn default_kind() -> Option<CommandType> {
    Some(CommandType::ChatInput)
}

fn lenient_kind<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<CommandType>, D::Error> {
    let raw = u64::deserialize(deserializer)?;
    Ok(CommandType::try_from(raw).ok())
}

/// A command as the platform reports it after registration.
///
/// The raw payload is kept alongside the decoded fields because
/// reconciliation compares declared payloads against it structurally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCommand {
    /// Id assigned by the platform.
    pub id: Snowflake,
    /// Owning application.
    #[serde(default)]
    pub application_id: Option<Snowflake>,
    /// Guild for guild-scoped commands.
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    /// Command name.
    pub name: String,
    /// Description; empty for user and message commands.
    #[serde(default)]
    pub description: String,
    /// Command kind. The platform omits it for chat-input commands.
    /// `None` for kinds [`CommandType`] does not list, such as app entry
    /// points; those are registered by other means and never reconciled.
    #[serde(rename = "type", default = "default_kind", deserialize_with = "lenient_kind")]
    pub kind: Option<CommandType>,
    /// Whether the command is enabled for everyone by default.
    #[serde(default)]
    pub default_permission: Option<bool>,
    /// The payload exactly as received.
    #[serde(skip)]
    pub raw: Value,
}

impl RemoteCommand {
    /// Decode a registration response, keeping the raw payload.
    pub fn from_payload(raw: Value) -> Result<Self> {
        if raw.get("id").is_none() {
            return Err(ProtoError::MissingField("id"));
        }
        let mut command: RemoteCommand = serde_json::from_value(raw.clone())?;
        command.raw = raw;
        Ok(command)
    }

    /// The command's signature, or `None` for an unlisted kind.
    pub fn signature(&self) -> Option<Signature> {
        self.kind
            .map(|kind| Signature::new(self.name.clone(), kind, self.guild_id))
    }

    /// Whether the command has a kind this crate does not model.
    pub fn is_foreign(&self) -> bool {
        self.kind.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_payload_defaults_kind() {
        let raw = json!({
            "id": "55",
            "application_id": "1",
            "name": "ping",
            "description": "pong",
            "version": "77"
        });
        let cmd = RemoteCommand::from_payload(raw.clone()).unwrap();
        assert_eq!(cmd.kind, Some(CommandType::ChatInput));
        assert_eq!(cmd.raw, raw);
        assert_eq!(cmd.signature(), Some(Signature::new("ping", CommandType::ChatInput, None)));
    }

    #[test]
    fn test_from_payload_unlisted_kind() {
        let raw = json!({"id": "5", "name": "launch", "description": "", "type": 4});
        let cmd = RemoteCommand::from_payload(raw).unwrap();
        assert!(cmd.is_foreign());
        assert_eq!(cmd.signature(), None);
        assert_eq!(cmd.id, Snowflake(5));
    }

    #[test]
    fn test_from_payload_requires_id() {
        let err = RemoteCommand::from_payload(json!({"name": "x"})).unwrap_err();
        assert!(matches!(err, ProtoError::MissingField("id")));
    }

    #[test]
    fn test_signature_display() {
        let sig = Signature::new("ban", CommandType::User, Some(Snowflake(9)));
        assert_eq!(sig.to_string(), "user/ban@9");
    }
}
