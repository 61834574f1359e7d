//! Inbound interaction payloads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{Channel, Member, Message, Role, User};
use crate::kinds::{CommandType, InteractionKind, OptionType};
use crate::snowflake::Snowflake;

/// An interaction delivered over the gateway or the HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// Interaction id.
    pub id: Snowflake,
    /// Application the interaction targets.
    pub application_id: Snowflake,
    /// Interaction kind.
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    /// Command data; present for application-command interactions.
    #[serde(default)]
    pub data: Option<CommandData>,
    /// Guild the interaction came from, absent in direct messages.
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    /// Channel the interaction came from.
    #[serde(default)]
    pub channel_id: Option<Snowflake>,
    /// Invoking member, when sent from a guild.
    #[serde(default)]
    pub member: Option<Member>,
    /// Invoking user, when sent from a direct message.
    #[serde(default)]
    pub user: Option<User>,
    /// Continuation token for follow-up responses.
    #[serde(default)]
    pub token: String,
}

impl Interaction {
    /// Name of the invoked top-level command.
    pub fn command_name(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.name.as_str())
    }

    /// The user who triggered the interaction, wherever it was sent from.
    pub fn invoker(&self) -> Option<&User> {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
    }
}

/// The `data` object of an application-command interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandData {
    /// Id the platform assigned to the invoked command.
    pub id: Snowflake,
    /// Command name.
    pub name: String,
    /// Command kind.
    #[serde(rename = "type")]
    pub kind: CommandType,
    /// Options supplied by the user; nested for subcommands.
    #[serde(default)]
    pub options: Vec<CommandDataOption>,
    /// Full objects for every entity referenced by id in `options`.
    #[serde(default)]
    pub resolved: Resolved,
    /// Guild the command is registered in, for guild commands.
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    /// Target of a user or message command.
    #[serde(default)]
    pub target_id: Option<Snowflake>,
}

/// One option value (or nested subcommand) in an interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDataOption {
    /// Option name as registered.
    pub name: String,
    /// Option kind.
    #[serde(rename = "type")]
    pub kind: OptionType,
    /// Raw value: string, number or boolean. Entity options carry the id
    /// as a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Nested options for subcommands and groups.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandDataOption>,
    /// Set on the option being typed during autocomplete.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub focused: bool,
}

/// Entities referenced by an interaction, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolved {
    /// Referenced users.
    #[serde(default)]
    pub users: HashMap<Snowflake, User>,
    /// Guild memberships of referenced users (without the `user` field).
    #[serde(default)]
    pub members: HashMap<Snowflake, Member>,
    /// Referenced roles.
    #[serde(default)]
    pub roles: HashMap<Snowflake, Role>,
    /// Referenced channels.
    #[serde(default)]
    pub channels: HashMap<Snowflake, Channel>,
    /// Referenced messages.
    #[serde(default)]
    pub messages: HashMap<Snowflake, Message>,
}

impl Resolved {
    /// Whether the bundle references nothing.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
            && self.members.is_empty()
            && self.roles.is_empty()
            && self.channels.is_empty()
            && self.messages.is_empty()
    }

    /// Member for `id` with its `user` and `guild_id` filled in.
    pub fn member(&self, id: Snowflake, guild_id: Option<Snowflake>) -> Option<Member> {
        let mut member = self.members.get(&id)?.clone();
        if member.user.is_none() {
            member.user = self.users.get(&id).cloned();
        }
        if member.guild_id.is_none() {
            member.guild_id = guild_id;
        }
        Some(member)
    }
}
