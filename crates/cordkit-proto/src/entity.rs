//! Pass-through entity shapes.
//!
//! Only the fields the command layer reads are modelled; everything else
//! the platform sends is ignored on decode.

use serde::{Deserialize, Serialize};

use crate::kinds::ChannelType;
use crate::snowflake::Snowflake;

/// A platform account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User id.
    pub id: Snowflake,
    /// Account name.
    pub username: String,
    /// Legacy four-digit discriminator, "0" for migrated accounts.
    #[serde(default)]
    pub discriminator: Option<String>,
    /// Display name, if set.
    #[serde(default)]
    pub global_name: Option<String>,
    /// Whether the account is a bot.
    #[serde(default)]
    pub bot: bool,
}

impl User {
    /// Name to show in logs and replies.
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }
}

/// A user's membership in one guild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Guild the membership belongs to. Not present in interaction payloads,
    /// filled in by whoever stores the member.
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    /// The member's user. Omitted inside `resolved.members`.
    #[serde(default)]
    pub user: Option<User>,
    /// Guild nickname.
    #[serde(default)]
    pub nick: Option<String>,
    /// Role ids held in the guild.
    #[serde(default)]
    pub roles: Vec<Snowflake>,
}

impl Member {
    /// The member's user id, if the user object is attached.
    pub fn id(&self) -> Option<Snowflake> {
        self.user.as_ref().map(|u| u.id)
    }
}

/// A guild role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    /// Role id.
    pub id: Snowflake,
    /// Owning guild, filled in by the cache.
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    /// Role name.
    pub name: String,
    /// Sorting position.
    #[serde(default)]
    pub position: i64,
}

/// A channel or thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel id.
    pub id: Snowflake,
    /// Raw channel kind. The platform adds kinds over time, so values
    /// outside [`ChannelType`] are kept rather than rejected.
    #[serde(rename = "type")]
    pub kind: u8,
    /// Owning guild, absent for direct messages.
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    /// Channel name, absent for direct messages.
    #[serde(default)]
    pub name: Option<String>,
    /// Parent category or thread parent.
    #[serde(default)]
    pub parent_id: Option<Snowflake>,
}

impl Channel {
    /// The channel kind, if it is one [`ChannelType`] lists.
    pub fn channel_type(&self) -> Option<ChannelType> {
        ChannelType::try_from(u64::from(self.kind)).ok()
    }
}

/// A message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message id.
    pub id: Snowflake,
    /// Channel the message was posted in.
    pub channel_id: Snowflake,
    /// Guild the channel belongs to.
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    /// Author.
    pub author: User,
    /// Text content.
    #[serde(default)]
    pub content: String,
}
