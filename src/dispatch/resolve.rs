//! Raw option values to argument values.
//!
//! Scalars are coerced to the option's declared type; a value of the wrong
//! shape is an error. Entity ids are looked up in the object cache, then in
//! the interaction's `resolved` bundle. An id found in neither becomes
//! [`ArgValue::None`] rather than failing the dispatch.

use cordkit_proto::{CommandData, OptionType, Resolved, Snowflake};
use serde_json::Value;
use tracing::debug;

use super::cache::ObjectCache;
use crate::commands::{ArgValue, OptionDescriptor, ParamType, TargetParam};
use crate::error::DispatchError;

/// Snowflakes arrive as strings but are accepted as integers too.
pub(crate) fn snowflake_of(value: &Value) -> Option<Snowflake> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64().map(Snowflake),
        _ => None,
    }
}

/// Lookup context for one interaction.
pub struct Resolver<'a> {
    cache: &'a dyn ObjectCache,
    resolved: &'a Resolved,
    guild_id: Option<Snowflake>,
}

impl<'a> Resolver<'a> {
    pub fn new(cache: &'a dyn ObjectCache, resolved: &'a Resolved, guild_id: Option<Snowflake>) -> Self {
        Self {
            cache,
            resolved,
            guild_id,
        }
    }

    /// Convert the raw value supplied for `option`.
    pub fn option(&self, option: &OptionDescriptor, raw: &Value) -> Result<ArgValue, DispatchError> {
        let invalid = || DispatchError::InvalidValue {
            option: option.name.clone(),
            expected: option.kind,
            value: raw.clone(),
        };

        let value = match option.kind {
            OptionType::String if option.annotation == ParamType::Message => {
                let id = snowflake_of(raw).ok_or_else(invalid)?;
                self.message(id)
            }
            OptionType::String => ArgValue::String(raw.as_str().ok_or_else(invalid)?.to_string()),
            OptionType::Integer => ArgValue::Integer(integer_of(raw).ok_or_else(invalid)?),
            OptionType::Number => ArgValue::Number(number_of(raw).ok_or_else(invalid)?),
            OptionType::Boolean => ArgValue::Boolean(raw.as_bool().ok_or_else(invalid)?),
            OptionType::User => {
                let id = snowflake_of(raw).ok_or_else(invalid)?;
                if option.annotation == ParamType::Member {
                    self.member_or_user(id)
                } else {
                    self.user(id)
                }
            }
            OptionType::Role => self.role(snowflake_of(raw).ok_or_else(invalid)?),
            OptionType::Channel => self.channel(snowflake_of(raw).ok_or_else(invalid)?),
            OptionType::Mentionable => {
                let id = snowflake_of(raw).ok_or_else(invalid)?;
                match self.user(id) {
                    ArgValue::None => self.role(id),
                    found => found,
                }
            }
            OptionType::SubCommand | OptionType::SubCommandGroup | OptionType::Attachment => {
                return Err(invalid());
            }
        };

        if value.is_none() {
            debug!(option = %option.name, value = %raw, "Entity not found, passing none");
        }
        Ok(value)
    }

    /// Resolve a context-menu command's target, preferring the interaction's
    /// own bundle over the cache. What is learned is stored in the cache.
    pub fn target(&self, data: &CommandData, param: &TargetParam) -> Result<ArgValue, DispatchError> {
        let id = data.target_id.ok_or_else(|| DispatchError::MissingTarget {
            command: data.name.clone(),
        })?;

        let value = match param.annotation {
            ParamType::Message => self.bundled_message(id),
            ParamType::User => self.bundled_user(id),
            ParamType::Untyped if data.resolved.messages.contains_key(&id) => {
                self.bundled_message(id)
            }
            _ => match self.guild_id.and_then(|guild| self.resolved.member(id, Some(guild))) {
                Some(member) => {
                    self.cache.store_member(&member);
                    ArgValue::Member(member)
                }
                None => match self.member_or_user(id) {
                    ArgValue::None => self.bundled_user(id),
                    found => found,
                },
            },
        };
        Ok(value)
    }

    fn bundled_user(&self, id: Snowflake) -> ArgValue {
        match self.resolved.users.get(&id) {
            Some(user) => {
                self.cache.store_user(user);
                ArgValue::User(user.clone())
            }
            None => self.user(id),
        }
    }

    fn bundled_message(&self, id: Snowflake) -> ArgValue {
        match self.resolved.messages.get(&id) {
            Some(message) => {
                self.cache.store_message(message);
                ArgValue::Message(message.clone())
            }
            None => self.message(id),
        }
    }

    fn user(&self, id: Snowflake) -> ArgValue {
        self.cache
            .get_user(id)
            .or_else(|| self.resolved.users.get(&id).cloned())
            .map_or(ArgValue::None, ArgValue::User)
    }

    /// The member in the current guild, or the plain user outside guilds.
    fn member_or_user(&self, id: Snowflake) -> ArgValue {
        let Some(guild) = self.guild_id else {
            return self.user(id);
        };
        self.cache
            .get_member(guild, id)
            .or_else(|| self.resolved.member(id, Some(guild)))
            .map_or(ArgValue::None, ArgValue::Member)
    }

    fn role(&self, id: Snowflake) -> ArgValue {
        let cached = self.guild_id.and_then(|guild| self.cache.get_role(guild, id));
        cached
            .or_else(|| {
                self.resolved.roles.get(&id).map(|role| {
                    let mut role = role.clone();
                    role.guild_id = role.guild_id.or(self.guild_id);
                    role
                })
            })
            .map_or(ArgValue::None, ArgValue::Role)
    }

    fn channel(&self, id: Snowflake) -> ArgValue {
        self.cache
            .get_channel(id)
            .or_else(|| {
                self.resolved.channels.get(&id).map(|channel| {
                    let mut channel = channel.clone();
                    channel.guild_id = channel.guild_id.or(self.guild_id);
                    channel
                })
            })
            .map_or(ArgValue::None, ArgValue::Channel)
    }

    fn message(&self, id: Snowflake) -> ArgValue {
        self.cache
            .get_message(id)
            .or_else(|| self.resolved.messages.get(&id).cloned())
            .map_or(ArgValue::None, ArgValue::Message)
    }
}

fn integer_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
