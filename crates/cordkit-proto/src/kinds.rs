//! Closed integer enums used in command payloads.
//!
//! Each enum serializes as the platform's integer value and rejects values
//! it does not know, so a schema change on the platform side surfaces as a
//! decode error instead of a silently wrong command tree.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ProtoError;

macro_rules! int_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal => $label:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every variant, in wire-value order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];

            /// The platform's integer value.
            #[inline]
            pub const fn value(self) -> u8 {
                match self {
                    $( $name::$variant => $value, )+
                }
            }

            /// Lowercase name used in logs and config files.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $label, )+
                }
            }

            /// Parse the lowercase name used in config files.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $label => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl TryFrom<u64> for $name {
            type Error = ProtoError;

            fn try_from(value: u64) -> Result<Self, Self::Error> {
                match value {
                    $( $value => Ok($name::$variant), )+
                    other => Err(ProtoError::UnknownEnumValue {
                        kind: stringify!($name),
                        value: other,
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_u8(self.value())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = u64::deserialize(deserializer)?;
                $name::try_from(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

int_enum! {
    /// Top-level application command kinds.
    pub enum CommandType {
        /// Slash command typed into the chat input.
        ChatInput = 1 => "chat_input",
        /// Context-menu command on a user.
        User = 2 => "user",
        /// Context-menu command on a message.
        Message = 3 => "message",
    }
}

int_enum! {
    /// Option kinds accepted in a command's `options` list.
    pub enum OptionType {
        /// Nested subcommand.
        SubCommand = 1 => "sub_command",
        /// Group of subcommands.
        SubCommandGroup = 2 => "sub_command_group",
        /// Free-form text.
        String = 3 => "string",
        /// Integer in the platform's safe range.
        Integer = 4 => "integer",
        /// True/false toggle.
        Boolean = 5 => "boolean",
        /// A user (or guild member).
        User = 6 => "user",
        /// A channel, optionally restricted by `channel_types`.
        Channel = 7 => "channel",
        /// A guild role.
        Role = 8 => "role",
        /// A user or a role.
        Mentionable = 9 => "mentionable",
        /// Double-precision number.
        Number = 10 => "number",
        /// Uploaded file.
        Attachment = 11 => "attachment",
    }
}

int_enum! {
    /// Channel kinds, used for `channel_types` restrictions.
    pub enum ChannelType {
        /// Guild text channel.
        Text = 0 => "text",
        /// Direct message.
        Private = 1 => "private",
        /// Guild voice channel.
        Voice = 2 => "voice",
        /// Group direct message.
        Group = 3 => "group",
        /// Channel category.
        Category = 4 => "category",
        /// Announcement channel.
        News = 5 => "news",
        /// Thread in an announcement channel.
        NewsThread = 10 => "news_thread",
        /// Public thread.
        PublicThread = 11 => "public_thread",
        /// Private thread.
        PrivateThread = 12 => "private_thread",
        /// Stage channel.
        StageVoice = 13 => "stage_voice",
        /// Forum channel.
        Forum = 15 => "forum",
    }
}

int_enum! {
    /// Inbound interaction kinds.
    pub enum InteractionKind {
        /// Endpoint liveness check.
        Ping = 1 => "ping",
        /// A user invoked an application command.
        ApplicationCommand = 2 => "application_command",
        /// A button or select menu was used.
        MessageComponent = 3 => "message_component",
        /// The client asked for option suggestions.
        Autocomplete = 4 => "autocomplete",
        /// A modal form was submitted.
        ModalSubmit = 5 => "modal_submit",
    }
}

impl CommandType {
    /// Whether commands of this kind may carry options and subcommands.
    #[inline]
    pub const fn accepts_options(self) -> bool {
        matches!(self, CommandType::ChatInput)
    }
}

impl OptionType {
    /// Whether this option kind nests other options.
    #[inline]
    pub const fn is_subcommand(self) -> bool {
        matches!(self, OptionType::SubCommand | OptionType::SubCommandGroup)
    }
}
