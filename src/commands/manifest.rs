//! Commands declared in configuration instead of code.
//!
//! A manifest entry describes a command's shape only. The commands it builds
//! get a [`NoopHandler`], which is enough to register, reconcile and receive
//! them; hosts that want behaviour declare the command in Rust instead.

use std::path::Path;
use std::sync::Arc;

use cordkit_proto::{ChannelType, CommandType, OptionType, Snowflake};
use serde::Deserialize;
use serde_json::Value;

use super::command::ApplicationCommand;
use super::handler::{CommandHandler, NoopHandler};
use super::node::CommandNode;
use super::option::{ParamType, Parameter, SlashOption};
use super::registry::CommandRegistry;
use crate::config::ConfigError;
use crate::error::DeclarationError;

fn default_command_type() -> String {
    "chat_input".to_string()
}

/// A list of command declarations, usually the `[[commands]]` tables of the
/// main config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandManifest {
    #[serde(default)]
    pub commands: Vec<CommandSpec>,
}

/// One top-level command.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `chat_input`, `user` or `message`.
    #[serde(rename = "type", default = "default_command_type")]
    pub kind: String,
    /// Guilds to register in; global when empty.
    #[serde(default)]
    pub guild_ids: Vec<Snowflake>,
    #[serde(default)]
    pub force_global: bool,
    #[serde(default)]
    pub default_permission: Option<bool>,
    #[serde(default)]
    pub options: Vec<OptionSpec>,
    #[serde(default)]
    pub subcommands: Vec<SubcommandSpec>,
}

/// A subcommand or, when it has subcommands of its own, a group.
#[derive(Debug, Clone, Deserialize)]
pub struct SubcommandSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub options: Vec<OptionSpec>,
    #[serde(default)]
    pub subcommands: Vec<SubcommandSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptionSpec {
    pub name: String,
    /// Option type name, e.g. `string` or `channel`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Matches the platform: options are optional unless marked.
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub choices: Vec<ChoiceSpec>,
    #[serde(default)]
    pub channel_types: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceSpec {
    pub name: String,
    pub value: Value,
}

impl CommandManifest {
    /// Parse a standalone manifest file.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Read and parse a standalone manifest file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_toml(&text)?)
    }

    /// Build every declared command.
    pub fn build(&self) -> Result<Vec<ApplicationCommand>, DeclarationError> {
        self.commands.iter().map(CommandSpec::build).collect()
    }

    /// Build every declared command and add it to `registry`.
    pub fn register(&self, registry: &mut CommandRegistry) -> Result<usize, DeclarationError> {
        let commands = self.build()?;
        let count = commands.len();
        for command in commands {
            registry.add(command)?;
        }
        Ok(count)
    }
}

impl CommandSpec {
    pub fn build(&self) -> Result<ApplicationCommand, DeclarationError> {
        let kind =
            CommandType::from_name(&self.kind).ok_or_else(|| DeclarationError::UnknownKind {
                what: "command type",
                value: self.kind.clone(),
            })?;
        let handler: Arc<dyn CommandHandler> = Arc::new(NoopHandler);

        let root = match kind {
            CommandType::ChatInput if !self.subcommands.is_empty() => {
                reject_options_beside(&self.name, &self.options, &self.subcommands)?;
                let mut root = CommandNode::slash_group(&self.name)?;
                for child in &self.subcommands {
                    root.add_subcommand(child.build(&handler)?)?;
                }
                root
            }
            CommandType::ChatInput => {
                CommandNode::slash(&self.name, Arc::clone(&handler), &parameters(&self.options)?)?
            }
            CommandType::User | CommandType::Message => {
                if !self.subcommands.is_empty() {
                    return Err(DeclarationError::SubcommandNotAllowed {
                        command: self.name.clone(),
                        kind,
                    });
                }
                if let Some(option) = self.options.first() {
                    return Err(DeclarationError::InvalidOptionConfiguration {
                        option: option.name.clone(),
                        reason: format!("{kind} command `{}` takes no options", self.name),
                    });
                }
                if kind == CommandType::User {
                    CommandNode::user(&self.name, handler, &[Parameter::context()])?
                } else {
                    CommandNode::message(&self.name, handler, &[Parameter::context()])?
                }
            }
        };
        let root = match &self.description {
            Some(text) => root.description(text)?,
            None => root,
        };

        let mut command = ApplicationCommand::new(root)?
            .guilds(self.guild_ids.iter().copied())
            .force_global(self.force_global);
        if let Some(allowed) = self.default_permission {
            command = command.default_permission(allowed);
        }
        Ok(command)
    }
}

impl SubcommandSpec {
    fn build(&self, handler: &Arc<dyn CommandHandler>) -> Result<CommandNode, DeclarationError> {
        let node = if self.subcommands.is_empty() {
            CommandNode::subcommand(&self.name, Arc::clone(handler), &parameters(&self.options)?)?
        } else {
            reject_options_beside(&self.name, &self.options, &self.subcommands)?;
            let mut group = CommandNode::group(&self.name)?;
            for child in &self.subcommands {
                group.add_subcommand(child.build(handler)?)?;
            }
            group
        };
        match &self.description {
            Some(text) => node.description(text),
            None => Ok(node),
        }
    }
}

/// A node holds either options or subcommands, never both.
fn reject_options_beside(
    name: &str,
    options: &[OptionSpec],
    subcommands: &[SubcommandSpec],
) -> Result<(), DeclarationError> {
    match subcommands.first() {
        Some(child) if !options.is_empty() => Err(DeclarationError::InvalidNesting {
            parent: name.to_string(),
            child: child.name.clone(),
            reason: "a command with options cannot also hold subcommands",
        }),
        _ => Ok(()),
    }
}

/// The parameter list a handler for these options would declare.
fn parameters(options: &[OptionSpec]) -> Result<Vec<Parameter>, DeclarationError> {
    let mut params = vec![Parameter::context()];
    for option in options {
        params.push(option.parameter()?);
    }
    Ok(params)
}

impl OptionSpec {
    fn parameter(&self) -> Result<Parameter, DeclarationError> {
        let kind = OptionType::from_name(&self.kind).ok_or_else(|| DeclarationError::UnknownKind {
            what: "option type",
            value: self.kind.clone(),
        })?;
        let annotation = match kind {
            OptionType::String => ParamType::String,
            OptionType::Integer => ParamType::Integer,
            OptionType::Boolean => ParamType::Boolean,
            OptionType::Number => ParamType::Float,
            OptionType::User => ParamType::User,
            OptionType::Channel => ParamType::GuildChannel,
            OptionType::Role => ParamType::Role,
            OptionType::Mentionable => ParamType::Mentionable,
            other => ParamType::Other(other.as_str().to_string()),
        };

        let mut meta = SlashOption::new().required(self.required);
        if let Some(text) = &self.description {
            meta = meta.description(text.as_str());
        }
        for choice in &self.choices {
            meta = meta.choice(choice.name.as_str(), choice.value.clone());
        }
        let channel_types = self
            .channel_types
            .iter()
            .map(|name| {
                ChannelType::from_name(name).ok_or_else(|| DeclarationError::UnknownKind {
                    what: "channel type",
                    value: name.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        meta = meta.channel_types(channel_types);

        Ok(Parameter::new(&self.name, annotation).with_option(meta))
    }
}
