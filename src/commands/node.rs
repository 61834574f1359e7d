//! The command tree.
//!
//! A [`CommandNode`] is either a top-level command or a nested subcommand.
//! Trees are built bottom-up by value: children are finished before they are
//! attached, so every nesting rule can be checked at attach time and the
//! finished tree never changes shape.

use std::fmt;
use std::sync::Arc;

use cordkit_proto::{CommandType, OptionType};
use serde_json::{Value, json};

use super::check::CommandCheck;
use super::handler::CommandHandler;
use super::option::{
    OptionDescriptor, ParamType, Parameter, check_name, infer_options, normalize_description,
    split_context,
};
use crate::error::DeclarationError;

/// Deepest tree the platform accepts: command, group, subcommand.
pub const MAX_DEPTH: usize = 3;

/// Where a node sits in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Root(CommandType),
    Child,
}

/// What a node is, derived from its position and children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// A top-level command.
    Command(CommandType),
    /// A nested leaf.
    SubCommand,
    /// A nested node with children.
    SubCommandGroup,
}

impl NodeType {
    /// The option type a nested node registers as.
    pub fn option_type(self) -> Option<OptionType> {
        match self {
            NodeType::Command(_) => None,
            NodeType::SubCommand => Some(OptionType::SubCommand),
            NodeType::SubCommandGroup => Some(OptionType::SubCommandGroup),
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Command(kind) => write!(f, "{kind}"),
            NodeType::SubCommand => f.write_str("sub_command"),
            NodeType::SubCommandGroup => f.write_str("sub_command_group"),
        }
    }
}

/// Parameter that receives a context-menu command's target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetParam {
    pub name: String,
    pub annotation: ParamType,
}

/// A command or subcommand.
#[derive(Clone)]
pub struct CommandNode {
    name: String,
    description: String,
    position: Position,
    options: Vec<OptionDescriptor>,
    children: Vec<CommandNode>,
    handler: Option<Arc<dyn CommandHandler>>,
    target: Option<TargetParam>,
    checks: Vec<Arc<dyn CommandCheck>>,
}

impl CommandNode {
    fn blank(name: impl Into<String>, position: Position) -> Result<Self, DeclarationError> {
        let name = name.into();
        let chat_input = matches!(position, Position::Root(CommandType::ChatInput) | Position::Child);
        check_name(&name, chat_input)?;
        let description = match position {
            Position::Root(CommandType::User | CommandType::Message) => String::new(),
            _ => " ".to_string(),
        };
        Ok(Self {
            name,
            description,
            position,
            options: Vec::new(),
            children: Vec::new(),
            handler: None,
            target: None,
            checks: Vec::new(),
        })
    }

    /// A chat-input command with its own handler.
    pub fn slash(
        name: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
        params: &[Parameter],
    ) -> Result<Self, DeclarationError> {
        let mut node = Self::blank(name, Position::Root(CommandType::ChatInput))?;
        node.options = infer_options(&node.name, params)?;
        node.handler = Some(handler);
        Ok(node)
    }

    /// A chat-input command that only holds subcommands.
    pub fn slash_group(name: impl Into<String>) -> Result<Self, DeclarationError> {
        Self::blank(name, Position::Root(CommandType::ChatInput))
    }

    /// A user context-menu command. `params` is the interaction followed by
    /// at most one target parameter (`User`, `Member` or untyped).
    pub fn user(
        name: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
        params: &[Parameter],
    ) -> Result<Self, DeclarationError> {
        Self::context_menu(name, CommandType::User, handler, params)
    }

    /// A message context-menu command. `params` is the interaction followed
    /// by at most one target parameter (`Message` or untyped).
    pub fn message(
        name: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
        params: &[Parameter],
    ) -> Result<Self, DeclarationError> {
        Self::context_menu(name, CommandType::Message, handler, params)
    }

    fn context_menu(
        name: impl Into<String>,
        kind: CommandType,
        handler: Arc<dyn CommandHandler>,
        params: &[Parameter],
    ) -> Result<Self, DeclarationError> {
        let mut node = Self::blank(name, Position::Root(kind))?;
        let rest = split_context(&node.name, params)?;
        if rest.len() > 1 {
            return Err(DeclarationError::InvalidOptionConfiguration {
                option: rest[1].name.clone(),
                reason: format!("{kind} commands take a single target parameter"),
            });
        }
        if let Some(param) = rest.first() {
            let fits = match kind {
                CommandType::User => matches!(
                    param.annotation,
                    ParamType::User | ParamType::Member | ParamType::Untyped
                ),
                _ => matches!(param.annotation, ParamType::Message | ParamType::Untyped),
            };
            if !fits {
                return Err(DeclarationError::UnsupportedOptionType {
                    param: param.name.clone(),
                    annotation: param.annotation.describe().to_string(),
                });
            }
            node.target = Some(TargetParam {
                name: param.name.clone(),
                annotation: param.annotation.clone(),
            });
        }
        node.handler = Some(handler);
        Ok(node)
    }

    /// A nested leaf.
    pub fn subcommand(
        name: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
        params: &[Parameter],
    ) -> Result<Self, DeclarationError> {
        let mut node = Self::blank(name, Position::Child)?;
        node.options = infer_options(&node.name, params)?;
        node.handler = Some(handler);
        Ok(node)
    }

    /// A nested group; give it subcommands before attaching it.
    pub fn group(name: impl Into<String>) -> Result<Self, DeclarationError> {
        Self::blank(name, Position::Child)
    }

    /// Set the description. Ignored for context-menu commands, which the
    /// platform requires to have none.
    pub fn description(mut self, description: &str) -> Result<Self, DeclarationError> {
        if matches!(self.position, Position::Root(kind) if !kind.accepts_options()) {
            return Ok(self);
        }
        self.description = normalize_description(&self.name, Some(description))?;
        Ok(self)
    }

    /// Attach a child, checking every nesting rule.
    pub fn add_subcommand(&mut self, child: CommandNode) -> Result<(), DeclarationError> {
        let nesting = |reason| DeclarationError::InvalidNesting {
            parent: self.name.clone(),
            child: child.name.clone(),
            reason,
        };

        if let Position::Root(kind) = self.position
            && !kind.accepts_options()
        {
            return Err(DeclarationError::SubcommandNotAllowed {
                command: self.name.clone(),
                kind,
            });
        }
        if matches!(child.position, Position::Root(_)) {
            return Err(nesting("top-level commands cannot be nested"));
        }
        if self.handler.is_some() || !self.options.is_empty() {
            return Err(nesting("the parent is invocable and cannot also hold subcommands"));
        }
        if child.handler.is_none() && child.children.is_empty() {
            return Err(nesting("the group has no subcommands"));
        }
        let limit = match self.position {
            Position::Root(_) => MAX_DEPTH - 1,
            Position::Child => 1,
        };
        if child.height() > limit {
            return Err(nesting("commands nest at most three levels deep"));
        }
        if self.children.iter().any(|c| c.name == child.name) {
            return Err(DeclarationError::DuplicateSubcommand {
                parent: self.name.clone(),
                child: child.name,
            });
        }
        self.children.push(child);
        Ok(())
    }

    /// Builder form of [`add_subcommand`](Self::add_subcommand).
    pub fn with_subcommand(mut self, child: CommandNode) -> Result<Self, DeclarationError> {
        self.add_subcommand(child)?;
        Ok(self)
    }

    /// Check that this node can stand on its own as a registered command.
    pub fn validate_root(&self) -> Result<CommandType, DeclarationError> {
        let invalid = |reason| DeclarationError::InvalidRoot {
            command: self.name.clone(),
            reason,
        };
        let Position::Root(kind) = self.position else {
            return Err(invalid("nested subcommands and groups are not top-level commands"));
        };
        if self.handler.is_none() && self.children.is_empty() {
            return Err(invalid("it has neither a handler nor subcommands"));
        }
        Ok(kind)
    }

    /// Gate this node, and every subcommand below it, behind `check`.
    pub fn add_check(&mut self, check: Arc<dyn CommandCheck>) {
        self.checks.push(check);
    }

    /// Builder form of [`add_check`](Self::add_check).
    pub fn with_check(mut self, check: Arc<dyn CommandCheck>) -> Self {
        self.add_check(check);
        self
    }

    pub fn checks(&self) -> &[Arc<dyn CommandCheck>] {
        &self.checks
    }

    /// Levels in this subtree, counting this node.
    pub fn height(&self) -> usize {
        1 + self.children.iter().map(Self::height).max().unwrap_or(0)
    }

    pub fn kind(&self) -> NodeType {
        match self.position {
            Position::Root(kind) => NodeType::Command(kind),
            Position::Child if self.children.is_empty() => NodeType::SubCommand,
            Position::Child => NodeType::SubCommandGroup,
        }
    }

    /// Top-level command type; `None` for nested nodes.
    pub fn command_type(&self) -> Option<CommandType> {
        match self.position {
            Position::Root(kind) => Some(kind),
            Position::Child => None,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description_text(&self) -> &str {
        &self.description
    }

    pub fn options(&self) -> &[OptionDescriptor] {
        &self.options
    }

    /// Option declared under the given platform-facing name.
    pub fn option(&self, name: &str) -> Option<&OptionDescriptor> {
        self.options.iter().find(|o| o.name == name)
    }

    pub fn children(&self) -> &[CommandNode] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&CommandNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn handler(&self) -> Option<&Arc<dyn CommandHandler>> {
        self.handler.as_ref()
    }

    pub fn target(&self) -> Option<&TargetParam> {
        self.target.as_ref()
    }

    /// Registration payload: a command object for roots, an option object
    /// for nested nodes. `options` comes from the children or from the
    /// node's own descriptors, never both, and is omitted when empty.
    pub fn to_payload(&self) -> Value {
        let kind = match self.kind() {
            NodeType::Command(kind) => kind.value(),
            nested => nested.option_type().map_or(0, |t| t.value()),
        };
        let mut payload = json!({
            "type": kind,
            "name": self.name,
            "description": self.description,
        });
        let options: Vec<Value> = if self.children.is_empty() {
            self.options.iter().map(OptionDescriptor::to_payload).collect()
        } else {
            self.children.iter().map(Self::to_payload).collect()
        };
        if !options.is_empty() {
            payload["options"] = Value::Array(options);
        }
        payload
    }
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("options", &self.options.len())
            .field("children", &self.children)
            .field("has_handler", &self.handler.is_some())
            .field("checks", &self.checks.len())
            .finish()
    }
}
