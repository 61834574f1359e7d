//! Command declarations.
//!
//! - [`option`]: parameter lists to option descriptors
//! - [`node`]: the command tree and its payloads
//! - [`command`]: top-level commands, scopes and remote bindings
//! - [`registry`]: the declared set, cogs
//! - [`check`]: predicates gating invocation
//! - [`manifest`]: commands declared in configuration

pub mod check;
pub mod command;
pub mod handler;
pub mod manifest;
pub mod node;
pub mod option;
pub mod registry;

pub use check::{CheckResult, CommandCheck, any_of, check_fn};
pub use command::{ApplicationCommand, RemoteBinding, Scope};
pub use handler::{
    ArgValue, Arguments, CommandHandler, Invocation, NoopHandler, Receiver, handler_fn,
};
pub use manifest::{CommandManifest, CommandSpec};
pub use node::{CommandNode, MAX_DEPTH, NodeType, TargetParam};
pub use option::{
    OptionDescriptor, ParamDefault, ParamType, Parameter, SlashOption, infer_options,
};
pub use registry::{Cog, CommandRegistry};
