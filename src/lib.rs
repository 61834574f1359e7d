//! cordkit - application commands for a chat platform's interactions API.
//!
//! Commands are declared as trees of [`CommandNode`]s whose options are
//! inferred from handler parameters, collected in a [`CommandRegistry`],
//! reconciled against what the platform has registered by a
//! [`Reconciler`], and invoked by a [`Router`] when interactions arrive.
//!
//! ```ignore
//! let echo = CommandNode::slash(
//!     "echo",
//!     handler_fn(|inv: Invocation| async move { Ok(()) }),
//!     &[Parameter::context(), Parameter::new("text", ParamType::String)],
//! )?;
//! let mut registry = CommandRegistry::new();
//! registry.add(ApplicationCommand::new(echo)?.guilds([guild]))?;
//!
//! let registry = Arc::new(registry);
//! Reconciler::new(api).sync(&registry).await;
//! Router::new(registry).dispatch(interaction).await?;
//! ```

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod metrics;
pub mod sync;
pub mod telemetry;

pub use cordkit_proto as proto;

pub use commands::{
    ApplicationCommand, ArgValue, Arguments, Cog, CommandHandler, CommandManifest, CommandNode,
    CommandRegistry, Invocation, ParamType, Parameter, Scope, SlashOption, handler_fn,
};
pub use config::Config;
pub use dispatch::{MemoryCache, ObjectCache, Router};
pub use error::{ApiError, DeclarationError, DispatchError, HandlerResult, SyncError};
pub use sync::{CommandApi, HttpCommandApi, Reconciler, SyncReport};
