//! Dispatch Module - routing inbound interactions to command handlers.
//!
//! - [`Router`]: locates the command and runs it
//! - [`Resolver`]: converts raw option values into [`ArgValue`](crate::commands::ArgValue)s
//! - [`ObjectCache`]: the host's entity cache, consulted during resolution

mod cache;
mod resolve;
mod router;

pub use cache::{DEFAULT_MAX_ENTITIES, DEFAULT_MAX_MESSAGES, MemoryCache, NoCache, ObjectCache};
pub use resolve::Resolver;
pub use router::{ErrorHook, Router};
