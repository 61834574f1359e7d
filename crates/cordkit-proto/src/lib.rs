//! # cordkit-proto
//!
//! Wire model for the chat platform's application-command registration
//! payloads and inbound interaction events.
//!
//! ## Features
//!
//! - Snowflake identifiers that accept both string and integer encodings
//! - Closed integer enums for command, option and channel kinds
//! - Pass-through entity shapes (users, members, roles, channels, messages)
//! - Interaction payload parsing with the `resolved` entity bundle
//! - Structural-subset comparison of command payloads
//!
//! Nothing in this crate performs I/O.

#![deny(clippy::all)]
#![warn(missing_docs)]

//! ## Quick Start
//!
//! ```rust
//! use cordkit_proto::{Interaction, payload_matches};
//! use serde_json::json;
//!
//! let raw = r#"{"id":"10","application_id":"20","type":2,"token":"t",
//!     "data":{"id":"30","name":"echo","type":1,
//!             "options":[{"name":"text","type":3,"value":"hi"}]}}"#;
//! let interaction: Interaction = serde_json::from_str(raw).expect("valid interaction");
//! assert_eq!(interaction.command_name(), Some("echo"));
//!
//! let declared = json!({"name": "echo", "type": 1});
//! let remote = json!({"id": "30", "name": "echo", "type": 1, "version": "1"});
//! assert!(payload_matches(&declared, &remote));
//! ```

pub mod command;
pub mod entity;
pub mod error;
pub mod interaction;
pub mod kinds;
pub mod payload;
pub mod snowflake;

pub use self::command::{RemoteCommand, Signature};
pub use self::entity::{Channel, Member, Message, Role, User};
pub use self::error::{ProtoError, Result};
pub use self::interaction::{CommandData, CommandDataOption, Interaction, Resolved};
pub use self::kinds::{ChannelType, CommandType, InteractionKind, OptionType};
pub use self::payload::payload_matches;
pub use self::snowflake::Snowflake;
