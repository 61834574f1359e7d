//! Unified error handling for cordkit.
//!
//! Errors are split by the phase that raises them:
//! - [`DeclarationError`]: building the command tree; fatal to startup
//! - [`ApiError`] / [`SyncError`]: talking to the remote command API
//! - [`DispatchError`]: routing one inbound interaction
//!
//! Runtime errors expose `error_code()` for metric labels.

use cordkit_proto::{CommandType, OptionType, ProtoError, Signature};
use serde_json::Value;
use thiserror::Error;

use crate::commands::Scope;

/// Boxed error returned by command handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ============================================================================
// Declaration Errors (building the command tree)
// ============================================================================

/// Problems found while declaring commands. Never retried: the host has to
/// fix its declarations.
#[derive(Debug, Error)]
pub enum DeclarationError {
    #[error("parameter `{param}` has unsupported type `{annotation}`")]
    UnsupportedOptionType { param: String, annotation: String },

    #[error("option `{option}`: {reason}")]
    InvalidOptionConfiguration { option: String, reason: String },

    #[error("cannot attach `{child}` to `{parent}`: {reason}")]
    InvalidNesting {
        parent: String,
        child: String,
        reason: &'static str,
    },

    #[error("command `{command}`: first parameter must be the interaction, found `{found}`")]
    InvalidContextParameter { command: String, found: String },

    #[error("`{command}` cannot be registered: {reason}")]
    InvalidRoot {
        command: String,
        reason: &'static str,
    },

    #[error("{kind} command `{command}` cannot have subcommands")]
    SubcommandNotAllowed { command: String, kind: CommandType },

    #[error("command `{command}` declares option `{option}` twice")]
    DuplicateOption { command: String, option: String },

    #[error("`{parent}` already has a subcommand named `{child}`")]
    DuplicateSubcommand { parent: String, child: String },

    #[error("signature {0} is declared more than once")]
    DuplicateSignature(Signature),

    #[error("invalid name `{name}`: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("unknown {what} `{value}`")]
    UnknownKind { what: &'static str, value: String },
}

// ============================================================================
// Remote API Errors
// ============================================================================

/// Failures from the remote command API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed response: {0}")]
    Proto(#[from] ProtoError),

    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("rate limited, retry after {retry_after} seconds")]
    RateLimited { retry_after: f64 },
}

impl ApiError {
    /// Whether a later attempt could succeed. Retrying is left to the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            Self::Json(_) | Self::Proto(_) => false,
        }
    }

    /// Get a static error code string for metrics labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Json(_) => "json",
            Self::Proto(_) => "malformed_response",
            Self::Api { .. } => "api",
            Self::RateLimited { .. } => "rate_limited",
        }
    }
}

// ============================================================================
// Sync Errors (reconciliation)
// ============================================================================

/// One failed step of a reconciliation pass. Collected, never fatal to the
/// whole pass.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{action} of {signature} failed: {source}")]
    RemoteOperationFailed {
        signature: Signature,
        action: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("listing commands for {scope} failed: {source}")]
    ListFailed {
        scope: Scope,
        #[source]
        source: ApiError,
    },
}

impl SyncError {
    /// Get a static error code string for metrics labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RemoteOperationFailed { .. } => "remote_operation_failed",
            Self::ListFailed { .. } => "list_failed",
        }
    }
}

// ============================================================================
// Dispatch Errors (one inbound interaction)
// ============================================================================

/// Errors raised while routing a single interaction. They go to the host's
/// error hook and never affect other dispatches.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("interaction is not an application command")]
    NotApplicationCommand,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("`{command}` received option `{option}` it does not declare")]
    UnexpectedArgument { command: String, option: String },

    #[error("`{command}` is a {kind} node and cannot be invoked directly")]
    InvalidCommandType { command: String, kind: String },

    #[error("`{command}` requires a subcommand")]
    MissingSubcommand { command: String },

    #[error("`{command}` has no subcommand `{name}`")]
    UnknownSubcommand { command: String, name: String },

    #[error("`{command}` was invoked without a target")]
    MissingTarget { command: String },

    #[error("option `{option}` expected {expected}, got {value}")]
    InvalidValue {
        option: String,
        expected: OptionType,
        value: Value,
    },

    #[error("checks for `{command}` failed: {reason}")]
    CheckFailed { command: String, reason: String },

    #[error("handler failed: {0}")]
    Handler(#[source] BoxError),
}

impl DispatchError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotApplicationCommand => "not_application_command",
            Self::UnknownCommand(_) => "unknown_command",
            Self::UnexpectedArgument { .. } => "unexpected_argument",
            Self::InvalidCommandType { .. } => "invalid_command_type",
            Self::MissingSubcommand { .. } => "missing_subcommand",
            Self::UnknownSubcommand { .. } => "unknown_subcommand",
            Self::MissingTarget { .. } => "missing_target",
            Self::InvalidValue { .. } => "invalid_value",
            Self::CheckFailed { .. } => "check_failed",
            Self::Handler(_) => "handler_error",
        }
    }

    /// Whether the error means the local declaration and the registered
    /// schema have drifted apart (a re-sync usually fixes it).
    pub fn is_schema_drift(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedArgument { .. }
                | Self::UnknownSubcommand { .. }
                | Self::UnknownCommand(_)
                | Self::InvalidValue { .. }
        )
    }
}

/// Result type for command handlers.
pub type HandlerResult = Result<(), BoxError>;
