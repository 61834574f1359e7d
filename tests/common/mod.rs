//! Integration test common infrastructure.
//!
//! Provides an in-memory [`CommandApi`] that behaves like the platform's
//! registration endpoints, plus builders for commands and interactions.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use cordkit::commands::{
    ApplicationCommand, CommandNode, Invocation, ParamType, Parameter, Scope, handler_fn,
};
use cordkit::error::ApiError;
use cordkit::proto::{Interaction, RemoteCommand, Snowflake};
use cordkit::sync::CommandApi;
use parking_lot::Mutex;
use serde_json::{Value, json};

pub const APPLICATION_ID: u64 = 4242;

/// One call made against [`FakeApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub action: &'static str,
    pub scope: Scope,
    pub name: Option<String>,
}

/// In-memory registration store.
///
/// Stored commands look like the platform's responses: an id, an
/// application id and a version are added, and `required: false` is never
/// echoed back.
#[derive(Default)]
pub struct FakeApi {
    stored: Mutex<BTreeMap<Scope, Vec<Value>>>,
    next_id: AtomicU64,
    calls: Mutex<Vec<Call>>,
    failing_writes: Mutex<BTreeSet<String>>,
    failing_lists: Mutex<BTreeSet<Scope>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1000),
            ..Self::default()
        })
    }

    /// Seed a command as if it had been registered earlier. Returns its id.
    pub fn seed(&self, scope: Scope, payload: Value) -> Snowflake {
        let stored = self.stamp(scope, payload, None);
        let id = id_of(&stored);
        self.stored.lock().entry(scope).or_default().push(stored);
        id
    }

    /// Make every write to a command with this name fail.
    pub fn fail_writes_for(&self, name: &str) {
        self.failing_writes.lock().insert(name.to_string());
    }

    /// Make listing this scope fail.
    pub fn fail_list(&self, scope: Scope) {
        self.failing_lists.lock().insert(scope);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Calls other than listings.
    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.action != "list").collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn stored(&self, scope: Scope) -> Vec<Value> {
        self.stored.lock().get(&scope).cloned().unwrap_or_default()
    }

    pub fn stored_named(&self, scope: Scope, name: &str) -> Option<Value> {
        self.stored(scope).into_iter().find(|c| c["name"] == name)
    }

    fn record(&self, action: &'static str, scope: Scope, name: Option<&str>) {
        self.calls.lock().push(Call {
            action,
            scope,
            name: name.map(str::to_string),
        });
    }

    fn check_write(&self, name: &str) -> Result<(), ApiError> {
        if self.failing_writes.lock().contains(name) {
            return Err(ApiError::Api {
                status: 400,
                code: Some(50035),
                message: format!("Invalid Form Body for {name}"),
            });
        }
        Ok(())
    }

    fn stamp(&self, scope: Scope, mut payload: Value, id: Option<Snowflake>) -> Value {
        let id = id.unwrap_or_else(|| Snowflake(self.next_id.fetch_add(1, Ordering::Relaxed)));
        strip_required_false(&mut payload);
        if let Value::Object(map) = &mut payload {
            map.insert("id".into(), json!(id.to_string()));
            map.insert("application_id".into(), json!(APPLICATION_ID.to_string()));
            map.insert("version".into(), json!(format!("{}", id.get() + 1)));
            map.entry("type").or_insert(json!(1));
            map.entry("default_permission").or_insert(json!(true));
            if let Scope::Guild(guild) = scope {
                map.insert("guild_id".into(), json!(guild.to_string()));
            }
        }
        payload
    }
}

fn id_of(value: &Value) -> Snowflake {
    value["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or(Snowflake(0))
}

fn strip_required_false(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("required") == Some(&json!(false)) {
                map.remove("required");
            }
            map.values_mut().for_each(strip_required_false);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_required_false),
        _ => {}
    }
}

#[async_trait]
impl CommandApi for FakeApi {
    async fn list_commands(&self, scope: Scope) -> Result<Vec<RemoteCommand>, ApiError> {
        self.record("list", scope, None);
        if self.failing_lists.lock().contains(&scope) {
            return Err(ApiError::Api {
                status: 403,
                code: Some(50001),
                message: "Missing Access".into(),
            });
        }
        self.stored(scope)
            .into_iter()
            .map(|raw| RemoteCommand::from_payload(raw).map_err(ApiError::from))
            .collect()
    }

    async fn create_command(&self, scope: Scope, payload: &Value) -> Result<RemoteCommand, ApiError> {
        let name = payload["name"].as_str().unwrap_or_default();
        self.record("create", scope, Some(name));
        self.check_write(name)?;

        let stored = self.stamp(scope, payload.clone(), None);
        self.stored.lock().entry(scope).or_default().push(stored.clone());
        Ok(RemoteCommand::from_payload(stored)?)
    }

    async fn update_command(
        &self,
        scope: Scope,
        id: Snowflake,
        payload: &Value,
    ) -> Result<RemoteCommand, ApiError> {
        let name = payload["name"].as_str().unwrap_or_default();
        self.record("update", scope, Some(name));
        self.check_write(name)?;

        let stored = self.stamp(scope, payload.clone(), Some(id));
        let mut all = self.stored.lock();
        let commands = all.entry(scope).or_default();
        let Some(slot) = commands.iter_mut().find(|c| id_of(c) == id) else {
            return Err(ApiError::Api {
                status: 404,
                code: Some(10063),
                message: "Unknown application command".into(),
            });
        };
        *slot = stored.clone();
        Ok(RemoteCommand::from_payload(stored)?)
    }

    async fn delete_command(&self, scope: Scope, id: Snowflake) -> Result<(), ApiError> {
        let mut all = self.stored.lock();
        let commands = all.entry(scope).or_default();
        let name = commands
            .iter()
            .find(|c| id_of(c) == id)
            .and_then(|c| c["name"].as_str())
            .map(str::to_string);
        self.record("delete", scope, name.as_deref());
        commands.retain(|c| id_of(c) != id);
        Ok(())
    }
}

// ============================================================================
// Command builders
// ============================================================================

/// `/echo text:<string> [times:<integer>]`, optionally limited to guilds.
pub fn echo_command(guilds: &[u64]) -> ApplicationCommand {
    let node = CommandNode::slash(
        "echo",
        handler_fn(|_inv: Invocation| async { Ok(()) }),
        &[
            Parameter::context(),
            Parameter::new("text", ParamType::String),
            Parameter::new("times", ParamType::Integer).with_default(1i64),
        ],
    )
    .and_then(|n| n.description("Repeat something"))
    .unwrap();
    ApplicationCommand::new(node)
        .unwrap()
        .guilds(guilds.iter().copied().map(Snowflake))
}

/// A chat-input command with no options.
pub fn simple_command(name: &str, description: &str) -> ApplicationCommand {
    let node = CommandNode::slash(
        name,
        handler_fn(|_inv: Invocation| async { Ok(()) }),
        &[Parameter::context()],
    )
    .and_then(|n| n.description(description))
    .unwrap();
    ApplicationCommand::new(node).unwrap()
}

// ============================================================================
// Interaction builders
// ============================================================================

/// An application-command interaction around `data`, sent from `guild`.
pub fn command_interaction(guild: Option<u64>, data: Value) -> Arc<Interaction> {
    let mut value = json!({
        "id": "900",
        "application_id": APPLICATION_ID.to_string(),
        "type": 2,
        "token": "interaction-token",
        "data": data,
    });
    if let Some(guild) = guild {
        value["guild_id"] = json!(guild.to_string());
    }
    Arc::new(serde_json::from_value(value).unwrap())
}
