//! Top-level commands: a node tree plus where it is registered.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cordkit_proto::{CommandType, Signature, Snowflake};
use dashmap::DashMap;
use serde_json::Value;

use super::handler::Receiver;
use super::node::CommandNode;
use super::registry::Cog;
use crate::error::DeclarationError;

/// Registration target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Global,
    Guild(Snowflake),
}

impl Scope {
    /// The guild id, for guild scopes.
    pub fn guild_id(self) -> Option<Snowflake> {
        match self {
            Scope::Global => None,
            Scope::Guild(id) => Some(id),
        }
    }
}

impl From<Option<Snowflake>> for Scope {
    fn from(guild_id: Option<Snowflake>) -> Self {
        guild_id.map_or(Scope::Global, Scope::Guild)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => f.write_str("global"),
            Scope::Guild(id) => write!(f, "guild {id}"),
        }
    }
}

/// Remote ids assigned to a command, one per scope.
///
/// Each scope's id is its own cell: a reconciliation pass replaces single
/// entries and never the whole record, so a concurrent dispatch reading the
/// binding always sees a complete id or none.
#[derive(Debug, Default)]
pub struct RemoteBinding {
    /// 0 while unbound; the platform never assigns 0.
    global_id: AtomicU64,
    guild_ids: DashMap<Snowflake, Snowflake>,
}

impl RemoteBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, scope: Scope, id: Snowflake) {
        match scope {
            Scope::Global => self.global_id.store(id.get(), Ordering::Release),
            Scope::Guild(guild) => {
                self.guild_ids.insert(guild, id);
            }
        }
    }

    pub fn unbind(&self, scope: Scope) {
        match scope {
            Scope::Global => self.global_id.store(0, Ordering::Release),
            Scope::Guild(guild) => {
                self.guild_ids.remove(&guild);
            }
        }
    }

    pub fn global_id(&self) -> Option<Snowflake> {
        match self.global_id.load(Ordering::Acquire) {
            0 => None,
            id => Some(Snowflake(id)),
        }
    }

    pub fn guild_id(&self, guild: Snowflake) -> Option<Snowflake> {
        self.guild_ids.get(&guild).map(|entry| *entry.value())
    }

    pub fn id_for(&self, scope: Scope) -> Option<Snowflake> {
        match scope {
            Scope::Global => self.global_id(),
            Scope::Guild(guild) => self.guild_id(guild),
        }
    }

    /// Whether `id` is any of this command's remote ids.
    pub fn contains_id(&self, id: Snowflake) -> bool {
        self.global_id() == Some(id) || self.guild_ids.iter().any(|entry| *entry.value() == id)
    }

    /// Every bound (scope, id) pair.
    pub fn ids(&self) -> Vec<(Scope, Snowflake)> {
        let mut ids: Vec<_> = self
            .guild_ids
            .iter()
            .map(|entry| (Scope::Guild(*entry.key()), *entry.value()))
            .collect();
        ids.sort();
        if let Some(id) = self.global_id() {
            ids.push((Scope::Global, id));
        }
        ids
    }

    pub fn is_bound(&self) -> bool {
        self.global_id().is_some() || !self.guild_ids.is_empty()
    }
}

/// A top-level command ready for registration.
pub struct ApplicationCommand {
    root: CommandNode,
    kind: CommandType,
    guild_ids: Vec<Snowflake>,
    force_global: bool,
    default_permission: Option<bool>,
    binding: RemoteBinding,
    receiver: Option<Receiver>,
    cog: Option<Arc<dyn Cog>>,
}

impl ApplicationCommand {
    /// Wrap a root node. Nested nodes, and roots with neither a handler
    /// nor subcommands, are rejected.
    ///
    /// Without guild ids the command is global.
    pub fn new(root: CommandNode) -> Result<Self, DeclarationError> {
        let kind = root.validate_root()?;
        Ok(Self {
            root,
            kind,
            guild_ids: Vec::new(),
            force_global: false,
            default_permission: None,
            binding: RemoteBinding::new(),
            receiver: None,
            cog: None,
        })
    }

    /// Register in these guilds (and no longer globally, unless forced).
    pub fn guilds(mut self, guild_ids: impl IntoIterator<Item = Snowflake>) -> Self {
        for id in guild_ids {
            if !self.guild_ids.contains(&id) {
                self.guild_ids.push(id);
            }
        }
        self
    }

    /// Register globally as well as in the listed guilds.
    pub fn force_global(mut self, force: bool) -> Self {
        self.force_global = force;
        self
    }

    pub fn default_permission(mut self, allowed: bool) -> Self {
        self.default_permission = Some(allowed);
        self
    }

    pub(crate) fn set_cog(&mut self, cog: Arc<dyn Cog>, receiver: Receiver) {
        self.cog = Some(cog);
        self.receiver = Some(receiver);
    }

    /// The cog the command was declared by, for its hooks.
    pub fn cog(&self) -> Option<&Arc<dyn Cog>> {
        self.cog.as_ref()
    }

    pub fn receiver(&self) -> Option<&Receiver> {
        self.receiver.as_ref()
    }

    pub fn root(&self) -> &CommandNode {
        &self.root
    }

    pub fn binding(&self) -> &RemoteBinding {
        &self.binding
    }

    pub fn name(&self) -> &str {
        self.root.name()
    }

    pub fn kind(&self) -> CommandType {
        self.kind
    }

    pub fn guild_ids(&self) -> &[Snowflake] {
        &self.guild_ids
    }

    pub fn is_guild(&self) -> bool {
        !self.guild_ids.is_empty()
    }

    pub fn is_global(&self) -> bool {
        self.guild_ids.is_empty() || self.force_global
    }

    /// Every scope the command is registered in; guilds first, then global.
    pub fn scopes(&self) -> Vec<Scope> {
        let mut scopes: Vec<_> = self.guild_ids.iter().copied().map(Scope::Guild).collect();
        if self.is_global() {
            scopes.push(Scope::Global);
        }
        scopes
    }

    pub fn in_scope(&self, scope: Scope) -> bool {
        match scope {
            Scope::Global => self.is_global(),
            Scope::Guild(id) => self.guild_ids.contains(&id),
        }
    }

    pub fn signature_for(&self, scope: Scope) -> Signature {
        Signature::new(self.name(), self.kind(), scope.guild_id())
    }

    /// One signature per scope.
    pub fn signatures(&self) -> Vec<Signature> {
        self.scopes()
            .into_iter()
            .map(|scope| self.signature_for(scope))
            .collect()
    }

    /// The payload shared by every scope.
    fn base_payload(&self) -> Value {
        let mut payload = self.root.to_payload();
        if !self.kind().accepts_options()
            && let Some(object) = payload.as_object_mut()
        {
            object.remove("options");
        }
        if let Some(allowed) = self.default_permission {
            payload["default_permission"] = Value::Bool(allowed);
        }
        payload
    }

    /// Payload for one scope, or `None` if the command is not registered
    /// there. Guild payloads carry `guild_id`.
    pub fn payload_for(&self, scope: Scope) -> Option<Value> {
        if !self.in_scope(scope) {
            return None;
        }
        let mut payload = self.base_payload();
        if let Scope::Guild(id) = scope {
            payload["guild_id"] = Value::String(id.to_string());
        }
        Some(payload)
    }

    /// Payloads for every scope, in [`scopes`](Self::scopes) order.
    pub fn payloads(&self) -> Vec<(Scope, Value)> {
        self.scopes()
            .into_iter()
            .filter_map(|scope| self.payload_for(scope).map(|p| (scope, p)))
            .collect()
    }
}

impl fmt::Debug for ApplicationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationCommand")
            .field("root", &self.root)
            .field("scopes", &self.scopes())
            .field("default_permission", &self.default_permission)
            .field("binding", &self.binding.ids())
            .finish()
    }
}

/// Every scope any of `commands` is registered in.
pub(crate) fn distinct_scopes<'a>(
    commands: impl IntoIterator<Item = &'a ApplicationCommand>,
) -> BTreeSet<Scope> {
    commands.into_iter().flat_map(|c| c.scopes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::handler::NoopHandler;
    use crate::commands::option::{ParamType, Parameter};
    use serde_json::json;
    use std::sync::Arc;

    fn echo() -> CommandNode {
        CommandNode::slash(
            "echo",
            Arc::new(NoopHandler),
            &[Parameter::context(), Parameter::new("text", ParamType::String)],
        )
        .unwrap()
    }

    #[test]
    fn test_scopes() {
        let global = ApplicationCommand::new(echo()).unwrap();
        assert!(global.is_global() && !global.is_guild());
        assert_eq!(global.scopes(), [Scope::Global]);

        let guild = ApplicationCommand::new(echo())
            .unwrap()
            .guilds([Snowflake(7), Snowflake(8), Snowflake(7)]);
        assert!(!guild.is_global());
        assert_eq!(guild.scopes(), [Scope::Guild(Snowflake(7)), Scope::Guild(Snowflake(8))]);

        let both = ApplicationCommand::new(echo())
            .unwrap()
            .guilds([Snowflake(7)])
            .force_global(true);
        assert_eq!(both.scopes(), [Scope::Guild(Snowflake(7)), Scope::Global]);
        assert_eq!(both.signatures().len(), 2);
    }

    #[test]
    fn test_payloads() {
        let cmd = ApplicationCommand::new(echo())
            .unwrap()
            .guilds([Snowflake(7)])
            .force_global(true)
            .default_permission(false);
        let payloads = cmd.payloads();
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0].1["guild_id"], json!("7"));
        assert_eq!(payloads[0].1["default_permission"], json!(false));
        assert!(payloads[1].1.get("guild_id").is_none());
        assert!(cmd.payload_for(Scope::Guild(Snowflake(9))).is_none());
    }

    #[test]
    fn test_context_menu_payload_has_no_options() {
        let node = CommandNode::user(
            "Profile",
            Arc::new(NoopHandler),
            &[Parameter::context(), Parameter::new("member", ParamType::Member)],
        )
        .unwrap();
        let cmd = ApplicationCommand::new(node).unwrap();
        let payload = cmd.payload_for(Scope::Global).unwrap();
        assert_eq!(payload, json!({"type": 2, "name": "Profile", "description": ""}));
        assert_eq!(cmd.kind(), CommandType::User);
    }

    #[test]
    fn test_binding_cells() {
        let binding = RemoteBinding::new();
        assert!(!binding.is_bound());
        binding.bind(Scope::Global, Snowflake(100));
        binding.bind(Scope::Guild(Snowflake(7)), Snowflake(200));

        assert_eq!(binding.id_for(Scope::Global), Some(Snowflake(100)));
        assert!(binding.contains_id(Snowflake(200)));
        assert_eq!(
            binding.ids(),
            [(Scope::Guild(Snowflake(7)), Snowflake(200)), (Scope::Global, Snowflake(100))]
        );

        binding.unbind(Scope::Global);
        assert_eq!(binding.global_id(), None);
        assert!(binding.is_bound());
    }

    #[test]
    fn test_scope_order() {
        let set = distinct_scopes(&[
            ApplicationCommand::new(echo()).unwrap(),
            ApplicationCommand::new(echo()).unwrap().guilds([Snowflake(3)]),
        ]);
        assert_eq!(
            set.into_iter().collect::<Vec<_>>(),
            [Scope::Global, Scope::Guild(Snowflake(3))]
        );
    }

    #[test]
    fn test_root_must_be_top_level_and_invocable() {
        let ban = CommandNode::subcommand("ban", Arc::new(NoopHandler), &[Parameter::context()]).unwrap();
        let group = CommandNode::group("mod").unwrap().with_subcommand(ban).unwrap();
        let err = ApplicationCommand::new(group).unwrap_err();
        assert!(matches!(err, DeclarationError::InvalidRoot { ref command, .. } if command == "mod"));

        let empty = CommandNode::slash_group("empty").unwrap();
        assert!(matches!(
            ApplicationCommand::new(empty),
            Err(DeclarationError::InvalidRoot { .. })
        ));
    }
}
