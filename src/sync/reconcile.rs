//! Reconciliation of declared commands against registered ones.
//!
//! A pass has two halves. [`Reconciler::plan`] lists the remote commands of
//! every relevant scope and diffs them against the registry; nothing is
//! written. [`Reconciler::apply`] then binds the commands that already match
//! and runs the remaining creates, updates and deletes concurrently. Every
//! successful call writes its id into the owning command's binding as soon
//! as it returns, so an interrupted pass leaves valid bindings behind.
//!
//! Diffing one scope:
//! 1. a declared payload that structurally matches an unclaimed remote
//!    command binds to it
//! 2. otherwise an unclaimed remote command with the same name and type is
//!    updated in place
//! 3. otherwise the command is created
//! 4. remote commands nobody claimed are deleted (unless disabled)

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cordkit_proto::{OptionType, RemoteCommand, Signature, Snowflake, payload_matches};
use futures_util::future::join_all;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{Instrument, debug, info, warn};

use super::api::CommandApi;
use crate::commands::{ApplicationCommand, CommandRegistry, Scope};
use crate::config::SyncConfig;
use crate::error::{ApiError, SyncError};
use crate::telemetry::sync_span;

/// One step of a reconciliation pass.
#[derive(Debug, Clone)]
pub enum SyncAction {
    /// The remote command already matches; record its id.
    Bind {
        command: Arc<ApplicationCommand>,
        scope: Scope,
        id: Snowflake,
    },
    Create {
        command: Arc<ApplicationCommand>,
        scope: Scope,
        payload: Value,
    },
    /// A same-name remote command has drifted; overwrite it.
    Update {
        command: Arc<ApplicationCommand>,
        scope: Scope,
        id: Snowflake,
        payload: Value,
    },
    /// Registered remotely but not declared.
    Delete {
        scope: Scope,
        id: Snowflake,
        signature: Signature,
    },
}

impl SyncAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bind { .. } => "bind",
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            Self::Bind { scope, .. }
            | Self::Create { scope, .. }
            | Self::Update { scope, .. }
            | Self::Delete { scope, .. } => *scope,
        }
    }

    pub fn signature(&self) -> Signature {
        match self {
            Self::Bind { command, scope, .. }
            | Self::Create { command, scope, .. }
            | Self::Update { command, scope, .. } => command.signature_for(*scope),
            Self::Delete { signature, .. } => signature.clone(),
        }
    }

    /// Whether the action calls the remote API.
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Bind { .. })
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind { id, .. } | Self::Update { id, .. } | Self::Delete { id, .. } => {
                write!(f, "{} {} (id {})", self.name(), self.signature(), id)
            }
            Self::Create { .. } => write!(f, "{} {}", self.name(), self.signature()),
        }
    }
}

/// Result of [`Reconciler::plan`].
#[derive(Debug, Default)]
pub struct SyncPlan {
    pub actions: Vec<SyncAction>,
    /// Scopes that could not be listed, and were left alone.
    pub failures: Vec<SyncError>,
}

impl SyncPlan {
    /// Actions that call the remote API.
    pub fn writes(&self) -> impl Iterator<Item = &SyncAction> {
        self.actions.iter().filter(|a| a.is_write())
    }
}

/// Outcome of one applied pass.
#[derive(Debug)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub bound: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub failures: Vec<SyncError>,
}

impl SyncReport {
    fn start() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            bound: 0,
            created: 0,
            updated: 0,
            deleted: 0,
            failures: Vec::new(),
        }
    }

    /// Successful remote writes.
    pub fn writes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bound, {} created, {} updated, {} deleted, {} failed in {}ms",
            self.bound,
            self.created,
            self.updated,
            self.deleted,
            self.failures.len(),
            (self.finished_at - self.started_at).num_milliseconds()
        )
    }
}

/// Brings remote registrations in line with a [`CommandRegistry`].
pub struct Reconciler {
    api: Arc<dyn CommandApi>,
    delete_unknown: bool,
    concurrency: usize,
    watched: BTreeSet<Scope>,
}

impl Reconciler {
    /// Deletes unknown commands, runs 4 remote calls at a time, and always
    /// looks at the global scope.
    pub fn new(api: Arc<dyn CommandApi>) -> Self {
        Self {
            api,
            delete_unknown: true,
            concurrency: 4,
            watched: BTreeSet::from([Scope::Global]),
        }
    }

    pub fn from_config(api: Arc<dyn CommandApi>, config: &SyncConfig) -> Self {
        Self::new(api)
            .delete_unknown(config.delete_unknown)
            .concurrency(config.concurrency)
            .watch_guilds(config.guild_ids.iter().copied())
    }

    /// Whether to delete remote commands that are not declared.
    pub fn delete_unknown(mut self, enabled: bool) -> Self {
        self.delete_unknown = enabled;
        self
    }

    /// Most remote calls in flight at once. At least 1.
    pub fn concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    /// Also reconcile these guilds when nothing is declared in them, so
    /// commands removed from a guild get deleted there.
    pub fn watch_guilds(mut self, guilds: impl IntoIterator<Item = Snowflake>) -> Self {
        self.watched.extend(guilds.into_iter().map(Scope::Guild));
        self
    }

    /// Plan and apply one pass.
    pub async fn sync(&self, registry: &CommandRegistry) -> SyncReport {
        let plan = self.plan(registry).await;
        self.apply(plan).await
    }

    /// Diff every relevant scope. Read-only.
    pub async fn plan(&self, registry: &CommandRegistry) -> SyncPlan {
        let mut scopes = registry.scopes();
        scopes.extend(self.watched.iter().copied());

        let semaphore = &Semaphore::new(self.concurrency);
        let listings = join_all(scopes.into_iter().map(|scope| async move {
            let _permit = semaphore.acquire().await.ok();
            let listing = self
                .api
                .list_commands(scope)
                .instrument(sync_span(&scope))
                .await;
            (scope, listing)
        }))
        .await;

        let mut plan = SyncPlan::default();
        for (scope, listing) in listings {
            match listing {
                Ok(remote) => {
                    let declared: Vec<_> = registry.declared_in(scope).cloned().collect();
                    let actions = diff_scope(scope, &declared, &remote, self.delete_unknown);
                    debug!(
                        scope = %scope,
                        remote = remote.len(),
                        declared = declared.len(),
                        actions = actions.len(),
                        "Planned scope"
                    );
                    plan.actions.extend(actions);
                }
                Err(source) => {
                    warn!(scope = %scope, error = %source, "Failed to list remote commands");
                    plan.failures.push(SyncError::ListFailed { scope, source });
                }
            }
        }
        plan
    }

    /// Carry out a plan. Failures are collected in the report; they never
    /// stop the rest of the pass.
    pub async fn apply(&self, plan: SyncPlan) -> SyncReport {
        let mut report = SyncReport::start();
        report.failures = plan.failures;

        let mut writes = Vec::new();
        for action in plan.actions {
            if let SyncAction::Bind { command, scope, id } = &action {
                command.binding().bind(*scope, *id);
                crate::metrics::record_sync_operation("bind", true);
                debug!(action = %action, "Bound command");
                report.bound += 1;
                continue;
            }
            writes.push(action);
        }

        let semaphore = &Semaphore::new(self.concurrency);
        let results = join_all(writes.into_iter().map(|action| async move {
            let _permit = semaphore.acquire().await.ok();
            let result = self
                .execute(&action)
                .instrument(sync_span(&action.scope()))
                .await;
            (action, result)
        }))
        .await;

        for (action, result) in results {
            crate::metrics::record_sync_operation(action.name(), result.is_ok());
            match result {
                Ok(()) => {
                    debug!(action = %action, "Applied");
                    match action {
                        SyncAction::Create { .. } => report.created += 1,
                        SyncAction::Update { .. } => report.updated += 1,
                        SyncAction::Delete { .. } => report.deleted += 1,
                        SyncAction::Bind { .. } => report.bound += 1,
                    }
                }
                Err(source) => {
                    warn!(action = %action, error = %source, "Remote command operation failed");
                    report.failures.push(SyncError::RemoteOperationFailed {
                        signature: action.signature(),
                        action: action.name(),
                        source,
                    });
                }
            }
        }

        report.finished_at = Utc::now();
        info!(
            bound = report.bound,
            created = report.created,
            updated = report.updated,
            deleted = report.deleted,
            failed = report.failures.len(),
            "Command sync finished"
        );
        report
    }

    async fn execute(&self, action: &SyncAction) -> Result<(), ApiError> {
        match action {
            SyncAction::Bind { command, scope, id } => command.binding().bind(*scope, *id),
            SyncAction::Create {
                command,
                scope,
                payload,
            } => {
                let created = self.api.create_command(*scope, payload).await?;
                command.binding().bind(*scope, created.id);
            }
            SyncAction::Update {
                command,
                scope,
                id,
                payload,
            } => {
                let updated = self.api.update_command(*scope, *id, payload).await?;
                command.binding().bind(*scope, updated.id);
            }
            SyncAction::Delete { scope, id, .. } => {
                self.api.delete_command(*scope, *id).await?;
            }
        }
        Ok(())
    }
}

/// Diff the commands declared in one scope against the ones registered
/// there.
pub fn diff_scope(
    scope: Scope,
    declared: &[Arc<ApplicationCommand>],
    remote: &[RemoteCommand],
    delete_unknown: bool,
) -> Vec<SyncAction> {
    // Commands of unlisted kinds are never matched, updated or deleted.
    let mut claimed: Vec<bool> = remote.iter().map(RemoteCommand::is_foreign).collect();
    let mut actions = Vec::new();
    let mut unmatched = Vec::new();
    let remote_payloads: Vec<Value> = remote.iter().map(|r| with_option_lists(&r.raw)).collect();

    for command in declared {
        let Some(payload) = command.payload_for(scope) else {
            continue;
        };
        let comparable = with_option_lists(&payload);
        let found = remote
            .iter()
            .enumerate()
            .find(|(i, _)| !claimed[*i] && payload_matches(&comparable, &remote_payloads[*i]));
        match found {
            Some((i, r)) => {
                claimed[i] = true;
                actions.push(SyncAction::Bind {
                    command: Arc::clone(command),
                    scope,
                    id: r.id,
                });
            }
            None => unmatched.push((command, payload)),
        }
    }

    for (command, payload) in unmatched {
        let same_name = remote.iter().enumerate().find(|(i, r)| {
            !claimed[*i] && r.name == command.name() && r.kind == Some(command.kind())
        });
        match same_name {
            Some((i, r)) => {
                claimed[i] = true;
                actions.push(SyncAction::Update {
                    command: Arc::clone(command),
                    scope,
                    id: r.id,
                    payload,
                });
            }
            None => actions.push(SyncAction::Create {
                command: Arc::clone(command),
                scope,
                payload,
            }),
        }
    }

    if delete_unknown {
        for (i, r) in remote.iter().enumerate() {
            if claimed[i] {
                continue;
            }
            if let Some(kind) = r.kind {
                actions.push(SyncAction::Delete {
                    scope,
                    id: r.id,
                    signature: Signature::new(r.name.clone(), kind, scope.guild_id()),
                });
            }
        }
    }
    actions
}

/// Copy of a command payload where the command and every subcommand or
/// group carry an `options` list. The platform leaves out empty lists, and
/// without them a command whose last option was removed would still match
/// its old registration.
fn with_option_lists(payload: &Value) -> Value {
    let mut value = payload.clone();
    fill_option_lists(&mut value, true);
    value
}

fn fill_option_lists(value: &mut Value, is_command: bool) {
    let Some(object) = value.as_object_mut() else {
        return;
    };
    let nested = object
        .get("type")
        .and_then(Value::as_u64)
        .and_then(|t| u8::try_from(t).ok())
        .is_some_and(|t| {
            t == OptionType::SubCommand.value() || t == OptionType::SubCommandGroup.value()
        });
    if !is_command && !nested {
        return;
    }
    let options = object
        .entry("options")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Some(items) = options.as_array_mut() {
        for item in items {
            fill_option_lists(item, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CommandNode, NoopHandler, ParamType, Parameter};
    use serde_json::json;

    fn echo(params: &[Parameter]) -> Arc<ApplicationCommand> {
        let node = CommandNode::slash("echo", Arc::new(NoopHandler), params).unwrap();
        Arc::new(ApplicationCommand::new(node).unwrap())
    }

    fn remote(id: u64, mut raw: Value) -> RemoteCommand {
        raw["id"] = json!(id.to_string());
        raw["application_id"] = json!("1");
        raw["version"] = json!("1");
        RemoteCommand::from_payload(raw).unwrap()
    }

    fn text_params() -> Vec<Parameter> {
        vec![Parameter::context(), Parameter::new("text", ParamType::String)]
    }

    #[test]
    fn test_matching_remote_binds() {
        let cmd = echo(&text_params());
        let existing = remote(10, cmd.payload_for(Scope::Global).unwrap());
        let actions = diff_scope(Scope::Global, &[cmd], &[existing], true);
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], SyncAction::Bind { id: Snowflake(10), .. }));
    }

    #[test]
    fn test_drifted_remote_updates() {
        let old = echo(&[Parameter::context()]);
        let existing = remote(10, old.payload_for(Scope::Global).unwrap());
        let new = echo(&text_params());
        let actions = diff_scope(Scope::Global, &[new], &[existing], true);
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], SyncAction::Update { id: Snowflake(10), .. }));
    }

    #[test]
    fn test_removed_option_updates() {
        let old = echo(&text_params());
        let existing = remote(10, old.payload_for(Scope::Global).unwrap());
        let new = echo(&[Parameter::context()]);
        let actions = diff_scope(Scope::Global, &[new], &[existing], true);
        assert!(matches!(actions[0], SyncAction::Update { .. }));
    }

    #[test]
    fn test_unknown_remote_deleted_unless_disabled() {
        let stray = remote(99, json!({"type": 1, "name": "old", "description": " "}));
        let cmd = echo(&text_params());

        let actions = diff_scope(Scope::Global, &[Arc::clone(&cmd)], std::slice::from_ref(&stray), true);
        let names: Vec<_> = actions.iter().map(SyncAction::name).collect();
        assert_eq!(names, ["create", "delete"]);
        assert_eq!(actions[1].to_string(), "delete chat_input/old@global (id 99)");

        let actions = diff_scope(Scope::Global, &[cmd], &[stray], false);
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn test_removed_subcommand_option_updates() {
        let leaf = |params: &[Parameter]| {
            let sub = CommandNode::subcommand("ban", Arc::new(NoopHandler), params).unwrap();
            let root = CommandNode::slash_group("admin").unwrap().with_subcommand(sub).unwrap();
            Arc::new(ApplicationCommand::new(root).unwrap())
        };
        let old = leaf(&[Parameter::context(), Parameter::new("user", ParamType::User)]);
        let existing = remote(3, old.payload_for(Scope::Global).unwrap());
        let new = leaf(&[Parameter::context()]);
        let actions = diff_scope(Scope::Global, &[new], std::slice::from_ref(&existing), true);
        assert!(matches!(actions[0], SyncAction::Update { .. }));

        let actions = diff_scope(Scope::Global, &[old], &[existing], true);
        assert!(matches!(actions[0], SyncAction::Bind { .. }));
    }

    #[test]
    fn test_kind_is_part_of_identity() {
        let cmd = echo(&text_params());
        let other_kind = remote(5, json!({"type": 2, "name": "echo", "description": ""}));
        let actions = diff_scope(Scope::Global, &[cmd], &[other_kind], true);
        let names: Vec<_> = actions.iter().map(SyncAction::name).collect();
        assert_eq!(names, ["create", "delete"]);
    }

    #[test]
    fn test_foreign_kind_left_alone() {
        let cmd = echo(&text_params());
        let entry_point = remote(7, json!({"type": 4, "name": "launch", "description": ""}));
        let same_name = remote(8, json!({"type": 4, "name": "echo", "description": ""}));
        let actions = diff_scope(Scope::Global, &[cmd], &[entry_point, same_name], true);
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], SyncAction::Create { .. }));
    }
}
