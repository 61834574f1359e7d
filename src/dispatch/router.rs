//! Interaction routing.
//!
//! Locates the invoked command, walks subcommands by option name, resolves
//! arguments, runs checks and cog hooks, and invokes the leaf's handler.
//! Errors are logged, counted, and passed to the host's error hook.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cordkit_proto::{CommandDataOption, Interaction, InteractionKind, Signature};
use dashmap::DashMap;
use tracing::{Instrument, debug, warn};

use super::cache::{NoCache, ObjectCache};
use super::resolve::Resolver;
use crate::commands::{
    ApplicationCommand, Arguments, CheckResult, Cog, CommandCheck, CommandHandler, CommandNode,
    CommandRegistry, Invocation,
};
use crate::error::DispatchError;
use crate::telemetry::{CommandTimer, dispatch_span};

/// Called with every failed dispatch.
pub type ErrorHook = Arc<dyn Fn(&Interaction, &DispatchError) + Send + Sync>;

/// Routes application-command interactions to their handlers.
pub struct Router {
    registry: Arc<CommandRegistry>,
    cache: Arc<dyn ObjectCache>,
    on_error: Option<ErrorHook>,
    /// Invocations per qualified command name ("admin ban").
    command_counts: DashMap<String, AtomicU64>,
}

/// A located leaf, ready to run.
struct Prepared {
    /// Top-level name; metric label.
    command: String,
    qualified_name: String,
    handler: Arc<dyn CommandHandler>,
    checks: Vec<Arc<dyn CommandCheck>>,
    cog: Option<Arc<dyn Cog>>,
    invocation: Invocation,
}

/// Where [`walk`] ended up.
struct Walked<'a> {
    node: &'a CommandNode,
    options: &'a [CommandDataOption],
    qualified_name: String,
    /// Checks of every node on the path, root first.
    checks: Vec<Arc<dyn CommandCheck>>,
}

impl Router {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self {
            registry,
            cache: Arc::new(NoCache),
            on_error: None,
            command_counts: DashMap::new(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn ObjectCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Interaction, &DispatchError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Invocation counts, most used first. Unused commands are left out.
    pub fn command_stats(&self) -> Vec<(String, u64)> {
        let mut stats: Vec<_> = self
            .command_counts
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0)
            .collect();
        stats.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        stats
    }

    /// Route one interaction and run its handler.
    ///
    /// Failures are recorded and reported to the error hook before being
    /// returned; nothing is sent back to the platform from here.
    pub async fn dispatch(&self, interaction: Arc<Interaction>) -> Result<(), DispatchError> {
        let span = dispatch_span(&interaction);
        let result = self.run(&interaction).instrument(span).await;

        if let Err(e) = &result {
            let command = interaction.command_name().unwrap_or("<none>");
            crate::metrics::record_command_error(command, e.error_code());
            if e.is_schema_drift() {
                warn!(command, interaction = %interaction.id, error = %e, "Declared and registered commands disagree");
            } else {
                debug!(command, interaction = %interaction.id, error = %e, "Dispatch failed");
            }
            if let Some(hook) = &self.on_error {
                hook(&interaction, e);
            }
        }
        result
    }

    async fn run(&self, interaction: &Arc<Interaction>) -> Result<(), DispatchError> {
        let prepared = self.prepare(interaction)?;
        run_checks(&prepared, interaction).await?;

        let Prepared {
            command,
            qualified_name,
            handler,
            cog,
            invocation,
            ..
        } = prepared;
        self.command_counts
            .entry(qualified_name.clone())
            .or_default()
            .fetch_add(1, Ordering::Relaxed);

        let _timer = CommandTimer::new(command);
        if let Some(cog) = &cog {
            cog.before_invoke(interaction).await;
        }
        debug!(command = %qualified_name, args = invocation.args.len(), "Invoking handler");
        let result = handler.handle(invocation).await;
        if let Some(cog) = &cog {
            cog.after_invoke(interaction).await;
        }
        result.map_err(DispatchError::Handler)
    }

    /// Find the declared command an interaction refers to: by the id the
    /// platform gave it, then by guild signature, then by global signature.
    pub fn locate(&self, interaction: &Interaction) -> Result<&Arc<ApplicationCommand>, DispatchError> {
        if interaction.kind != InteractionKind::ApplicationCommand {
            return Err(DispatchError::NotApplicationCommand);
        }
        let data = interaction
            .data
            .as_ref()
            .ok_or(DispatchError::NotApplicationCommand)?;

        if let Some(command) = self.registry.by_remote_id(data.id) {
            return Ok(command);
        }
        if let Some(guild) = data.guild_id.or(interaction.guild_id) {
            let signature = Signature::new(data.name.as_str(), data.kind, Some(guild));
            if let Some(command) = self.registry.by_signature(&signature) {
                return Ok(command);
            }
        }
        let signature = Signature::new(data.name.as_str(), data.kind, None);
        self.registry
            .by_signature(&signature)
            .ok_or_else(|| DispatchError::UnknownCommand(data.name.clone()))
    }

    fn prepare(&self, interaction: &Arc<Interaction>) -> Result<Prepared, DispatchError> {
        let command = self.locate(interaction)?;
        let Some(data) = interaction.data.as_ref() else {
            return Err(DispatchError::NotApplicationCommand);
        };

        let Walked {
            node,
            options,
            qualified_name,
            checks,
        } = walk(command.root(), &data.options)?;
        let handler = node
            .handler()
            .ok_or_else(|| DispatchError::InvalidCommandType {
                command: qualified_name.clone(),
                kind: node.kind().to_string(),
            })?;

        // Reject anything the node does not declare before resolving.
        if let Some(extra) = options.iter().find(|o| node.option(&o.name).is_none()) {
            return Err(DispatchError::UnexpectedArgument {
                command: qualified_name,
                option: extra.name.clone(),
            });
        }

        let resolver = Resolver::new(self.cache.as_ref(), &data.resolved, interaction.guild_id);
        let mut args = Arguments::new();
        for descriptor in node.options() {
            let supplied = options
                .iter()
                .find(|o| o.name == descriptor.name)
                .and_then(|o| o.value.as_ref());
            let value = match supplied {
                Some(raw) => resolver.option(descriptor, raw)?,
                None => descriptor.default.clone(),
            };
            args.push(descriptor.param_name.as_str(), value);
        }
        if let Some(target) = node.target() {
            args.push(target.name.as_str(), resolver.target(data, target)?);
        }

        Ok(Prepared {
            command: command.name().to_string(),
            qualified_name,
            handler: Arc::clone(handler),
            checks,
            cog: command.cog().cloned(),
            invocation: Invocation {
                receiver: command.receiver().cloned(),
                interaction: Arc::clone(interaction),
                args,
            },
        })
    }
}

/// The cog's check, then every node check on the path. The first rejection
/// stops the invocation.
async fn run_checks(prepared: &Prepared, interaction: &Interaction) -> Result<(), DispatchError> {
    let failed = |reason| DispatchError::CheckFailed {
        command: prepared.qualified_name.clone(),
        reason,
    };
    if let Some(cog) = &prepared.cog {
        verdict(cog.check(interaction).await).map_err(failed)?;
    }
    for check in &prepared.checks {
        verdict(check.check(interaction).await).map_err(failed)?;
    }
    Ok(())
}

fn verdict(result: CheckResult) -> Result<(), String> {
    match result {
        Ok(true) => Ok(()),
        Ok(false) => Err("a check rejected the invocation".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Descend from `root` through subcommand options to the invoked leaf.
fn walk<'a>(
    root: &'a CommandNode,
    options: &'a [CommandDataOption],
) -> Result<Walked<'a>, DispatchError> {
    let mut node = root;
    let mut options = options;
    let mut qualified_name = root.name().to_string();
    let mut checks = root.checks().to_vec();

    while !node.is_leaf() {
        let Some(selected) = options.first().filter(|o| o.kind.is_subcommand()) else {
            return Err(DispatchError::MissingSubcommand {
                command: qualified_name,
            });
        };
        let child = node
            .child(&selected.name)
            .ok_or_else(|| DispatchError::UnknownSubcommand {
                command: qualified_name.clone(),
                name: selected.name.clone(),
            })?;
        qualified_name.push(' ');
        qualified_name.push_str(child.name());
        checks.extend_from_slice(child.checks());
        node = child;
        options = &selected.options;
    }
    Ok(Walked {
        node,
        options,
        qualified_name,
        checks,
    })
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("commands", &self.registry.len())
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{ParamType, Parameter, handler_fn};
    use cordkit_proto::Snowflake;
    use parking_lot::Mutex;
    use serde_json::json;

    fn interaction(data: serde_json::Value) -> Arc<Interaction> {
        let value = json!({
            "id": "1",
            "application_id": "2",
            "type": 2,
            "guild_id": "9",
            "data": data,
        });
        Arc::new(serde_json::from_value(value).unwrap())
    }

    fn recording_registry(seen: Arc<Mutex<Vec<Arguments>>>) -> CommandRegistry {
        let handler = handler_fn(move |inv: Invocation| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().push(inv.args);
                Ok(())
            }
        });
        let echo = CommandNode::slash(
            "echo",
            handler,
            &[
                Parameter::context(),
                Parameter::new("text", ParamType::String),
                Parameter::new("times", ParamType::Integer).with_default(1i64),
            ],
        )
        .unwrap();
        let mut registry = CommandRegistry::new();
        registry.add(ApplicationCommand::new(echo).unwrap()).unwrap();
        registry
    }

    #[tokio::test]
    async fn test_dispatch_fills_defaults() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new(Arc::new(recording_registry(Arc::clone(&seen))));

        router
            .dispatch(interaction(json!({
                "id": "50", "name": "echo", "type": 1,
                "options": [{"name": "text", "type": 3, "value": "hi"}]
            })))
            .await
            .unwrap();

        let seen = seen.lock();
        assert_eq!(seen[0].str("text"), Some("hi"));
        assert_eq!(seen[0].integer("times"), Some(1));
        assert_eq!(router.command_stats(), vec![("echo".to_string(), 1)]);
    }

    #[tokio::test]
    async fn test_unexpected_argument_skips_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let hooked = Arc::new(Mutex::new(Vec::new()));
        let hook_log = Arc::clone(&hooked);
        let router = Router::new(Arc::new(recording_registry(Arc::clone(&seen))))
            .on_error(move |_, e| hook_log.lock().push(e.error_code()));

        let err = router
            .dispatch(interaction(json!({
                "id": "50", "name": "echo", "type": 1,
                "options": [
                    {"name": "text", "type": 3, "value": "hi"},
                    {"name": "volume", "type": 4, "value": 11}
                ]
            })))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::UnexpectedArgument { ref option, .. } if option == "volume"));
        assert!(seen.lock().is_empty());
        assert_eq!(*hooked.lock(), vec!["unexpected_argument"]);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let router = Router::new(Arc::new(CommandRegistry::new()));
        let err = router
            .dispatch(interaction(json!({"id": "50", "name": "nope", "type": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnknownCommand(name) if name == "nope"));
    }

    #[test]
    fn test_locate_prefers_remote_id() {
        let registry = recording_registry(Arc::new(Mutex::new(Vec::new())));
        registry.commands()[0]
            .binding()
            .bind(crate::commands::Scope::Global, Snowflake(77));
        let router = Router::new(Arc::new(registry));

        let renamed = interaction(json!({"id": "77", "name": "renamed", "type": 1}));
        assert_eq!(router.locate(&renamed).unwrap().name(), "echo");
    }

    #[test]
    fn test_ping_is_not_a_command() {
        let router = Router::new(Arc::new(CommandRegistry::new()));
        let ping: Interaction =
            serde_json::from_value(json!({"id": "1", "application_id": "2", "type": 1})).unwrap();
        assert!(matches!(
            router.locate(&ping),
            Err(DispatchError::NotApplicationCommand)
        ));
    }

    #[tokio::test]
    async fn test_metrics_labelled_by_top_level_name() {
        crate::metrics::init();
        let ban = CommandNode::subcommand(
            "ban",
            handler_fn(|_inv: Invocation| async { Ok(()) }),
            &[Parameter::context()],
        )
        .unwrap();
        let root = CommandNode::slash_group("metricsadmin")
            .and_then(|n| n.with_subcommand(ban))
            .unwrap();
        let mut registry = CommandRegistry::new();
        registry.add(ApplicationCommand::new(root).unwrap()).unwrap();
        let router = Router::new(Arc::new(registry));

        router
            .dispatch(interaction(json!({
                "id": "60", "name": "metricsadmin", "type": 1,
                "options": [{"name": "ban", "type": 1}]
            })))
            .await
            .unwrap();
        router
            .dispatch(interaction(json!({
                "id": "60", "name": "metricsadmin", "type": 1,
                "options": [{"name": "kick", "type": 1}]
            })))
            .await
            .unwrap_err();

        let counter = crate::metrics::COMMAND_COUNTER.get().unwrap();
        assert_eq!(counter.with_label_values(&["metricsadmin"]).get(), 1);
        assert_eq!(counter.with_label_values(&["metricsadmin ban"]).get(), 0);
        let errors = crate::metrics::COMMAND_ERRORS.get().unwrap();
        assert_eq!(
            errors
                .with_label_values(&["metricsadmin", "unknown_subcommand"])
                .get(),
            1
        );
        assert_eq!(router.command_stats(), vec![("metricsadmin ban".to_string(), 1)]);
    }
}
