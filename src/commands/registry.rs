//! The set of declared commands.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use cordkit_proto::{Interaction, Signature, Snowflake};
use tracing::debug;

use super::command::{ApplicationCommand, Scope, distinct_scopes};
use super::check::CheckResult;
use super::handler::Receiver;
use crate::error::DeclarationError;

/// A group of related commands sharing state.
///
/// The registry attaches the cog itself as the receiver of every command it
/// returns; handlers get it back through
/// [`Invocation::receiver`](super::Invocation::receiver).
///
/// The hooks run around every command of the cog, subcommands included:
/// [`check`](Self::check) ahead of the commands' own checks, then
/// [`before_invoke`](Self::before_invoke), the handler, and
/// [`after_invoke`](Self::after_invoke), which runs whether or not the
/// handler succeeded.
#[async_trait]
pub trait Cog: Send + Sync + 'static {
    fn commands(&self) -> Result<Vec<ApplicationCommand>, DeclarationError>;

    async fn check(&self, _interaction: &Interaction) -> CheckResult {
        Ok(true)
    }

    async fn before_invoke(&self, _interaction: &Interaction) {}

    async fn after_invoke(&self, _interaction: &Interaction) {}
}

/// Owns every declared top-level command.
///
/// Commands are keyed by [`Signature`]; declaring the same name and type
/// twice in one scope is rejected.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: Vec<Arc<ApplicationCommand>>,
    signatures: HashMap<Signature, usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command. On conflict nothing is added.
    pub fn add(
        &mut self,
        command: ApplicationCommand,
    ) -> Result<Arc<ApplicationCommand>, DeclarationError> {
        let signatures = command.signatures();
        if let Some(taken) = signatures.iter().find(|s| self.signatures.contains_key(*s)) {
            return Err(DeclarationError::DuplicateSignature(taken.clone()));
        }

        let index = self.commands.len();
        for signature in signatures {
            debug!(signature = %signature, "Declared command");
            self.signatures.insert(signature, index);
        }
        let command = Arc::new(command);
        self.commands.push(Arc::clone(&command));
        Ok(command)
    }

    /// Add every command of a cog, bound to the cog. All-or-nothing: on
    /// error none of the cog's commands are added.
    pub fn add_cog<C: Cog>(&mut self, cog: Arc<C>) -> Result<usize, DeclarationError> {
        let mut commands = cog.commands()?;

        let mut seen = BTreeSet::new();
        for command in &commands {
            for signature in command.signatures() {
                if self.signatures.contains_key(&signature) || !seen.insert(signature.clone()) {
                    return Err(DeclarationError::DuplicateSignature(signature));
                }
            }
        }

        let hooks: Arc<dyn Cog> = Arc::clone(&cog) as Arc<dyn Cog>;
        let receiver: Receiver = cog;
        let count = commands.len();
        for mut command in commands.drain(..) {
            command.set_cog(Arc::clone(&hooks), Arc::clone(&receiver));
            self.add(command)?;
        }
        Ok(count)
    }

    pub fn commands(&self) -> &[Arc<ApplicationCommand>] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn by_signature(&self, signature: &Signature) -> Option<&Arc<ApplicationCommand>> {
        self.signatures
            .get(signature)
            .and_then(|&index| self.commands.get(index))
    }

    /// The command the platform assigned `id` to, if it has been bound.
    pub fn by_remote_id(&self, id: Snowflake) -> Option<&Arc<ApplicationCommand>> {
        self.commands.iter().find(|c| c.binding().contains_id(id))
    }

    /// Every scope at least one command is registered in.
    pub fn scopes(&self) -> BTreeSet<Scope> {
        distinct_scopes(self.commands.iter().map(|c| &**c))
    }

    /// Commands registered in `scope`.
    pub fn declared_in(&self, scope: Scope) -> impl Iterator<Item = &Arc<ApplicationCommand>> {
        self.commands.iter().filter(move |c| c.in_scope(scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::handler::{Invocation, handler_fn};
    use crate::commands::node::CommandNode;
    use crate::commands::option::Parameter;
    use cordkit_proto::CommandType;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ping(name: &str) -> ApplicationCommand {
        let node = CommandNode::slash(
            name,
            handler_fn(|_inv: Invocation| async { Ok(()) }),
            &[Parameter::context()],
        )
        .unwrap();
        ApplicationCommand::new(node).unwrap()
    }

    #[test]
    fn test_duplicate_signature_rejected() {
        let mut registry = CommandRegistry::new();
        registry.add(ping("ping")).unwrap();
        let err = registry.add(ping("ping")).unwrap_err();
        assert!(matches!(err, DeclarationError::DuplicateSignature(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_name_in_other_scope_allowed() {
        let mut registry = CommandRegistry::new();
        registry.add(ping("ping")).unwrap();
        registry.add(ping("ping").guilds([Snowflake(4)])).unwrap();
        assert_eq!(registry.len(), 2);

        let guild_sig = Signature::new("ping", CommandType::ChatInput, Some(Snowflake(4)));
        assert!(registry.by_signature(&guild_sig).is_some_and(|c| c.is_guild()));
        assert_eq!(registry.scopes().len(), 2);
        assert_eq!(registry.declared_in(Scope::Guild(Snowflake(4))).count(), 1);
    }

    #[test]
    fn test_by_remote_id() {
        let mut registry = CommandRegistry::new();
        let cmd = registry.add(ping("ping")).unwrap();
        assert!(registry.by_remote_id(Snowflake(50)).is_none());
        cmd.binding().bind(Scope::Global, Snowflake(50));
        assert!(registry.by_remote_id(Snowflake(50)).is_some());
    }

    struct Counter {
        hits: AtomicUsize,
    }

    impl Cog for Counter {
        fn commands(&self) -> Result<Vec<ApplicationCommand>, DeclarationError> {
            let bump = handler_fn(|inv: Invocation| async move {
                if let Some(counter) = inv.receiver::<Counter>() {
                    counter.hits.fetch_add(1, Ordering::Relaxed);
                }
                Ok(())
            });
            let node = CommandNode::slash("bump", bump, &[Parameter::receiver(), Parameter::context()])?;
            Ok(vec![ApplicationCommand::new(node)?, ping("peek")])
        }
    }

    #[test]
    fn test_add_cog_attaches_receiver() {
        let mut registry = CommandRegistry::new();
        let cog = Arc::new(Counter { hits: AtomicUsize::new(0) });
        assert_eq!(registry.add_cog(Arc::clone(&cog)).unwrap(), 2);
        assert!(registry.commands().iter().all(|c| c.receiver().is_some()));

        let err = registry.add_cog(cog).unwrap_err();
        assert!(matches!(err, DeclarationError::DuplicateSignature(_)));
        assert_eq!(registry.len(), 2);
    }
}
