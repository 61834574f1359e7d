//! Command callbacks and the values they receive.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use cordkit_proto::{Channel, Interaction, Member, Message, Role, User};

use crate::error::HandlerResult;

/// Object a command is bound to (a [`Cog`](super::Cog)), passed back on every
/// invocation.
pub type Receiver = Arc<dyn Any + Send + Sync>;

/// A resolved argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Option omitted without a default, or an entity that could not be
    /// resolved.
    None,
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    User(User),
    Member(Member),
    Role(Role),
    Channel(Channel),
    Message(Message),
}

impl ArgValue {
    /// Whether this is [`ArgValue::None`].
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, ArgValue::None)
    }

    /// Short type name for logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            ArgValue::None => "none",
            ArgValue::String(_) => "string",
            ArgValue::Integer(_) => "integer",
            ArgValue::Number(_) => "number",
            ArgValue::Boolean(_) => "boolean",
            ArgValue::User(_) => "user",
            ArgValue::Member(_) => "member",
            ArgValue::Role(_) => "role",
            ArgValue::Channel(_) => "channel",
            ArgValue::Message(_) => "message",
        }
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        ArgValue::String(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        ArgValue::String(v)
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        ArgValue::Integer(v)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        ArgValue::Number(v)
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        ArgValue::Boolean(v)
    }
}

impl<T: Into<ArgValue>> From<Option<T>> for ArgValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ArgValue::None, Into::into)
    }
}

/// Arguments for one invocation, in declaration order, keyed by the
/// callback's parameter names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Vec<(String, ArgValue)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: ArgValue) {
        self.values.push((name.into(), value));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            ArgValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            ArgValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            ArgValue::Number(n) => Some(*n),
            ArgValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            ArgValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// User argument; a member argument yields its user.
    pub fn user(&self, name: &str) -> Option<&User> {
        match self.get(name)? {
            ArgValue::User(u) => Some(u),
            ArgValue::Member(m) => m.user.as_ref(),
            _ => None,
        }
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        match self.get(name)? {
            ArgValue::Member(m) => Some(m),
            _ => None,
        }
    }

    pub fn role(&self, name: &str) -> Option<&Role> {
        match self.get(name)? {
            ArgValue::Role(r) => Some(r),
            _ => None,
        }
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        match self.get(name)? {
            ArgValue::Channel(c) => Some(c),
            _ => None,
        }
    }

    pub fn message(&self, name: &str) -> Option<&Message> {
        match self.get(name)? {
            ArgValue::Message(m) => Some(m),
            _ => None,
        }
    }
}

/// Everything a handler is called with: the receiver (if the command is
/// bound to one), the interaction, then the resolved arguments.
#[derive(Clone)]
pub struct Invocation {
    pub receiver: Option<Receiver>,
    pub interaction: Arc<Interaction>,
    pub args: Arguments,
}

impl Invocation {
    /// The receiver downcast to its concrete type.
    pub fn receiver<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.receiver.clone()?.downcast::<T>().ok()
    }
}

/// A command callback.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, invocation: Invocation) -> HandlerResult;
}

/// Adapter turning an async closure into a [`CommandHandler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, invocation: Invocation) -> HandlerResult {
        (self.0)(invocation).await
    }
}

/// Wrap an async closure as a shareable handler.
///
/// ```ignore
/// let echo = handler_fn(|inv: Invocation| async move {
///     let text = inv.args.str("text").unwrap_or_default().to_string();
///     reply(&inv.interaction, text).await
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn CommandHandler>
where
    F: Fn(Invocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Handler for commands declared without code (manifest commands). Logs the
/// invocation and does nothing else.
pub struct NoopHandler;

#[async_trait]
impl CommandHandler for NoopHandler {
    async fn handle(&self, invocation: Invocation) -> HandlerResult {
        tracing::debug!(
            interaction = %invocation.interaction.id,
            args = invocation.args.len(),
            "Manifest command invoked without a handler"
        );
        Ok(())
    }
}
