//! Predicates that gate a command before its handler runs.
//!
//! Checks attach to any node of a command tree. When a leaf is invoked, the
//! checks of every node on the way down run in order, root first, after the
//! owning cog's own [`Cog::check`](super::Cog::check).

use std::sync::Arc;

use async_trait::async_trait;
use cordkit_proto::Interaction;

use crate::error::BoxError;

/// `Ok(true)` lets the invocation through, `Ok(false)` rejects it, and an
/// error rejects it with a reason.
pub type CheckResult = Result<bool, BoxError>;

/// A check run before a command's handler.
#[async_trait]
pub trait CommandCheck: Send + Sync {
    async fn check(&self, interaction: &Interaction) -> CheckResult;
}

struct FnCheck<F>(F);

#[async_trait]
impl<F> CommandCheck for FnCheck<F>
where
    F: Fn(&Interaction) -> bool + Send + Sync,
{
    async fn check(&self, interaction: &Interaction) -> CheckResult {
        Ok((self.0)(interaction))
    }
}

/// Wrap a plain predicate as a check.
///
/// ```ignore
/// let guild_only = check_fn(|interaction| interaction.guild_id.is_some());
/// ```
pub fn check_fn<F>(predicate: F) -> Arc<dyn CommandCheck>
where
    F: Fn(&Interaction) -> bool + Send + Sync + 'static,
{
    Arc::new(FnCheck(predicate))
}

struct AnyOf(Vec<Arc<dyn CommandCheck>>);

#[async_trait]
impl CommandCheck for AnyOf {
    async fn check(&self, interaction: &Interaction) -> CheckResult {
        let mut errors = Vec::new();
        for check in &self.0 {
            match check.check(interaction).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => errors.push(e.to_string()),
            }
        }
        if errors.is_empty() {
            Ok(false)
        } else {
            Err(format!("no check passed: {}", errors.join("; ")).into())
        }
    }
}

/// A check that passes when any of `checks` passes.
pub fn any_of(checks: impl IntoIterator<Item = Arc<dyn CommandCheck>>) -> Arc<dyn CommandCheck> {
    Arc::new(AnyOf(checks.into_iter().collect()))
}
