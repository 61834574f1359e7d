//! Telemetry utilities for dispatch timing and tracing spans.

use std::time::Instant;

use cordkit_proto::Interaction;
use tracing::{Span, debug_span};

/// Guard for timing command dispatch and recording metrics.
///
/// Records dispatch latency when dropped.
pub struct CommandTimer {
    command: String,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_command(&self.command, duration);
    }
}

/// Span for dispatching one interaction.
pub fn dispatch_span(interaction: &Interaction) -> Span {
    debug_span!(
        "command.dispatch",
        command = interaction.command_name().unwrap_or("<none>"),
        interaction = %interaction.id,
        guild = interaction.guild_id.map(|g| g.get()),
        user = interaction.invoker().map(|u| u.id.get()),
    )
}

/// Span for reconciling one scope.
pub fn sync_span(scope: &crate::commands::Scope) -> Span {
    debug_span!("command.sync", scope = %scope)
}
