//! Prometheus metrics for cordkit.
//!
//! Exposed by the interactions endpoint on `GET /metrics`.
//!
//! - `cordkit_command_total{command}` - Commands dispatched
//! - `cordkit_command_duration_seconds{command}` - Dispatch latency histogram
//! - `cordkit_command_errors_total{command,error}` - Dispatch failures
//!
//! `command` is always the top-level command name; subcommands are counted
//! under their root. Per-subcommand counts are kept by
//! [`Router::command_stats`](crate::dispatch::Router::command_stats).
//! - `cordkit_sync_operations_total{action,result}` - Remote writes made by
//!   reconciliation
//! - `cordkit_interactions_total{kind}` - Interactions received over HTTP
//!
//! Recording before [`init`] is a no-op.

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Dispatch
// ========================================================================

/// Commands dispatched, by top-level command name.
pub static COMMAND_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

/// Dispatch latency by top-level command name, handler included.
pub static COMMAND_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Dispatch errors by top-level command name and error code.
pub static COMMAND_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Reconciliation and endpoint
// ========================================================================

/// Remote create/update/delete calls and binds.
pub static SYNC_OPERATIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Interactions received over HTTP, by kind.
pub static INTERACTIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Safe to call more than once; later calls do nothing.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            if $metric.get().is_none() {
                match $init {
                    Ok(m) => {
                        if let Err(e) = r.register(Box::new(m.clone())) {
                            tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                        }
                        let _ = $metric.set(m);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                    }
                }
            }
        };
    }

    register!(COMMAND_COUNTER, IntCounterVec::new(Opts::new("cordkit_command_total", "Application commands dispatched"), &["command"]));
    register!(COMMAND_LATENCY, HistogramVec::new(
        HistogramOpts::new("cordkit_command_duration_seconds", "Application command dispatch latency")
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["command"]));
    register!(COMMAND_ERRORS, IntCounterVec::new(Opts::new("cordkit_command_errors_total", "Application command dispatch errors"), &["command", "error"]));
    register!(SYNC_OPERATIONS, IntCounterVec::new(Opts::new("cordkit_sync_operations_total", "Reconciliation operations"), &["action", "result"]));
    register!(INTERACTIONS, IntCounterVec::new(Opts::new("cordkit_interactions_total", "Interactions received over HTTP"), &["kind"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

/// Record a dispatched command with latency.
#[inline]
pub fn record_command(command: &str, duration_secs: f64) {
    if let Some(c) = COMMAND_COUNTER.get() {
        c.with_label_values(&[command]).inc();
    }
    if let Some(h) = COMMAND_LATENCY.get() {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}

/// Record a dispatch error.
#[inline]
pub fn record_command_error(command: &str, error: &str) {
    if let Some(c) = COMMAND_ERRORS.get() {
        c.with_label_values(&[command, error]).inc();
    }
}

/// Record one reconciliation operation (`bind`, `create`, `update`,
/// `delete`) and whether it succeeded.
#[inline]
pub fn record_sync_operation(action: &str, ok: bool) {
    if let Some(c) = SYNC_OPERATIONS.get() {
        c.with_label_values(&[action, if ok { "ok" } else { "error" }])
            .inc();
    }
}

#[inline]
pub fn record_interaction(kind: &str) {
    if let Some(c) = INTERACTIONS.get() {
        c.with_label_values(&[kind]).inc();
    }
}
