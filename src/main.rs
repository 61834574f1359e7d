//! cordkit - push and serve application commands declared in a config file.
//!
//! ```text
//! cordkit <config.toml> [sync|plan|serve]
//! ```
//!
//! - `sync` (default): reconcile the `[[commands]]` manifest once
//! - `plan`: print what a sync would do, without writing
//! - `serve`: sync (unless `sync.on_startup = false`), then run the
//!   interactions endpoint

use std::sync::Arc;

use anyhow::Context;
use cordkit::commands::{CommandRegistry, Scope};
use cordkit::config::{Config, LogFormat, validation};
use cordkit::dispatch::{MemoryCache, Router};
use cordkit::http::{EndpointState, SignatureVerifier, run_http_server};
use cordkit::sync::{HttpCommandApi, Reconciler};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Sync,
    Plan,
    Serve,
}

impl Mode {
    fn parse(arg: Option<&str>) -> anyhow::Result<Self> {
        match arg {
            None | Some("sync") => Ok(Self::Sync),
            Some("plan") => Ok(Self::Plan),
            Some("serve") => Ok(Self::Serve),
            Some(other) => anyhow::bail!("unknown mode '{other}', expected sync, plan or serve"),
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "config.toml".to_string());
    let mode = Mode::parse(args.next().as_deref())?;

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;
    init_tracing(&config);

    if let Err(errors) = validation::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {config_path}", errors.len());
    }

    cordkit::metrics::init();

    info!(
        application = %config.application.id,
        commands = config.commands.len(),
        mode = ?mode,
        "Starting cordkit"
    );

    let mut registry = CommandRegistry::new();
    config
        .manifest()
        .register(&mut registry)
        .context("invalid command manifest")?;
    let registry = Arc::new(registry);

    let token = config.token()?;
    let api = Arc::new(HttpCommandApi::new(config.application.id, &token, &config.api)?);
    let reconciler = Reconciler::from_config(api, &config.sync);

    match mode {
        Mode::Plan => {
            let plan = reconciler.plan(&registry).await;
            for action in &plan.actions {
                println!("{action}");
            }
            for failure in &plan.failures {
                warn!(error = %failure, "Scope skipped");
            }
            info!(
                actions = plan.actions.len(),
                writes = plan.writes().count(),
                "Planned sync"
            );
        }
        Mode::Sync => {
            let report = reconciler.sync(&registry).await;
            println!("{report}");
            if !report.is_clean() {
                anyhow::bail!("{} sync operation(s) failed", report.failures.len());
            }
        }
        Mode::Serve => {
            if config.sync.on_startup {
                let report = reconciler.sync(&registry).await;
                if !report.is_clean() {
                    warn!(failures = report.failures.len(), "Startup sync incomplete");
                }
            }

            let verifier = SignatureVerifier::from_hex(config.public_key()?)?;
            let router = Router::new(Arc::clone(&registry))
                .with_cache(Arc::new(MemoryCache::new()))
                .on_error(|interaction, e| {
                    if e.is_schema_drift() {
                        warn!(
                            interaction = %interaction.id,
                            "Schema drift detected, run `cordkit <config> sync`"
                        );
                    }
                });

            let guilds = registry
                .scopes()
                .into_iter()
                .filter(|s| matches!(s, Scope::Guild(_)))
                .count();
            info!(commands = registry.len(), guilds, "Commands ready");

            let state = EndpointState::new(verifier, Arc::new(router));
            tokio::select! {
                result = run_http_server(config.endpoint.listen, state) => result?,
                _ = tokio::signal::ctrl_c() => info!("Shutting down"),
            }
        }
    }

    Ok(())
}
