//! `remote-guard`: inspect configuration and replay load failures through
//! the resilience engine.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use remote_guard_core::{LoadFailure, LoadStage, RemoteError, ResilienceConfig};
use remote_guard_runtime::{HostInit, LifecycleDispatcher, LoadHooks, StaticSource};

#[derive(Parser)]
#[command(name = "remote-guard")]
#[command(about = "Resilience engine for remotely loaded artifacts", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a YAML/JSON config and print it fully resolved
    CheckConfig {
        /// Path to the config file
        path: PathBuf,
    },

    /// Feed failures for one remote through a dispatcher
    Simulate {
        /// Remote identifier
        #[arg(short, long)]
        remote: String,

        /// Stage the failure happened at (e.g. descriptor-load, artifact-load)
        #[arg(short, long, default_value = "descriptor-load")]
        stage: String,

        /// Error message reported by the host
        #[arg(short, long)]
        error: Option<String>,

        /// Number of failures to dispatch
        #[arg(short = 'n', long, default_value_t = 1)]
        repeat: u32,

        /// Optional config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Descriptor body (JSON) served by the remote's alternate source
        #[arg(long)]
        alternate_body: Option<String>,

        /// Report a successful load after the failures
        #[arg(long)]
        succeed_after: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json);

    match cli.command {
        Commands::CheckConfig { path } => {
            let config = ResilienceConfig::from_file(&path)
                .with_context(|| format!("invalid config {}", path.display()))?;
            tracing::info!(path = %path.display(), "Config is valid");
            print!("{}", serde_yaml::to_string(&config)?);
        }
        Commands::Simulate {
            remote,
            stage,
            error,
            repeat,
            config,
            alternate_body,
            succeed_after,
        } => {
            let config = match config {
                Some(path) => ResilienceConfig::from_file(&path)
                    .with_context(|| format!("invalid config {}", path.display()))?,
                None => ResilienceConfig::default(),
            };

            let mut builder = LifecycleDispatcher::builder().config(config.clone());
            if let Some(body) = alternate_body {
                let url = config
                    .alternate_sources
                    .get(&remote)
                    .with_context(|| format!("no alternate source configured for '{}'", remote))?;
                let body: serde_json::Value =
                    serde_json::from_str(&body).context("--alternate-body is not valid JSON")?;
                let source = StaticSource::new();
                source.insert(url.clone(), body);
                builder = builder.source(Arc::new(source));
            }
            let dispatcher = builder.build()?;
            dispatcher.init(&HostInit::new([remote.clone()]));

            let stage: LoadStage = stage.parse().unwrap_or_else(|e| match e {});

            for attempt in 1..=repeat {
                let mut failure = LoadFailure::new(remote.clone(), stage.clone());
                if let Some(message) = &error {
                    failure = failure.with_error(RemoteError::load(message.clone()));
                }

                let recovery = dispatcher.on_load_error(failure).await;
                let line = serde_json::json!({
                    "attempt": attempt,
                    "recovery": recovery.describe(),
                    "state": dispatcher.remote_state(&remote),
                });
                println!("{}", serde_json::to_string(&line)?);
            }

            if succeed_after {
                dispatcher.on_load_success(&remote).await;
                let line = serde_json::json!({
                    "success": true,
                    "state": dispatcher.remote_state(&remote),
                });
                println!("{}", serde_json::to_string(&line)?);
            }
        }
    }

    Ok(())
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
