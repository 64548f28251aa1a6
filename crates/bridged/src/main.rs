//! bridged: the health bridge agent.
//!
//! Polls one service's health endpoint on a fixed interval, classifies every
//! answer and appends it to the journal:
//! - `run` loops until Ctrl-C / SIGTERM
//! - `once` performs a single cycle and prints its status line
//! - `init` writes a default bridge.toml
//!
//! # Usage
//!
//! ```text
//! bridged run --endpoint http://localhost:8980 --interval 5
//! ```

use std::path::PathBuf;

use anyhow::Context;
use bridge_health::Monitor;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod settings;
mod shutdown;

use settings::Overrides;

#[derive(Parser)]
#[command(
    name = "bridged",
    about = "Health bridge agent: poll, classify, journal",
    version
)]
struct Cli {
    /// Path to bridge.toml (default: ./bridge.toml when present).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the endpoint until interrupted.
    Run {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Run a single cycle and exit. Fails if the entry was not persisted.
    Once {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Write a default bridge.toml.
    Init {
        #[arg(default_value = settings::DEFAULT_CONFIG_FILE)]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Command::Run { overrides } => run(cli.config, overrides).await,
        Command::Once { overrides } => once(cli.config, overrides).await,
        Command::Init { path } => {
            settings::scaffold(&path)?;
            info!(path = %path.display(), "config written");
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bridged=debug,bridge_health=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(config_path: Option<PathBuf>, overrides: Overrides) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config = settings::resolve(config_path.as_deref(), &cwd, overrides)?;
    info!(
        endpoint = %config.endpoint_url(),
        journal = %config.journal_path.display(),
        "health bridge active, listening to endpoint"
    );

    let monitor = Monitor::from_config(&config);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        shutdown::shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    monitor
        .run(shutdown_rx)
        .await
        .context("monitor stopped on unrecoverable journal error")?;

    info!("health bridge stopped");
    Ok(())
}

async fn once(config_path: Option<PathBuf>, overrides: Overrides) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config = settings::resolve(config_path.as_deref(), &cwd, overrides)?;

    let mut monitor = Monitor::from_config(&config);
    let cycle = monitor.run_once().await;
    println!("{cycle}");
    monitor.flush_notifications().await;

    cycle
        .persisted
        .map(|_| ())
        .with_context(|| format!("entry not persisted to {}", config.journal_path.display()))
}
