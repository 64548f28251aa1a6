//! Configuration resolution: bridge.toml, then command-line overrides.

use std::path::{Path, PathBuf};

use anyhow::Context;
use bridge_core::BridgeConfig;
use clap::Args;
use tracing::debug;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "bridge.toml";

/// Per-run overrides for values normally read from bridge.toml.
#[derive(Debug, Default, Args)]
pub struct Overrides {
    /// Base URL of the monitored service (e.g. http://localhost:8980).
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Health-check path on the monitored service.
    #[arg(long)]
    pub path: Option<String>,

    /// Seconds between cycles.
    #[arg(long)]
    pub interval: Option<f64>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Journal file location.
    #[arg(long)]
    pub journal: Option<PathBuf>,
}

impl Overrides {
    fn apply(self, config: &mut BridgeConfig) {
        if let Some(endpoint) = self.endpoint {
            config.endpoint_base_url = endpoint;
        }
        if let Some(path) = self.path {
            config.endpoint_path = path;
        }
        if let Some(interval) = self.interval {
            config.poll_interval_secs = interval;
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout_secs = timeout;
        }
        if let Some(journal) = self.journal {
            config.journal_path = journal;
        }
    }
}

/// Load, override and validate the agent configuration.
///
/// An explicit `config_path` must exist. Without one, `fallback_dir`'s
/// bridge.toml is used if present, otherwise the built-in defaults.
pub fn resolve(
    config_path: Option<&Path>,
    fallback_dir: &Path,
    overrides: Overrides,
) -> anyhow::Result<BridgeConfig> {
    let mut config = match config_path {
        Some(path) => BridgeConfig::from_file(path)?,
        None => {
            let candidate = fallback_dir.join(DEFAULT_CONFIG_FILE);
            if candidate.is_file() {
                debug!(path = ?candidate, "using config from working directory");
                BridgeConfig::from_file(&candidate)?
            } else {
                debug!("no config file, using defaults");
                BridgeConfig::default()
            }
        }
    };

    overrides.apply(&mut config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Write a default bridge.toml to `path`, refusing to overwrite.
pub fn scaffold(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists, not overwriting", path.display());
    }
    let rendered = BridgeConfig::default().to_toml_string()?;
    std::fs::write(path, rendered)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
