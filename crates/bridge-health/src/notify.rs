//! Post-persist notification hooks.
//!
//! A [`Notifier`] receives every entry the monitor managed to persist. The
//! monitor spawns each notification as its own task, so a slow or failing
//! hook never holds up the next cycle.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use bridge_core::{BridgeConfig, JournalEntry};
use bytes::Bytes;
use http::Method;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::client;

/// Boxed future returned by [`Notifier::notify`].
pub type NotifyFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// External side effect triggered after an entry is persisted.
pub trait Notifier: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn notify(&self, entry: JournalEntry) -> NotifyFuture;
}

/// SHA-256 hex digest of the entry's JSON encoding.
pub fn content_hash(entry: &JournalEntry) -> anyhow::Result<String> {
    let bytes = serde_json::to_vec(entry).context("failed to encode entry")?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Hands the content hash of each entry to an external ledger client.
///
/// Runs `command args... <hash>` and treats a non-zero exit as failure. A
/// command still running after `timeout` is killed.
#[derive(Debug, Clone)]
pub struct LedgerNotifier {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl LedgerNotifier {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }
}

impl Notifier for LedgerNotifier {
    fn name(&self) -> &str {
        "ledger"
    }

    fn notify(&self, entry: JournalEntry) -> NotifyFuture {
        let command = self.command.clone();
        let args = self.args.clone();
        let timeout = self.timeout;
        Box::pin(async move {
            let hash = content_hash(&entry)?;
            let run = tokio::process::Command::new(&command)
                .args(&args)
                .arg(&hash)
                .kill_on_drop(true)
                .output();
            let output = tokio::time::timeout(timeout, run)
                .await
                .with_context(|| format!("ledger command {command:?} timed out"))?
                .with_context(|| format!("failed to run ledger command {command:?}"))?;

            if !output.status.success() {
                bail!(
                    "ledger command {command:?} exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }

            debug!(
                %hash,
                stdout = %String::from_utf8_lossy(&output.stdout).trim(),
                "entry hash pushed to ledger"
            );
            Ok(())
        })
    }
}

/// Submits each entry as JSON to a downstream memory store.
#[derive(Debug, Clone)]
pub struct IngestNotifier {
    url: String,
    timeout: Duration,
}

impl IngestNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

impl Notifier for IngestNotifier {
    fn name(&self) -> &str {
        "ingest"
    }

    fn notify(&self, entry: JournalEntry) -> NotifyFuture {
        let url = self.url.clone();
        let timeout = self.timeout;
        Box::pin(async move {
            let body = Bytes::from(serde_json::to_vec(&entry).context("failed to encode entry")?);
            let reply = tokio::time::timeout(
                timeout,
                client::send(Method::POST, &url, Some((body, "application/json"))),
            )
            .await
            .with_context(|| format!("ingest request to {url} timed out"))?
            .with_context(|| format!("ingest request to {url} failed"))?;

            if !reply.status.is_success() {
                bail!("ingest endpoint {url} answered {}", reply.status);
            }
            debug!(%url, "entry submitted downstream");
            Ok(())
        })
    }
}

/// Build the notifiers enabled in `config`.
pub fn from_config(config: &BridgeConfig) -> Vec<Arc<dyn Notifier>> {
    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();
    if let Some(ledger) = &config.ledger {
        notifiers.push(Arc::new(LedgerNotifier::new(
            ledger.command.clone(),
            ledger.args.clone(),
            config.request_timeout(),
        )));
    }
    if let Some(ingest) = &config.ingest {
        notifiers.push(Arc::new(IngestNotifier::new(
            ingest.url.clone(),
            config.request_timeout(),
        )));
    }
    notifiers
}
