//! Health monitor: the poll → classify → persist → report loop.
//!
//! The `Monitor` owns its prober, its journal handle and its notifiers. One
//! cycle is exposed as [`Monitor::run_once`]; [`Monitor::run`] repeats cycles
//! on a fixed interval until the shutdown signal flips.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bridge_core::{BridgeConfig, JournalEntry, classify};
use bridge_journal::{JournalResult, JournalStore};
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::checker::{HttpProber, Prober};
use crate::notify::{self, Notifier};

/// How long shutdown waits for in-flight notifications by default.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of one monitor cycle.
#[derive(Debug)]
pub struct Cycle {
    pub entry: JournalEntry,
    /// Journal length after the append, or why the append failed.
    pub persisted: JournalResult<usize>,
}

impl Cycle {
    pub fn is_persisted(&self) -> bool {
        self.persisted.is_ok()
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | spirit check: {} | response: {} | ",
            self.entry.timestamp.to_rfc3339(),
            self.entry.verdict,
            self.entry.raw_result
        )?;
        match &self.persisted {
            Ok(len) => write!(f, "journal: recorded (#{len})"),
            Err(e) => write!(f, "journal: NOT PERSISTED ({e})"),
        }
    }
}

/// Single-target health monitor.
pub struct Monitor {
    prober: Arc<dyn Prober>,
    journal: JournalStore,
    notifiers: Vec<Arc<dyn Notifier>>,
    interval: Duration,
    /// Timestamp of the previous cycle; keeps entry times strictly increasing.
    last_timestamp: Option<DateTime<Utc>>,
    /// In-flight notifications.
    pending: JoinSet<()>,
    /// Upper bound on [`Monitor::flush_notifications`].
    flush_timeout: Duration,
}

impl Monitor {
    /// Create a monitor with no notifiers.
    pub fn new(prober: Arc<dyn Prober>, journal: JournalStore, interval: Duration) -> Self {
        Self {
            prober,
            journal,
            notifiers: Vec::new(),
            interval,
            last_timestamp: None,
            pending: JoinSet::new(),
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
        }
    }

    /// Wire up the HTTP prober, journal and notifiers described by `config`.
    ///
    /// `config` is expected to have been validated already.
    pub fn from_config(config: &BridgeConfig) -> Self {
        let mut monitor = Self::new(
            Arc::new(HttpProber::from_config(config)),
            JournalStore::new(&config.journal_path),
            config.poll_interval(),
        );
        monitor.notifiers = notify::from_config(config);
        monitor.flush_timeout = config.request_timeout();
        monitor
    }

    /// Add a post-persist notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Bound the wait for in-flight notifications on shutdown.
    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    pub fn journal(&self) -> &JournalStore {
        &self.journal
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a single probe → classify → persist → report cycle.
    ///
    /// Never fails: probe errors are part of the entry and persistence
    /// errors are carried in [`Cycle::persisted`].
    pub async fn run_once(&mut self) -> Cycle {
        let result = self.prober.probe().await;
        let verdict = classify(&result);
        let entry = JournalEntry::new(self.next_timestamp(), verdict, result);

        let persisted = self.journal.append(&entry);
        let cycle = Cycle { entry, persisted };
        report(&cycle);

        if cycle.is_persisted() {
            self.dispatch(&cycle.entry);
        }
        cycle
    }

    /// Run cycles until `shutdown` changes.
    ///
    /// Shutdown is honored between cycles; a cycle already in flight runs to
    /// completion. Returns early only when the journal turns out to be
    /// corrupt, since every further append would fail the same way.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> JournalResult<()> {
        info!(
            journal = ?self.journal.path(),
            interval = ?self.interval,
            notifiers = self.notifiers.len(),
            "monitor loop starting"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let cycle = self.run_once().await;
            if let Err(e) = cycle.persisted
                && e.is_corrupt()
            {
                error!(error = %e, "journal is corrupt, stopping monitor");
                self.flush_notifications().await;
                return Err(e);
            }

            while self.pending.try_join_next().is_some() {}

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    debug!("monitor loop shutting down");
                    break;
                }
            }
        }

        self.flush_notifications().await;
        info!("monitor loop stopped");
        Ok(())
    }

    /// Wait for every notification dispatched so far, at most for the flush
    /// timeout. Whatever is still running afterwards is aborted.
    pub async fn flush_notifications(&mut self) {
        let timeout = self.flush_timeout;
        let pending = &mut self.pending;
        let drain = async { while pending.join_next().await.is_some() {} };
        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!(
                abandoned = self.pending.len(),
                ?timeout,
                "notifications still running, aborting"
            );
            self.pending.abort_all();
            while self.pending.join_next().await.is_some() {}
        }
    }

    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp
            && now <= last
        {
            now = last + chrono::Duration::microseconds(1);
        }
        self.last_timestamp = Some(now);
        now
    }

    /// Fire and forget: each notifier runs in its own task.
    fn dispatch(&mut self, entry: &JournalEntry) {
        for notifier in &self.notifiers {
            let name = notifier.name().to_string();
            let fut = notifier.notify(entry.clone());
            self.pending.spawn(async move {
                match fut.await {
                    Ok(()) => debug!(notifier = %name, "notification delivered"),
                    Err(e) => warn!(notifier = %name, error = %e, "notification failed"),
                }
            });
        }
    }
}

/// Emit the per-cycle status line.
fn report(cycle: &Cycle) {
    let entry = &cycle.entry;
    match &cycle.persisted {
        Ok(len) => info!(
            timestamp = %entry.timestamp.to_rfc3339(),
            verdict = %entry.verdict,
            response = %entry.raw_result,
            entries = len,
            "spirit check"
        ),
        Err(e) => error!(
            timestamp = %entry.timestamp.to_rfc3339(),
            verdict = %entry.verdict,
            response = %entry.raw_result,
            error = %e,
            "spirit check not persisted"
        ),
    }
}
