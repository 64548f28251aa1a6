//! bridge-health: probing, monitoring and notification for the health bridge.
//!
//! # Architecture
//!
//! ```text
//! Monitor (owned loop, single writer)
//!   ├── Prober::probe()      → ProbeResult      (HttpProber over hyper)
//!   ├── classify()           → Verdict
//!   ├── JournalStore::append → durable history
//!   ├── status line          → tracing
//!   └── Notifier::notify()   → spawned, fire-and-forget (ledger, ingest)
//! ```
//!
//! Probe failures never escape the prober; they are recorded as
//! `ProbeResult::Failed` and classified `Unhealthy`. Journal I/O failures are
//! reported per cycle and the loop keeps going; a corrupt journal stops it.

mod client;

pub mod checker;
pub mod monitor;
pub mod notify;

pub use checker::{HttpProber, ProbeFuture, Prober, http_probe};
pub use monitor::{Cycle, Monitor};
pub use notify::{IngestNotifier, LedgerNotifier, Notifier, NotifyFuture, content_hash};
