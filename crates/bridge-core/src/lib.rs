//! bridge-core: shared types, classification and configuration for the
//! health bridge agent.
//!
//! A probe produces a [`ProbeResult`], [`classify`] turns it into a
//! [`Verdict`], and the pair is stamped into a [`JournalEntry`] by the
//! monitor loop.

pub mod classify;
pub mod config;
pub mod types;

pub use classify::classify;
pub use config::{BridgeConfig, ConfigError, IngestConfig, LedgerConfig};
pub use types::*;
