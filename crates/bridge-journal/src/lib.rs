//! bridge-journal: the append-only verdict journal.
//!
//! # Format
//!
//! The journal is a single JSON file holding the full ordered array of
//! [`JournalEntry`](bridge_core::JournalEntry) records. Every append loads
//! the whole array, validates it, pushes the new entry and rewrites the file
//! through a temporary sibling plus rename, so the file on disk is always a
//! complete, parseable array.
//!
//! A missing file is an empty journal. An unparsable file is reported as
//! [`JournalError::Corrupt`] and is never overwritten.

pub mod error;
pub mod store;

pub use error::{JournalError, JournalResult};
pub use store::JournalStore;
