//! Error types for the journal store.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for journal operations.
pub type JournalResult<T> = Result<T, JournalError>;

/// Errors that can occur while loading or rewriting the journal.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("failed to read journal {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write journal {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file exists but is not a valid sequence of entries.
    #[error("journal {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl JournalError {
    /// Corruption cannot be fixed by retrying; everything else might be.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, JournalError::Corrupt { .. })
    }
}
