//! JournalStore: file-backed, read-modify-write journal persistence.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use bridge_core::JournalEntry;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{JournalError, JournalResult};

/// Journal backed by a single JSON file.
///
/// There is exactly one writer per file; no locking is done here.
#[derive(Debug, Clone)]
pub struct JournalStore {
    path: PathBuf,
}

impl JournalStore {
    /// Open the journal at `path`. Nothing is touched until the first read or write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every entry, in insertion order.
    pub fn load(&self) -> JournalResult<Vec<JournalEntry>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = ?self.path, "journal absent, starting empty");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(JournalError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| JournalError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the journal contents with `entries`.
    ///
    /// Writes a temporary sibling file and renames it over the journal, so a
    /// crash leaves either the previous contents or the new ones. The
    /// temporary file is removed if any step fails.
    pub fn store(&self, entries: &[JournalEntry]) -> JournalResult<()> {
        let mut bytes = serde_json::to_vec_pretty(entries)?;
        bytes.push(b'\n');

        let write_err = |source| JournalError::Write {
            path: self.path.clone(),
            source,
        };

        let parent = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent).map_err(write_err)?;
                parent
            }
            None => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        debug!(path = ?self.path, entries = entries.len(), "journal stored");
        Ok(())
    }

    /// Append one entry and return the journal length afterwards.
    pub fn append(&self, entry: &JournalEntry) -> JournalResult<usize> {
        let mut entries = self.load()?;
        entries.push(entry.clone());
        self.store(&entries)?;
        Ok(entries.len())
    }
}
