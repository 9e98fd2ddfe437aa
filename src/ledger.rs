//! Rename ledger for reversing renames.
//!
//! Every forward rename is recorded as a hash of the new name mapped to the
//! old name sealed under a key derived from the new name. Repeating the same
//! transition increments a counter; reversing it decrements the counter and
//! drops the record at zero.
//!
//! The ledger is persisted as JSON. A missing file is an empty ledger.

use crate::cipher::{CipherError, decrypt_name, encrypt_name, name_hash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const LEDGER_VERSION: u32 = 1;
const LEDGER_FILE_NAME: &str = "ledger.json";

/// Errors that can occur while reading, writing or updating the ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Failed to read ledger {}: {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write ledger {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid ledger format in {}: {reason}", .path.display())]
    InvalidFormat { path: PathBuf, reason: String },
    /// Reverse requested for a transition that was never recorded.
    #[error("No ledger record for '{current}' -> '{previous}'")]
    NoMatchingRecord { previous: String, current: String },
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// One recorded `previous -> current` transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub hashed_current_name: String,
    pub encrypted_previous_name: String,
    pub count: u64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl LedgerRecord {
    fn matches(&self, encrypted: &str, hashed: &str) -> bool {
        self.encrypted_previous_name == encrypted && self.hashed_current_name == hashed
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    records: Vec<LedgerRecord>,
}

/// Default ledger location inside the data directory.
pub fn default_ledger_path() -> PathBuf {
    crate::dictionary::data_dir().join(LEDGER_FILE_NAME)
}

/// The set of recorded transitions, optionally backed by a file.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    path: Option<PathBuf>,
    records: Vec<LedgerRecord>,
}

impl Ledger {
    /// A ledger that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the ledger stored at `path`; a missing file yields an empty ledger.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        let mut ledger = Self {
            path: Some(path.to_path_buf()),
            records: Vec::new(),
        };
        if !path.exists() {
            debug!(path = %path.display(), "ledger file not found, starting empty");
            return Ok(ledger);
        }

        let content = fs::read_to_string(path).map_err(|source| LedgerError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let file: LedgerFile =
            serde_json::from_str(&content).map_err(|e| LedgerError::InvalidFormat {
                path: path.to_path_buf(),
                reason: format!("JSON parse error: {}", e),
            })?;
        if file.version != LEDGER_VERSION {
            return Err(LedgerError::InvalidFormat {
                path: path.to_path_buf(),
                reason: format!("unsupported version {}", file.version),
            });
        }
        if file.records.iter().any(|r| r.count == 0) {
            return Err(LedgerError::InvalidFormat {
                path: path.to_path_buf(),
                reason: "record with zero count".to_string(),
            });
        }
        ledger.records = file.records;
        Ok(ledger)
    }

    /// Persists the ledger if it is file-backed.
    pub fn save(&self) -> LedgerResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let write_err = |source| LedgerError::WriteFailed {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let file = LedgerFile {
            version: LEDGER_VERSION,
            records: self.records.clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|e| {
            write_err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {}", e),
            ))
        })?;
        fs::write(path, json).map_err(write_err)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn records(&self) -> &[LedgerRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn key(previous: &str, current: &str) -> LedgerResult<(String, String)> {
        Ok((encrypt_name(current, previous)?, name_hash(current)))
    }

    /// Current count for the `previous -> current` transition, 0 if absent.
    pub fn count(&self, previous: &str, current: &str) -> LedgerResult<u64> {
        let (encrypted, hashed) = Self::key(previous, current)?;
        Ok(self
            .records
            .iter()
            .find(|r| r.matches(&encrypted, &hashed))
            .map_or(0, |r| r.count))
    }

    /// Records a forward rename `previous -> current`.
    ///
    /// Returns the count of the transition after the update.
    pub fn record_forward(&mut self, previous: &str, current: &str) -> LedgerResult<u64> {
        let (encrypted, hashed) = Self::key(previous, current)?;
        let now = Utc::now();
        if let Some(record) = self
            .records
            .iter_mut()
            .find(|r| r.matches(&encrypted, &hashed))
        {
            record.count += 1;
            record.updated = now;
            return Ok(record.count);
        }
        self.records.push(LedgerRecord {
            hashed_current_name: hashed,
            encrypted_previous_name: encrypted,
            count: 1,
            created: now,
            updated: now,
        });
        Ok(1)
    }

    /// Records that the forward transition `previous -> current` was undone.
    ///
    /// Returns the remaining count; the record is removed when it reaches 0.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NoMatchingRecord`] if the transition was never recorded.
    pub fn record_reverse(&mut self, previous: &str, current: &str) -> LedgerResult<u64> {
        let (encrypted, hashed) = Self::key(previous, current)?;
        let index = self
            .records
            .iter()
            .position(|r| r.matches(&encrypted, &hashed))
            .ok_or_else(|| LedgerError::NoMatchingRecord {
                previous: previous.to_string(),
                current: current.to_string(),
            })?;

        let record = &mut self.records[index];
        record.count -= 1;
        if record.count == 0 {
            self.records.remove(index);
            return Ok(0);
        }
        record.updated = Utc::now();
        Ok(record.count)
    }

    /// Every previous name recorded for `current`, most recently updated first.
    ///
    /// Candidates that share the hash but cannot be opened with `current`
    /// are skipped.
    pub fn lookup_reverse_all(&self, current: &str) -> Vec<String> {
        let hashed = name_hash(current);
        let mut candidates: Vec<&LedgerRecord> = self
            .records
            .iter()
            .filter(|r| r.hashed_current_name == hashed)
            .collect();
        candidates.sort_by(|a, b| b.updated.cmp(&a.updated));

        let mut names: Vec<String> = Vec::new();
        for record in candidates {
            match decrypt_name(current, &record.encrypted_previous_name) {
                Ok(name) if !names.contains(&name) => names.push(name),
                Ok(_) => {}
                Err(e) => debug!(current, error = %e, "skipping undecryptable ledger record"),
            }
        }
        names
    }

    /// The most recent previous name recorded for `current`.
    pub fn lookup_reverse(&self, current: &str) -> Option<String> {
        self.lookup_reverse_all(current).into_iter().next()
    }
}
