//! Ledger-backed rename execution.
//!
//! Each rename runs as a small state machine:
//! `Planned -> LedgerUpdated -> Renamed`, `Planned -> Skipped` when the
//! destination may not be replaced, or `Failed` from any step.
//! The ledger is mutated and persisted before the filesystem is touched. If
//! the rename itself then fails, the ledger mutation is compensated and
//! persisted again so history and filesystem stay consistent.

use crate::ledger::{Ledger, LedgerError};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Whether a job applies a new rename or undoes a recorded one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

/// Lifecycle of a single [`RenameJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    Planned,
    LedgerUpdated,
    Renamed,
    /// Destination existed and was left alone.
    Skipped,
    Failed,
}

/// A rename from `source` to `target` within the same parent directory.
#[derive(Debug, Clone)]
pub struct RenameJob {
    pub source: PathBuf,
    pub target: PathBuf,
    pub direction: Direction,
    pub state: ExecState,
}

impl RenameJob {
    pub fn new(source: PathBuf, target: PathBuf, direction: Direction) -> Self {
        Self {
            source,
            target,
            direction,
            state: ExecState::Planned,
        }
    }

    /// Creates a job renaming `source` to `new_name` in the same directory.
    pub fn sibling(source: &Path, new_name: &str, direction: Direction) -> Self {
        let target = match source.parent() {
            Some(parent) => parent.join(new_name),
            None => PathBuf::from(new_name),
        };
        Self::new(source.to_path_buf(), target, direction)
    }
}

/// How a job ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Renamed,
    /// The destination exists and may not be replaced; nothing was changed.
    SkippedExists,
}

/// Errors that end a job in [`ExecState::Failed`].
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("'{}' has no usable UTF-8 file name", .0.display())]
    InvalidName(PathBuf),
    #[error("Failed to inspect {}: {source}", .path.display())]
    Inspect { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Failed to rename {} to {}: {source}", .from.display(), .to.display())]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

fn base_name(path: &Path) -> Result<&str, ExecError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ExecError::InvalidName(path.to_path_buf()))
}

/// Lowercase hex SHA-256 of a file's contents.
pub fn file_digest(path: &Path) -> io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(unix)]
fn same_entry(a: &fs::Metadata, b: &fs::Metadata, _: &Path, _: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_entry(_: &fs::Metadata, _: &fs::Metadata, a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Runs rename jobs against a ledger.
pub struct RenameExecutor<'a> {
    ledger: &'a mut Ledger,
    overwrite: bool,
}

impl<'a> RenameExecutor<'a> {
    pub fn new(ledger: &'a mut Ledger, overwrite: bool) -> Self {
        Self { ledger, overwrite }
    }

    /// Drives `job` to a terminal state.
    ///
    /// # Errors
    ///
    /// Returns an error and leaves the job in [`ExecState::Failed`] when the
    /// ledger has no record to reverse, the ledger cannot be persisted, or the
    /// filesystem rename fails.
    pub fn execute(&mut self, job: &mut RenameJob) -> Result<Outcome, ExecError> {
        match self.run(job) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                job.state = ExecState::Failed;
                Err(e)
            }
        }
    }

    fn run(&mut self, job: &mut RenameJob) -> Result<Outcome, ExecError> {
        let source_name = base_name(&job.source)?.to_string();
        let target_name = base_name(&job.target)?.to_string();

        if !self.may_write_destination(&job.source, &job.target)? {
            info!(path = %job.target.display(), "destination exists, skipping");
            job.state = ExecState::Skipped;
            return Ok(Outcome::SkippedExists);
        }

        self.apply_ledger(job.direction, &source_name, &target_name)?;
        if let Err(e) = self.ledger.save() {
            self.compensate_ledger(job.direction, &source_name, &target_name);
            return Err(e.into());
        }
        job.state = ExecState::LedgerUpdated;

        if let Err(source) = fs::rename(&job.source, &job.target) {
            warn!(
                from = %job.source.display(),
                to = %job.target.display(),
                error = %source,
                "rename failed, rolling back ledger entry"
            );
            self.compensate_ledger(job.direction, &source_name, &target_name);
            if let Err(e) = self.ledger.save() {
                warn!(error = %e, "could not persist ledger rollback");
            }
            return Err(ExecError::RenameFailed {
                from: job.source.clone(),
                to: job.target.clone(),
                source,
            });
        }

        job.state = ExecState::Renamed;
        debug!(from = %job.source.display(), to = %job.target.display(), "renamed");
        Ok(Outcome::Renamed)
    }

    /// Decides whether the rename may land on `target`.
    ///
    /// A missing destination is always fine. An existing one is accepted when
    /// it is the source itself (case-only rename), when overwriting is
    /// enabled, or when both are regular files with identical content.
    fn may_write_destination(&self, source: &Path, target: &Path) -> Result<bool, ExecError> {
        let target_meta = match fs::symlink_metadata(target) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(source) => {
                return Err(ExecError::Inspect {
                    path: target.to_path_buf(),
                    source,
                });
            }
        };
        let source_meta = fs::symlink_metadata(source).map_err(|e| ExecError::Inspect {
            path: source.to_path_buf(),
            source: e,
        })?;

        if same_entry(&source_meta, &target_meta, source, target) {
            return Ok(true);
        }
        if self.overwrite {
            return Ok(true);
        }
        if source_meta.is_file() && target_meta.is_file() {
            let inspect = |path: &Path| {
                file_digest(path).map_err(|e| ExecError::Inspect {
                    path: path.to_path_buf(),
                    source: e,
                })
            };
            return Ok(inspect(source)? == inspect(target)?);
        }
        Ok(false)
    }

    fn apply_ledger(
        &mut self,
        direction: Direction,
        source_name: &str,
        target_name: &str,
    ) -> Result<(), LedgerError> {
        match direction {
            Direction::Forward => self.ledger.record_forward(source_name, target_name)?,
            // Undoing `target -> source`.
            Direction::Reverse => self.ledger.record_reverse(target_name, source_name)?,
        };
        Ok(())
    }

    fn compensate_ledger(&mut self, direction: Direction, source_name: &str, target_name: &str) {
        let undone = match direction {
            Direction::Forward => self
                .ledger
                .record_reverse(source_name, target_name)
                .map(|_| ()),
            Direction::Reverse => self
                .ledger
                .record_forward(target_name, source_name)
                .map(|_| ()),
        };
        if let Err(e) = undone {
            warn!(error = %e, "could not roll back ledger entry");
        }
    }
}
