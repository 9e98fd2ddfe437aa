//! Candidate collection.
//!
//! Walks the input paths to the requested depth and returns the entries to
//! normalize, sorted in descending path order so children are handled before
//! the directories that contain them.

use glob::Pattern;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },
}

/// How deep to descend below each input directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Unbounded,
    /// Number of levels, at least 1 (direct children only).
    Levels(usize),
}

impl Depth {
    /// Maps the `--level` value: negative is unbounded, 0 is treated as 1.
    pub fn from_level(level: i64) -> Self {
        if level < 0 {
            Self::Unbounded
        } else {
            Self::Levels(level.max(1) as usize)
        }
    }

    fn allows(self, level: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Levels(max) => level <= max,
        }
    }
}

impl Default for Depth {
    fn default() -> Self {
        Self::Levels(1)
    }
}

/// Which kind of entry is collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryKind {
    #[default]
    Files,
    Directories,
}

/// Traversal settings.
#[derive(Debug, Clone, Default)]
pub struct Walker {
    depth: Depth,
    kind: EntryKind,
    include_hidden: bool,
    excludes: Vec<Pattern>,
    progress: bool,
}

#[cfg(windows)]
fn has_hidden_attribute(path: &Path) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    fs::symlink_metadata(path)
        .map(|m| m.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
        .unwrap_or(false)
}

#[cfg(not(windows))]
fn has_hidden_attribute(_: &Path) -> bool {
    false
}

/// Whether `path` is hidden: a dot-prefixed name, or the hidden attribute on Windows.
pub fn is_hidden(path: &Path) -> bool {
    let dotted = path
        .file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false);
    dotted || has_hidden_attribute(path)
}

impl Walker {
    pub fn new(depth: Depth, kind: EntryKind) -> Self {
        Self {
            depth,
            kind,
            ..Self::default()
        }
    }

    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Shows a spinner on stderr while scanning.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Adds exclude globs, matched against both the full path and the base name.
    pub fn exclude<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self, WalkError> {
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let compiled = Pattern::new(pattern).map_err(|source| WalkError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
            self.excludes.push(compiled);
        }
        Ok(self)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let name = path.file_name().map(|n| n.to_string_lossy());
        self.excludes.iter().any(|pattern| {
            pattern.matches_path(path) || name.as_deref().is_some_and(|n| pattern.matches(n))
        })
    }

    fn is_skipped(&self, path: &Path) -> bool {
        (!self.include_hidden && is_hidden(path)) || self.is_excluded(path)
    }

    fn wants(&self, file_type: fs::FileType) -> bool {
        match self.kind {
            EntryKind::Files => file_type.is_file(),
            EntryKind::Directories => file_type.is_dir(),
        }
    }

    fn spinner(&self) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Collects candidates under every root.
    ///
    /// A root that is a regular file is itself a candidate in file mode. A
    /// root directory is walked but never returned. Missing roots and
    /// unreadable directories are logged and skipped.
    pub fn collect(&self, roots: &[PathBuf]) -> Vec<PathBuf> {
        let pb = self.spinner();
        let mut found: Vec<PathBuf> = Vec::new();

        for root in roots {
            let meta = match fs::metadata(root) {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(path = %root.display(), error = %e, "skipping input path");
                    continue;
                }
            };
            if meta.is_dir() {
                self.walk_dir(root, 1, &mut found, &pb);
            } else if self.kind == EntryKind::Files && meta.is_file() && !self.is_excluded(root) {
                found.push(root.clone());
            }
        }

        pb.finish_and_clear();
        found.sort_by(|a, b| b.as_os_str().cmp(a.as_os_str()));
        found.dedup();
        debug!(count = found.len(), "collected candidates");
        found
    }

    fn walk_dir(&self, dir: &Path, level: usize, found: &mut Vec<PathBuf>, pb: &ProgressBar) {
        if !self.depth.allows(level) {
            return;
        }
        pb.set_message(dir.display().to_string());

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "cannot read directory");
                return;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "cannot read directory entry");
                    continue;
                }
            };
            let path = entry.path();
            if self.is_skipped(&path) {
                continue;
            }
            let Ok(file_type) = entry.file_type() else {
                warn!(path = %path.display(), "cannot determine entry type");
                continue;
            };

            if self.wants(file_type) {
                found.push(path.clone());
            }
            if file_type.is_dir() {
                self.walk_dir(&path, level + 1, found, pb);
            }
        }
    }
}
