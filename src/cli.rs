//! Command orchestration for fdn.
//!
//! This module ties the building blocks together:
//! - batch normalization of walked paths (preview, in place, or reverse)
//! - dictionary inspection and editing (`config list/add/delete`)
//! - explicit ledger-recorded renames (`mv`)
//!
//! Everything here writes to caller-supplied writers so the same code drives
//! both the binary and the integration tests.

use crate::confirm::{Answer, Confirmer};
use crate::dictionary::{Dictionary, DictionaryError};
use crate::executor::{Direction, ExecError, Outcome, RenameExecutor, RenameJob};
use crate::ledger::{Ledger, LedgerError};
use crate::pipeline::{Pipeline, PipelineError};
use crate::render::Renderer;
use crate::walker::{Depth, EntryKind, WalkError, Walker};
use clap::ValueEnum;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Errors that abort a command.
///
/// Per-path problems during a batch are logged and counted in
/// [`RunReport`] instead.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Dictionary(#[from] DictionaryError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Walk(#[from] WalkError),
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Source does not exist: {}", .0.display())]
    SourceMissing(PathBuf),
    #[error("Target already exists: {}", .0.display())]
    TargetExists(PathBuf),
    #[error("The separator takes exactly one value, got {0}")]
    SeparatorArity(usize),
}

pub type CliResult<T> = Result<T, CliError>;

/// Dictionary section addressed by `config` subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigTarget {
    #[value(name = "separator", alias = "sep")]
    Separator,
    #[value(name = "key-colon-value-list", aliases = ["kcvl", "term-words"])]
    TermWords,
    #[value(name = "to-be-separator-word-list", aliases = ["tbswl", "to-sep-words"])]
    ToSepWords,
}

/// Every toggle of a rename batch.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub paths: Vec<PathBuf>,
    pub depth: Depth,
    pub kind: EntryKind,
    pub in_place: bool,
    pub confirm: bool,
    pub reverse: bool,
    pub full_path: bool,
    pub colored: bool,
    pub align: bool,
    pub overwrite: bool,
    pub include_hidden: bool,
    pub excludes: Vec<String>,
    pub progress: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            paths: vec![PathBuf::from(".")],
            depth: Depth::default(),
            kind: EntryKind::default(),
            in_place: false,
            confirm: false,
            reverse: false,
            full_path: false,
            colored: false,
            align: false,
            overwrite: false,
            include_hidden: false,
            excludes: Vec::new(),
            progress: false,
        }
    }
}

impl RunOptions {
    /// Neither `in_place` nor `confirm` is set, so nothing is renamed.
    pub fn is_dry_run(&self) -> bool {
        !self.in_place && !self.confirm
    }
}

/// What a batch did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Renames applied.
    pub renamed: usize,
    /// Renames shown but not applied (dry run).
    pub previewed: usize,
    /// Renames refused at the confirmation prompt.
    pub declined: usize,
    /// Candidates skipped (destination exists, unusable name).
    pub skipped: usize,
    /// Renames that failed.
    pub failed: usize,
    /// The batch was stopped from the confirmation prompt.
    pub quit: bool,
}

/// Normalizes (or reverses) every candidate under `options.paths`.
///
/// # Errors
///
/// Fails before touching any path when the dictionary does not compile or an
/// exclude pattern is invalid, and whenever writing to `out` or reading the
/// confirmation input fails. Failures of individual renames are only
/// counted.
pub fn run_rename<R, P, W>(
    options: &RunOptions,
    dictionary: &Dictionary,
    ledger: &mut Ledger,
    confirmer: &mut Confirmer<R, P>,
    out: &mut W,
) -> CliResult<RunReport>
where
    R: BufRead,
    P: Write,
    W: Write,
{
    let pipeline = Pipeline::new(dictionary)?;
    let walker = Walker::new(options.depth, options.kind)
        .include_hidden(options.include_hidden)
        .with_progress(options.progress)
        .exclude(&options.excludes)?;
    let renderer = Renderer::new(options.colored, options.align);
    let direction = if options.reverse {
        Direction::Reverse
    } else {
        Direction::Forward
    };
    let is_dir = options.kind == EntryKind::Directories;

    let mut report = RunReport::default();
    for path in walker.collect(&options.paths) {
        let Some(base) = path.file_name().and_then(|n| n.to_str()) else {
            warn!(path = %path.display(), "skipping name that is not valid UTF-8");
            report.skipped += 1;
            continue;
        };

        let new_name = match direction {
            Direction::Forward => pipeline.plan_name(base, is_dir),
            Direction::Reverse => match ledger.lookup_reverse(base) {
                Some(previous) => previous,
                None => {
                    debug!(path = %path.display(), "no ledger record");
                    continue;
                }
            },
        };
        if new_name == base {
            debug!(path = %path.display(), "name unchanged");
            continue;
        }

        let mut job = RenameJob::sibling(&path, &new_name, direction);
        let original = path.to_string_lossy().into_owned();
        let processed = job.target.to_string_lossy().into_owned();

        if options.is_dry_run() {
            writeln!(
                out,
                "{}",
                renderer.render(&original, &processed, false, options.full_path)
            )?;
            report.previewed += 1;
            continue;
        }

        if options.confirm {
            let preview = renderer.render(&original, &processed, false, options.full_path);
            match confirmer.ask(&preview)? {
                Answer::Yes | Answer::All => {}
                Answer::No => {
                    report.declined += 1;
                    continue;
                }
                Answer::Quit => {
                    info!("stopped at confirmation prompt");
                    report.quit = true;
                    break;
                }
            }
        }

        let mut executor = RenameExecutor::new(ledger, options.overwrite);
        match executor.execute(&mut job) {
            Ok(Outcome::Renamed) => {
                writeln!(
                    out,
                    "{}",
                    renderer.render(&original, &processed, true, options.full_path)
                )?;
                info!(from = %original, to = %processed, "renamed");
                report.renamed += 1;
            }
            Ok(Outcome::SkippedExists) => {
                writeln!(out, "{}", renderer.exist_notice(&processed))?;
                report.skipped += 1;
            }
            Err(e) => {
                error!(path = %original, error = %e, "rename failed");
                report.failed += 1;
            }
        }
    }

    if options.is_dry_run() && report.previewed > 0 {
        writeln!(out, "{}", renderer.dry_run_tip())?;
    }
    debug!(?report, "batch finished");
    Ok(report)
}

fn write_separator<W: Write>(dictionary: &Dictionary, out: &mut W) -> io::Result<()> {
    writeln!(out, "{:?}", dictionary.get_separator().value)
}

fn write_term_words<W: Write>(dictionary: &Dictionary, out: &mut W) -> io::Result<()> {
    for word in dictionary.list_term_words() {
        writeln!(out, "{}:{}", word.original_lower, word.target_word)?;
    }
    Ok(())
}

fn write_to_sep_words<W: Write>(dictionary: &Dictionary, out: &mut W) -> io::Result<()> {
    for word in dictionary.list_to_sep_words() {
        writeln!(out, "{:?}", word.value)?;
    }
    Ok(())
}

/// Prints one dictionary section, or all of them with headings.
pub fn config_list<W: Write>(
    dictionary: &Dictionary,
    target: Option<ConfigTarget>,
    out: &mut W,
) -> CliResult<()> {
    match target {
        Some(ConfigTarget::Separator) => write_separator(dictionary, out)?,
        Some(ConfigTarget::TermWords) => write_term_words(dictionary, out)?,
        Some(ConfigTarget::ToSepWords) => write_to_sep_words(dictionary, out)?,
        None => {
            writeln!(out, "[separator]")?;
            write_separator(dictionary, out)?;
            writeln!(out, "[key-colon-value-list]")?;
            write_term_words(dictionary, out)?;
            writeln!(out, "[to-be-separator-word-list]")?;
            write_to_sep_words(dictionary, out)?;
        }
    }
    Ok(())
}

/// Adds values to the dictionary stored at `path`.
///
/// Term words are given as `key:value`; existing keys and duplicate words
/// are reported and left alone. The separator takes exactly one value and
/// replaces the current one.
pub fn config_add<W: Write>(
    path: &Path,
    target: ConfigTarget,
    values: &[String],
    out: &mut W,
) -> CliResult<()> {
    let mut dictionary = Dictionary::load_or_default(path)?;
    match target {
        ConfigTarget::Separator => {
            let [value] = values else {
                return Err(CliError::SeparatorArity(values.len()));
            };
            dictionary.set_separator(value)?;
            writeln!(out, "separator set to {:?}", value)?;
        }
        ConfigTarget::TermWords => {
            for value in values {
                if dictionary.insert_term_word(value)? {
                    writeln!(out, "added {}", value)?;
                } else {
                    writeln!(out, "exists {}", value)?;
                }
            }
        }
        ConfigTarget::ToSepWords => {
            for value in values {
                if dictionary.insert_to_sep_word(value)? {
                    writeln!(out, "added {:?}", value)?;
                } else {
                    writeln!(out, "exists {:?}", value)?;
                }
            }
        }
    }
    // Refuse to store a term word that would make every later run fail.
    Pipeline::new(&dictionary)?;
    dictionary.save(path)?;
    debug!(path = %path.display(), "dictionary saved");
    Ok(())
}

/// Removes values from the dictionary stored at `path`.
///
/// Deleting the separator restores the default `_`.
pub fn config_delete<W: Write>(
    path: &Path,
    target: ConfigTarget,
    values: &[String],
    out: &mut W,
) -> CliResult<()> {
    let mut dictionary = Dictionary::load_or_default(path)?;
    match target {
        ConfigTarget::Separator => {
            dictionary.reset_separator();
            writeln!(out, "separator reset to {:?}", dictionary.get_separator().value)?;
        }
        ConfigTarget::TermWords => {
            for value in values {
                let verb = if dictionary.delete_term_word(value) {
                    "removed"
                } else {
                    "not found"
                };
                writeln!(out, "{} {}", verb, value)?;
            }
        }
        ConfigTarget::ToSepWords => {
            for value in values {
                let verb = if dictionary.delete_to_sep_word(value) {
                    "removed"
                } else {
                    "not found"
                };
                writeln!(out, "{} {:?}", verb, value)?;
            }
        }
    }
    dictionary.save(path)?;
    Ok(())
}

/// Renames `source` to `target` and records it so `-r` can undo it.
///
/// # Errors
///
/// [`CliError::SourceMissing`] or [`CliError::TargetExists`] before anything
/// is changed, or the executor's error if the rename fails.
pub fn move_entry(source: &Path, target: &Path, ledger: &mut Ledger) -> CliResult<()> {
    if fs::symlink_metadata(source).is_err() {
        return Err(CliError::SourceMissing(source.to_path_buf()));
    }
    if fs::symlink_metadata(target).is_ok() {
        return Err(CliError::TargetExists(target.to_path_buf()));
    }

    let mut job = RenameJob::new(source.to_path_buf(), target.to_path_buf(), Direction::Forward);
    match RenameExecutor::new(ledger, false).execute(&mut job)? {
        Outcome::Renamed => {
            info!(from = %source.display(), to = %target.display(), "moved");
            Ok(())
        }
        Outcome::SkippedExists => Err(CliError::TargetExists(target.to_path_buf())),
    }
}
