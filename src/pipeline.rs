//! Rewrite pipeline.
//!
//! Given a dictionary snapshot, rewrites a name in a fixed order:
//!
//! 1. mask term words, replace to-be-separator words in unprotected fragments
//! 2. rejoin the fragments
//! 3. collapse runs of the separator to one
//! 4. trim the separator from head and tail
//! 5. replace whole separator-delimited tokens that equal a term word
//! 6. prefix an ASCII head when the name does not start with `[0-9A-Za-z]`
//!
//! # Examples
//!
//! ```
//! use fdn::dictionary::Dictionary;
//! use fdn::pipeline::Pipeline;
//!
//! let pipeline = Pipeline::new(&Dictionary::default()).unwrap();
//! assert_eq!(pipeline.transform("123 456 789"), "123_456_789");
//! assert_eq!(pipeline.plan_name("my notes (draft).txt", false), "my_notes_draft.txt");
//! ```

use crate::dictionary::Dictionary;
use crate::tokenizer::Tokenizer;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use tracing::trace;

/// Number of code points folded into the ASCII head.
pub const ASC_HEAD_LEN: usize = 3;

/// Errors raised while compiling a dictionary into a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Term words do not form a valid pattern: {0}")]
    InvalidTermPattern(#[source] regex::Error),
    #[error("Invalid separator pattern: {0}")]
    InvalidSeparator(#[source] regex::Error),
}

/// A compiled, side-effect free name transformer.
#[derive(Debug, Clone)]
pub struct Pipeline {
    tokenizer: Tokenizer,
    separator: String,
    separator_run: Option<Regex>,
    to_sep_words: Vec<String>,
    term_targets: HashMap<String, String>,
}

impl Pipeline {
    /// Compiles the dictionary snapshot.
    pub fn new(dictionary: &Dictionary) -> Result<Self, PipelineError> {
        let tokenizer = Tokenizer::new(
            dictionary
                .list_term_words()
                .iter()
                .map(|w| w.original_lower.as_str()),
        )
        .map_err(PipelineError::InvalidTermPattern)?;

        let separator = dictionary.get_separator().value.clone();
        let separator_run = if separator.is_empty() {
            None
        } else {
            let pattern = format!("(?:{})+", regex::escape(&separator));
            Some(Regex::new(&pattern).map_err(PipelineError::InvalidSeparator)?)
        };

        let mut term_targets = HashMap::new();
        for word in dictionary.list_term_words() {
            term_targets
                .entry(word.original_lower.clone())
                .or_insert_with(|| word.target_word.clone());
        }

        Ok(Self {
            tokenizer,
            separator,
            separator_run,
            to_sep_words: dictionary
                .list_to_sep_words()
                .iter()
                .filter(|w| !w.value.is_empty())
                .map(|w| w.value.clone())
                .collect(),
            term_targets,
        })
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Runs every stage over `name`.
    pub fn transform(&self, name: &str) -> String {
        let substituted = self.substitute_separators(name);
        let collapsed = self.collapse(&substituted);
        let trimmed = trim_head_tail(&collapsed, &self.separator).to_string();
        let termed = self.substitute_terms(&trimmed);
        let result = format!("{}{}", asc_head(&termed), termed);
        trace!(
            name,
            substituted = %substituted,
            collapsed = %collapsed,
            trimmed = %trimmed,
            result = %result,
            "transformed name"
        );
        result
    }

    /// Proposes a new base name for a filesystem entry.
    ///
    /// File extensions are kept as they are and only the stem is rewritten.
    /// If the rewritten stem would be empty, the original name is returned.
    pub fn plan_name(&self, base_name: &str, is_dir: bool) -> String {
        let (stem, extension) = if is_dir {
            (base_name, None)
        } else {
            split_extension(base_name)
        };

        let new_stem = self.transform(stem);
        if new_stem.is_empty() {
            return base_name.to_string();
        }
        match extension {
            Some(ext) => format!("{}.{}", new_stem, ext),
            None => new_stem,
        }
    }

    /// Replaces to-be-separator words in unprotected fragments, then rejoins.
    ///
    /// Words are applied one after another in insertion order, so a later
    /// word sees the output of earlier replacements.
    pub fn substitute_separators(&self, name: &str) -> String {
        let masked = self.tokenizer.mask(name);
        let mut joined = String::with_capacity(name.len());
        for (fragment, protected) in masked.iter() {
            if protected {
                joined.push_str(fragment);
                continue;
            }
            let mut fragment = fragment.to_string();
            for word in &self.to_sep_words {
                if fragment.contains(word.as_str()) {
                    fragment = fragment.replace(word.as_str(), &self.separator);
                }
            }
            joined.push_str(&fragment);
        }
        joined
    }

    /// Collapses every run of the separator into a single separator.
    pub fn collapse(&self, s: &str) -> String {
        match &self.separator_run {
            Some(run) => run.replace_all(s, regex::NoExpand(&self.separator)).into_owned(),
            None => s.to_string(),
        }
    }

    /// Replaces separator-delimited tokens whose lowercase form is a term word.
    pub fn substitute_terms(&self, s: &str) -> String {
        if self.term_targets.is_empty() {
            return s.to_string();
        }
        let replace = |token: &str| -> String {
            self.term_targets
                .get(&token.to_lowercase())
                .cloned()
                .unwrap_or_else(|| token.to_string())
        };
        if self.separator.is_empty() {
            return replace(s);
        }
        s.split(self.separator.as_str())
            .map(replace)
            .collect::<Vec<_>>()
            .join(&self.separator)
    }
}

/// Splits `name` into stem and extension the way [`Path::extension`] does.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    let path = Path::new(name);
    match (path.file_stem().and_then(|s| s.to_str()), path.extension().and_then(|e| e.to_str())) {
        (Some(stem), Some(ext)) if stem.len() + 1 + ext.len() == name.len() => (stem, Some(ext)),
        _ => (name, None),
    }
}

/// Strips every leading and trailing occurrence of `sep`.
pub fn trim_head_tail<'a>(s: &'a str, sep: &str) -> &'a str {
    if sep.is_empty() {
        return s;
    }
    s.trim_start_matches(sep).trim_end_matches(sep)
}

/// Folds one code point into `'A'..='Z'`.
fn fold_to_upper_ascii(c: char) -> char {
    const A: i64 = 'A' as i64;
    const Z: i64 = 'Z' as i64;
    let code = c as i64;
    let folded = if code > Z {
        code - 26 * ((code - Z + 25) / 26)
    } else if code < A {
        code + 26 * ((A - code + 25) / 26)
    } else {
        code
    };
    char::from_u32(folded as u32).unwrap_or('A')
}

/// Deterministic ASCII prefix for names that do not start with `[0-9A-Za-z]`.
///
/// Returns an empty string for empty input or for names that already start
/// with an ASCII letter or digit. Otherwise each of the first (up to three)
/// code points is folded into `'A'..='Z'`.
pub fn asc_head(s: &str) -> String {
    match s.chars().next() {
        None => String::new(),
        Some(c) if c.is_ascii_alphanumeric() => String::new(),
        Some(_) => s.chars().take(ASC_HEAD_LEN).map(fold_to_upper_ascii).collect(),
    }
}
