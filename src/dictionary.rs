//! Dictionary store: term words, to-be-separator words and the separator.
//!
//! The dictionary is persisted as TOML and looked up in this order:
//! an explicit path, `.fdnrc.toml` in the current directory,
//! `$FDN_HOME/config.toml` (default `~/.fdn/config.toml`), then built-in
//! defaults.
//!
//! # Configuration File Format
//!
//! ```toml
//! [separator]
//! key_hash = "…"
//! value = "_"
//!
//! [[to_sep_words]]
//! key_hash = "…"
//! value = " "
//!
//! [[term_words]]
//! key_hash = "…"
//! original_lower = "k.flutter"
//! target_word = "KFlutter"
//! ```

use crate::cipher::name_hash;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Separator used when none is configured.
pub const DEFAULT_SEPARATOR: &str = "_";

/// Words replaced by the separator in a fresh dictionary, in insertion order.
pub const DEFAULT_TO_SEP_WORDS: [&str; 24] = [
    "：", ":", "，", ",", "！", "!", "？", "?", "（", "(", ")", "【", "[", "】", "]", "~", "》",
    "《", "▯", "“", "”", "\"", " ", "-",
];

const LOCAL_CONFIG_NAME: &str = ".fdnrc.toml";
const HOME_CONFIG_NAME: &str = "config.toml";

/// Errors that can occur while loading, saving or editing the dictionary.
#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    #[error("Dictionary file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Invalid dictionary file {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },
    #[error("IO error on dictionary file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Could not serialize dictionary: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// Term words are given as `key:value`.
    #[error("Invalid term word '{0}': expected key:value")]
    InvalidTermWord(String),
    #[error("Separator must not be empty")]
    EmptySeparator,
    #[error("Word must not be empty")]
    EmptyWord,
}

/// Result type for dictionary operations.
pub type DictionaryResult<T> = Result<T, DictionaryError>;

/// A substring that is protected from separator substitution and whose
/// whole-token occurrences are replaced by `target_word`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermWord {
    pub key_hash: String,
    pub original_lower: String,
    pub target_word: String,
}

impl TermWord {
    /// Creates a term word, lowercasing the original.
    pub fn new(original: &str, target_word: &str) -> Self {
        let original_lower = original.to_lowercase();
        Self {
            key_hash: name_hash(&original_lower),
            original_lower,
            target_word: target_word.to_string(),
        }
    }
}

/// A substring that is replaced by the separator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToSepWord {
    pub key_hash: String,
    pub value: String,
}

impl ToSepWord {
    pub fn new(value: &str) -> Self {
        Self {
            key_hash: name_hash(value),
            value: value.to_string(),
        }
    }
}

/// The canonical joining string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Separator {
    pub key_hash: String,
    pub value: String,
}

impl Separator {
    pub fn new(value: &str) -> Self {
        Self {
            key_hash: name_hash(value),
            value: value.to_string(),
        }
    }
}

impl Default for Separator {
    fn default() -> Self {
        Self::new(DEFAULT_SEPARATOR)
    }
}

/// Snapshot of the configured dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    #[serde(default)]
    pub separator: Separator,
    #[serde(default)]
    pub to_sep_words: Vec<ToSepWord>,
    #[serde(default)]
    pub term_words: Vec<TermWord>,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self {
            separator: Separator::default(),
            to_sep_words: DEFAULT_TO_SEP_WORDS.iter().map(|w| ToSepWord::new(w)).collect(),
            term_words: Vec::new(),
        }
    }
}

/// Directory holding the dictionary and the ledger.
///
/// `$FDN_HOME` if set, otherwise `$HOME/.fdn`, otherwise `./.fdn`.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("FDN_HOME")
        && !dir.is_empty()
    {
        return PathBuf::from(dir);
    }
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => PathBuf::from(home).join(".fdn"),
        _ => PathBuf::from(".fdn"),
    }
}

/// Path configuration edits are written to when none is given explicitly.
pub fn default_config_path() -> PathBuf {
    data_dir().join(HOME_CONFIG_NAME)
}

impl Dictionary {
    /// Load the dictionary, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly given file is missing, or if any
    /// file that is found cannot be read or parsed.
    pub fn load(config_path: Option<&Path>) -> DictionaryResult<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_NAME);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        let home_config = default_config_path();
        if home_config.exists() {
            return Self::load_from_file(&home_config);
        }

        debug!("no dictionary file found, using defaults");
        Ok(Self::default())
    }

    /// File that configuration edits read and write.
    ///
    /// Follows the same lookup order as [`Dictionary::load`], ending at the
    /// home config file even if it does not exist yet.
    pub fn edit_path(config_path: Option<&Path>) -> PathBuf {
        if let Some(path) = config_path {
            return path.to_path_buf();
        }
        let local_config = PathBuf::from(LOCAL_CONFIG_NAME);
        if local_config.exists() {
            return local_config;
        }
        default_config_path()
    }

    /// Load the file at `path` if it exists, defaults otherwise.
    ///
    /// Used by configuration edits, which create the file on first write.
    pub fn load_or_default(path: &Path) -> DictionaryResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    fn load_from_file(path: &Path) -> DictionaryResult<Self> {
        if !path.exists() {
            return Err(DictionaryError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|source| DictionaryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dictionary: Self = toml::from_str(&content).map_err(|e| DictionaryError::Invalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if dictionary.separator.value.is_empty() {
            return Err(DictionaryError::Invalid {
                path: path.to_path_buf(),
                reason: "separator value is empty".to_string(),
            });
        }
        debug!(path = %path.display(), "loaded dictionary");
        Ok(dictionary)
    }

    /// Write the dictionary to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> DictionaryResult<()> {
        let io_err = |source| DictionaryError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(io_err)
    }

    pub fn list_term_words(&self) -> &[TermWord] {
        &self.term_words
    }

    pub fn list_to_sep_words(&self) -> &[ToSepWord] {
        &self.to_sep_words
    }

    pub fn get_separator(&self) -> &Separator {
        &self.separator
    }

    /// Insert a term word parsed from `key:value`.
    ///
    /// Returns `false` when a term word with the same (case-insensitive) key
    /// already exists; the existing entry is kept.
    pub fn insert_term_word(&mut self, entry: &str) -> DictionaryResult<bool> {
        let (key, value) = entry
            .split_once(':')
            .ok_or_else(|| DictionaryError::InvalidTermWord(entry.to_string()))?;
        if key.is_empty() || value.is_empty() {
            return Err(DictionaryError::InvalidTermWord(entry.to_string()));
        }
        let word = TermWord::new(key, value);
        if self.term_words.iter().any(|w| w.key_hash == word.key_hash) {
            return Ok(false);
        }
        self.term_words.push(word);
        Ok(true)
    }

    /// Delete a term word by key; a trailing `:value` is accepted and ignored.
    pub fn delete_term_word(&mut self, entry: &str) -> bool {
        let key = entry.split_once(':').map_or(entry, |(k, _)| k);
        let hash = name_hash(&key.to_lowercase());
        let before = self.term_words.len();
        self.term_words.retain(|w| w.key_hash != hash);
        self.term_words.len() != before
    }

    /// Insert a to-be-separator word. Returns `false` for a duplicate.
    pub fn insert_to_sep_word(&mut self, value: &str) -> DictionaryResult<bool> {
        if value.is_empty() {
            return Err(DictionaryError::EmptyWord);
        }
        let word = ToSepWord::new(value);
        if self.to_sep_words.iter().any(|w| w.key_hash == word.key_hash) {
            return Ok(false);
        }
        self.to_sep_words.push(word);
        Ok(true)
    }

    pub fn delete_to_sep_word(&mut self, value: &str) -> bool {
        let hash = name_hash(value);
        let before = self.to_sep_words.len();
        self.to_sep_words.retain(|w| w.key_hash != hash);
        self.to_sep_words.len() != before
    }

    pub fn set_separator(&mut self, value: &str) -> DictionaryResult<()> {
        if value.is_empty() {
            return Err(DictionaryError::EmptySeparator);
        }
        self.separator = Separator::new(value);
        Ok(())
    }

    /// Restore the default separator.
    pub fn reset_separator(&mut self) {
        self.separator = Separator::default();
    }
}
