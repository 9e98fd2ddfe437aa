//! fdn - file and directory name normalizer
//!
//! This library rewrites file and directory names into a canonical form
//! (configurable separator, protected term words, ASCII-safe head), applies
//! the renames in place, and keeps an obfuscated ledger of every rename so a
//! later run can reverse it.

pub mod cipher;
pub mod cli;
pub mod confirm;
pub mod dictionary;
pub mod executor;
pub mod ledger;
pub mod pipeline;
pub mod render;
pub mod tokenizer;
pub mod walker;

pub use dictionary::{Dictionary, DictionaryError};
pub use executor::{Direction, ExecError, Outcome, RenameExecutor, RenameJob};
pub use ledger::{Ledger, LedgerError};
pub use pipeline::Pipeline;
pub use tokenizer::Tokenizer;

pub use cli::{CliError, RunOptions, RunReport, run_rename};
