//! Masking tokenizer.
//!
//! Splits a raw name into fragments, marking the spans that match a configured
//! term word as protected so later separator substitution leaves them alone.

use regex::Regex;

/// A name split into fragments, each flagged protected or not.
///
/// Concatenating `fragments` always reproduces the input exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Masked {
    pub fragments: Vec<String>,
    pub is_protected: Vec<bool>,
}

impl Masked {
    fn push(&mut self, fragment: &str, protected: bool) {
        self.fragments.push(fragment.to_string());
        self.is_protected.push(protected);
    }

    /// Iterates `(fragment, is_protected)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.fragments
            .iter()
            .map(String::as_str)
            .zip(self.is_protected.iter().copied())
    }

    /// Rebuilds the original name.
    pub fn concat(&self) -> String {
        self.fragments.concat()
    }
}

/// Escapes only the repetition metacharacters `+`, `?` and `*`.
///
/// Other regex syntax in a term word keeps its regex meaning, so `k.flutter`
/// also protects `kXflutter`.
pub fn escape_term(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '+' | '?' | '*') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Compiled alternation over the term-word originals.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    pattern: Option<Regex>,
}

impl Tokenizer {
    /// Builds the tokenizer.
    ///
    /// Alternatives are ordered longest first (stable for equal lengths), so
    /// with term words `ab` and `abc` the input `abcd` protects `abc`.
    /// Empty originals are ignored; with no usable term words every name is a
    /// single unprotected fragment.
    pub fn new<'a, I>(term_words: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut terms: Vec<&str> = term_words.into_iter().filter(|t| !t.is_empty()).collect();
        if terms.is_empty() {
            return Ok(Self { pattern: None });
        }
        terms.sort_by(|a, b| b.len().cmp(&a.len()));
        let alternation = terms
            .iter()
            .map(|t| escape_term(t))
            .collect::<Vec<_>>()
            .join("|");
        Ok(Self {
            pattern: Some(Regex::new(&alternation)?),
        })
    }

    /// Splits `name` into protected and unprotected fragments.
    pub fn mask(&self, name: &str) -> Masked {
        let mut masked = Masked {
            fragments: Vec::new(),
            is_protected: Vec::new(),
        };

        let Some(pattern) = &self.pattern else {
            masked.push(name, false);
            return masked;
        };

        let mut cursor = 0;
        for m in pattern.find_iter(name) {
            if m.start() == m.end() {
                continue;
            }
            if m.start() > cursor {
                masked.push(&name[cursor..m.start()], false);
            }
            masked.push(m.as_str(), true);
            cursor = m.end();
        }
        if cursor < name.len() || masked.fragments.is_empty() {
            masked.push(&name[cursor..], false);
        }
        masked
    }
}
