//! Terminal rendering of proposed and applied renames.
//!
//! Every rename is shown as two lines, the original prefixed with three
//! spaces and the new name prefixed with `==>` once applied or `-->` while it
//! is only a preview. In colored mode a character diff highlights removed
//! text in red and inserted text in green.

use colored::Colorize;
use std::path::Path;
use unicode_width::UnicodeWidthStr;

const ORIGINAL_PREFIX: &str = "   ";
const APPLIED_PREFIX: &str = "==>";
const PREVIEW_PREFIX: &str = "-->";
const VISIBLE_SPACE: &str = "▯";
const DEFAULT_WIDTH: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Keep(char),
    Delete(char),
    Insert(char),
}

/// Character-level edit script from `a` to `b` via longest common subsequence.
fn diff_chars(a: &str, b: &str) -> Vec<Edit> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());

    // lcs[i][j] = LCS length of a[i..] and b[j..]
    let mut lcs = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut edits = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            edits.push(Edit::Keep(a[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            edits.push(Edit::Delete(a[i]));
            i += 1;
        } else {
            edits.push(Edit::Insert(b[j]));
            j += 1;
        }
    }
    edits.extend(a[i..].iter().map(|&c| Edit::Delete(c)));
    edits.extend(b[j..].iter().map(|&c| Edit::Insert(c)));
    edits
}

fn visible(run: &str) -> String {
    run.replace(' ', VISIBLE_SPACE)
}

fn display_name(path: &str, full_path: bool) -> &str {
    if full_path {
        return path;
    }
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

/// Terminal width from `COLUMNS`, or 80.
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|w| *w > 0)
        .unwrap_or(DEFAULT_WIDTH)
}

/// Centers `message` in a line of dashes `width` columns wide.
pub fn tip_banner(message: &str, width: usize) -> String {
    let text_width = message.width() + 2;
    if text_width >= width {
        return message.to_string();
    }
    let fill = width - text_width;
    let left = fill / 2;
    format!("{} {} {}", "-".repeat(left), message, "-".repeat(fill - left))
}

/// Formats rename previews for the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    colored: bool,
    align: bool,
}

impl Renderer {
    pub fn new(colored: bool, align: bool) -> Self {
        Self { colored, align }
    }

    pub fn plain() -> Self {
        Self::default()
    }

    /// Renders the before/after pair as two lines (no trailing newline).
    pub fn render(&self, original: &str, processed: &str, in_place: bool, full_path: bool) -> String {
        let original = display_name(original, full_path);
        let processed = display_name(processed, full_path);
        let marker = if in_place { APPLIED_PREFIX } else { PREVIEW_PREFIX };

        if !self.colored {
            return format!("{ORIGINAL_PREFIX}{original}\n{marker}{processed}");
        }
        let (before, after) = self.highlight(original, processed);
        format!("{ORIGINAL_PREFIX}{before}\n{}{after}", marker.bold())
    }

    fn highlight(&self, original: &str, processed: &str) -> (String, String) {
        let mut before = String::new();
        let mut after = String::new();
        let mut deleted = String::new();
        let mut inserted = String::new();

        for edit in diff_chars(original, processed) {
            match edit {
                Edit::Delete(c) => deleted.push(c),
                Edit::Insert(c) => inserted.push(c),
                Edit::Keep(c) => {
                    self.flush_run(&mut before, &mut after, &mut deleted, &mut inserted);
                    before.push(c);
                    after.push(c);
                }
            }
        }
        self.flush_run(&mut before, &mut after, &mut deleted, &mut inserted);
        (before, after)
    }

    fn flush_run(
        &self,
        before: &mut String,
        after: &mut String,
        deleted: &mut String,
        inserted: &mut String,
    ) {
        if deleted.is_empty() && inserted.is_empty() {
            return;
        }
        let del = visible(deleted);
        let ins = visible(inserted);
        before.push_str(&del.red().to_string());
        after.push_str(&ins.green().to_string());

        if self.align {
            let (dw, iw) = (del.width(), ins.width());
            if dw < iw {
                before.push_str(&" ".repeat(iw - dw));
            } else {
                after.push_str(&" ".repeat(dw - iw));
            }
        }
        deleted.clear();
        inserted.clear();
    }

    /// Notice for a rename skipped because the destination exists.
    pub fn exist_notice(&self, path: &str) -> String {
        let tag = if self.colored {
            "[EXIST]".yellow().to_string()
        } else {
            "[EXIST]".to_string()
        };
        format!("{tag} {path} already exists, skipped (use -o to overwrite)")
    }

    /// Banner shown after a preview that proposed changes.
    pub fn dry_run_tip(&self) -> String {
        let banner = tip_banner(
            "dry run, use -i to rename in place or -c to confirm each rename",
            terminal_width(),
        );
        if self.colored {
            banner.cyan().to_string()
        } else {
            banner
        }
    }
}
