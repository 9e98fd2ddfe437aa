//! Interactive per-rename confirmation.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

/// A reply to the confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    /// Apply this and every remaining rename without asking.
    All,
    /// Stop the batch here.
    Quit,
}

impl FromStr for Answer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "y" | "Y" | "yes" | "Yes" | "YES" => Ok(Self::Yes),
            "n" | "N" | "no" | "No" | "NO" => Ok(Self::No),
            "A" | "a" | "all" | "All" | "ALL" => Ok(Self::All),
            "q" | "Q" | "quit" | "Quit" | "QUIT" => Ok(Self::Quit),
            other => Err(format!("unrecognized answer '{}'", other)),
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Yes => "y",
            Self::No => "n",
            Self::All => "A",
            Self::Quit => "q",
        };
        write!(f, "{}", s)
    }
}

/// Asks before each rename, remembering the previous answer as the default.
pub struct Confirmer<R, W> {
    input: R,
    prompt: W,
    last: Answer,
    all: bool,
}

impl Confirmer<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> Confirmer<R, W> {
    pub fn new(input: R, prompt: W) -> Self {
        Self {
            input,
            prompt,
            last: Answer::No,
            all: false,
        }
    }

    /// Whether `all` was answered earlier.
    pub fn accepts_all(&self) -> bool {
        self.all
    }

    /// Asks about `name` until a valid answer is read.
    ///
    /// An empty line repeats the previous answer and end of input counts as
    /// `no`. Once `all` has been answered every later call returns
    /// [`Answer::Yes`] without prompting.
    pub fn ask(&mut self, name: &str) -> io::Result<Answer> {
        if self.all {
            return Ok(Answer::Yes);
        }
        loop {
            write!(
                self.prompt,
                "{}\nPlease confirm (y/n/A/q) [{}]: ",
                name, self.last
            )?;
            self.prompt.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(Answer::No);
            }
            let line = line.trim();
            let answer = if line.is_empty() {
                self.last
            } else {
                match line.parse::<Answer>() {
                    Ok(answer) => answer,
                    Err(e) => {
                        tracing::debug!(error = %e, "re-prompting");
                        continue;
                    }
                }
            };

            self.last = answer;
            if answer == Answer::All {
                self.all = true;
            }
            return Ok(answer);
        }
    }
}
