use std::{
    fmt,
    io::{self, BufRead, Stdout, Write},
};

use crate::error::{KitError, KitResult};

/// Operator reply to a question. Matching is exact: `Yes` and `y` are
/// `Other`, never `Yes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Other(String),
}

impl Answer {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "yes" => Answer::Yes,
            "no" => Answer::No,
            other => Answer::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Answer::Yes => "yes",
            Answer::No => "no",
            Answer::Other(text) => text,
        }
    }

    /// True only when the operator typed exactly `literal`.
    pub fn is_literal(&self, literal: &str) -> bool {
        self.as_str() == literal
    }
}

/// Blocking line-oriented operator console.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<io::StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Console::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, args: fmt::Arguments<'_>) -> KitResult<()> {
        self.output.write_fmt(args).map_err(KitError::Console)?;
        self.output.write_all(b"\n").map_err(KitError::Console)
    }

    pub fn ask(&mut self, question: &str) -> KitResult<Answer> {
        let line = self.ask_line(question)?;
        Ok(Answer::parse(line.as_deref().unwrap_or_default()))
    }

    /// Prints `question` and reads one line. `None` means end of input.
    pub fn ask_line(&mut self, question: &str) -> KitResult<Option<String>> {
        write!(self.output, "{question} ").map_err(KitError::Console)?;
        self.output.flush().map_err(KitError::Console)?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line).map_err(KitError::Console)?;
        if read == 0 {
            // keep later output off the prompt line
            self.output.write_all(b"\n").map_err(KitError::Console)?;
            return Ok(None);
        }

        Ok(Some(line.trim().to_string()))
    }

    pub fn into_parts(self) -> (R, W) {
        (self.input, self.output)
    }
}

/// `println!`-style output through a [`Console`].
#[macro_export]
macro_rules! say {
    ($console:expr, $($arg:tt)*) => {
        $console.say(format_args!($($arg)*))
    };
}
