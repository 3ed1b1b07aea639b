//! Defines [`SyntaxError`], the positioned error type of the reader.
//!
//! Every error carries the 1-based line and 1-based column at which it was
//! detected, a coarse [`ErrorKind`], and a message. Lexical errors are
//! fatal to the stream; syntactic and precedence errors are recorded per
//! clause and the reader recovers at the next terminator.

use smartstring::alias::String;
use std::fmt;
use thiserror::Error;

/// The coarse classification of a reader error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid encoding, unterminated quote, bad escape, unrecognised
    /// character. Fatal to the stream.
    Lexical,
    /// A malformed term: missing bracket, bad argument list, stray token.
    Syntax,
    /// No admissible operator declaration at the current position.
    Precedence,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Lexical => "lexical error",
            ErrorKind::Syntax => "syntax error",
            ErrorKind::Precedence => "operator priority clash",
        })
    }
}

/// A reader error annotated with its source position.
///
/// Lines and columns are both 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{line}:{col}: {kind}: {message}")]
pub struct SyntaxError {
    pub line: u32,
    pub col: u32,
    pub kind: ErrorKind,
    pub message: String,
}

impl SyntaxError {
    /// A fatal lexical error.
    pub fn lexical(line: u32, col: u32, message: impl Into<String>) -> Self {
        Self { line, col, kind: ErrorKind::Lexical, message: message.into() }
    }

    /// A recoverable syntax error.
    pub fn syntax(line: u32, col: u32, message: impl Into<String>) -> Self {
        Self { line, col, kind: ErrorKind::Syntax, message: message.into() }
    }

    /// An operator precedence clash.
    pub fn precedence(line: u32, col: u32, message: impl Into<String>) -> Self {
        Self { line, col, kind: ErrorKind::Precedence, message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_position_and_kind() {
        let err = SyntaxError::syntax(3, 7, "expected ')'");
        assert_eq!(err.to_string(), "3:7: syntax error: expected ')'");
    }
}
