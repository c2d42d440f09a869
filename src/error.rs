//! Error types for deck parsing
//!
//! Only two kinds of failure exist. A [Syntax](ErrorKind::Syntax) error is
//! structural: the wrong number of tokens, an unmatched parenthesis, an
//! unrecognised mnemonic or keyword, or a broken continuation. A
//! [Semantic](ErrorKind::Semantic) error means a token was read fine but its
//! value is not allowed, such as an out-of-range number or a missing
//! designator.
//!
//! Errors are raised where they are detected and propagated unchanged, so the
//! caller always sees the first problem in a deck.

// standard library
use std::fmt;

// external crates
use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, InpError>;

/// The two categories of parse failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Structural problem with the tokens of a card or the deck layout
    Syntax,
    /// Value parsed correctly but violates its domain constraint
    Semantic,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "Syntax error"),
            Self::Semantic => write!(f, "Semantic error"),
        }
    }
}

/// An error raised while reading or validating a deck
///
/// The source line is attached by the [Block](crate::block::Block) once the
/// failing card is known, so lower level parsers never need to track it.
///
/// ```rust
/// # use inpdeck::error::{InpError, ErrorKind};
/// let error = InpError::semantic("cell number 0 not in 1..=99999999").at_line(12);
/// assert_eq!(error.kind, ErrorKind::Semantic);
/// assert_eq!(
///     error.to_string(),
///     "Semantic error (line 12): cell number 0 not in 1..=99999999"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}{}: {message}", line_suffix(.line))]
pub struct InpError {
    /// Category of the failure
    pub kind: ErrorKind,
    /// Human readable description, naming the offending token or field
    pub message: String,
    /// Line in the source deck where the failing card starts
    pub line: Option<usize>,
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(n) => format!(" (line {n})"),
        None => String::new(),
    }
}

impl InpError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: None,
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    pub fn semantic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Semantic, message)
    }

    /// Attach a source line, keeping any line already recorded
    pub fn at_line(mut self, line: usize) -> Self {
        if self.line.is_none() {
            self.line = Some(line);
        }
        self
    }

    /// Prefix the message with where the error happened, e.g. `"sdef: "`
    pub fn within(mut self, context: &str) -> Self {
        self.message = format!("{context}: {}", self.message);
        self
    }

    /// Ran out of tokens before a field could be filled
    pub fn too_few(field: &str) -> Self {
        Self::syntax(format!("too few fields, expected {field}"))
    }

    /// Tokens were left over once a fixed-arity card was filled
    pub fn too_many(context: &str, leftover: &[String]) -> Self {
        Self::syntax(format!(
            "too many fields for {context}, unexpected \"{}\"",
            leftover.join(" ")
        ))
    }

    /// Mnemonic or keyword that does not resolve to anything known
    pub fn unrecognised(what: &str, token: &str) -> Self {
        Self::syntax(format!("unrecognised {what} \"{token}\""))
    }

    /// Token could not be read as the type of the field
    pub fn invalid_token(field: &str, token: &str) -> Self {
        Self::syntax(format!("could not read \"{token}\" as {field}"))
    }

    pub fn is_syntax(&self) -> bool {
        self.kind == ErrorKind::Syntax
    }

    pub fn is_semantic(&self) -> bool {
        self.kind == ErrorKind::Semantic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_is_only_set_once() {
        let error = InpError::syntax("bad").at_line(3).at_line(9);
        assert_eq!(error.line, Some(3));
        assert_eq!(error.to_string(), "Syntax error (line 3): bad");
    }

    #[test]
    fn context_prefixes_message() {
        let error = InpError::too_few("radius").within("so");
        assert!(error.is_syntax());
        assert_eq!(error.message, "so: too few fields, expected radius");
    }
}
