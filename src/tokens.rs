//! Double ended token queue shared by every card parser
//!
//! Card grammars mostly read left to right (mnemonic, then positional fields)
//! but some trailing values are easier to take from the back. Every pop or
//! peek fails fast with a [Syntax](crate::error::ErrorKind::Syntax) error when
//! the queue is empty, and nothing is ever discarded silently: a parser that
//! stops early leaves the remainder for an explicit [TokenDeque::ensure_empty]
//! check.

// internal modules
use crate::error::{InpError, Result};

// standard library
use std::collections::VecDeque;
use std::fmt;

/// Ordered sequence of string tokens
///
/// ```rust
/// # use inpdeck::tokens::TokenDeque;
/// let mut tokens = TokenDeque::from("tr1 0 0 5");
/// assert_eq!(tokens.pop_front().unwrap(), "tr1");
/// assert_eq!(tokens.pop_back().unwrap(), "5");
/// assert_eq!(tokens.len(), 2);
///
/// tokens.take_rest();
/// assert!(tokens.is_empty());
/// assert!(tokens.pop_front().is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenDeque {
    tokens: VecDeque<String>,
}

impl TokenDeque {
    pub fn new() -> Self {
        Default::default()
    }

    /// Remove the first token, failing with "too few fields" when empty
    pub fn pop_front(&mut self) -> Result<String> {
        self.pop_front_or(|| InpError::too_few("another token"))
    }

    /// Remove the last token, failing with "too few fields" when empty
    pub fn pop_back(&mut self) -> Result<String> {
        self.pop_back_or(|| InpError::too_few("another token"))
    }

    /// Remove the first token, failing with a caller supplied error
    pub fn pop_front_or(&mut self, error: impl FnOnce() -> InpError) -> Result<String> {
        self.tokens.pop_front().ok_or_else(error)
    }

    /// Remove the last token, failing with a caller supplied error
    pub fn pop_back_or(&mut self, error: impl FnOnce() -> InpError) -> Result<String> {
        self.tokens.pop_back().ok_or_else(error)
    }

    /// Look at the first token without consuming it
    pub fn peek_front(&self) -> Result<&str> {
        self.peek_front_or(|| InpError::too_few("another token"))
    }

    /// Look at the last token without consuming it
    pub fn peek_back(&self) -> Result<&str> {
        self.peek_back_or(|| InpError::too_few("another token"))
    }

    pub fn peek_front_or(&self, error: impl FnOnce() -> InpError) -> Result<&str> {
        self.tokens.front().map(String::as_str).ok_or_else(error)
    }

    pub fn peek_back_or(&self, error: impl FnOnce() -> InpError) -> Result<&str> {
        self.tokens.back().map(String::as_str).ok_or_else(error)
    }

    /// First token if there is one, for optional trailing fields
    pub fn front(&self) -> Option<&str> {
        self.tokens.front().map(String::as_str)
    }

    /// Last token if there is one, for optional trailing fields
    pub fn back(&self) -> Option<&str> {
        self.tokens.back().map(String::as_str)
    }

    pub fn push_front(&mut self, token: impl Into<String>) {
        self.tokens.push_front(token.into());
    }

    pub fn push_back(&mut self, token: impl Into<String>) {
        self.tokens.push_back(token.into());
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Pop the first token only if it equals `token`
    pub fn pop_if(&mut self, token: &str) -> bool {
        if self.front() == Some(token) {
            self.tokens.pop_front();
            true
        } else {
            false
        }
    }

    /// Consume everything that is left, for list-valued fields
    pub fn take_rest(&mut self) -> Vec<String> {
        self.tokens.drain(..).collect()
    }

    /// Take exactly `n` tokens from the front, or fail naming `field`
    pub fn take(&mut self, n: usize, field: &str) -> Result<Vec<String>> {
        if self.tokens.len() < n {
            return Err(InpError::too_few(&format!(
                "{n} entries for {field}, found {}",
                self.tokens.len()
            )));
        }
        Ok(self.tokens.drain(..n).collect())
    }

    /// Fail with "too many fields" if anything is left over
    pub fn ensure_empty(&self, context: &str) -> Result<()> {
        if self.tokens.is_empty() {
            Ok(())
        } else {
            let leftover = self.tokens.iter().cloned().collect::<Vec<String>>();
            Err(InpError::too_many(context, &leftover))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}

impl From<&str> for TokenDeque {
    /// Whitespace separated tokens of a single logical line
    fn from(line: &str) -> Self {
        line.split_whitespace().map(str::to_string).collect()
    }
}

impl From<Vec<String>> for TokenDeque {
    fn from(tokens: Vec<String>) -> Self {
        Self {
            tokens: tokens.into(),
        }
    }
}

impl FromIterator<String> for TokenDeque {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for TokenDeque {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let tokens = self.tokens.iter().cloned().collect::<Vec<String>>();
        write!(f, "{}", tokens.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_ends() {
        let mut tokens = TokenDeque::from("a b c d");
        assert_eq!(tokens.peek_front().unwrap(), "a");
        assert_eq!(tokens.peek_back().unwrap(), "d");
        assert_eq!(tokens.pop_back().unwrap(), "d");
        tokens.push_front("z");
        tokens.push_back("y");
        assert_eq!(tokens.to_string(), "z a b c y");
    }

    #[test]
    fn empty_deque_fails_fast() {
        let mut tokens = TokenDeque::new();
        assert!(tokens.is_empty());
        assert!(tokens.pop_front().unwrap_err().is_syntax());
        assert!(tokens.pop_back().is_err());
        assert!(tokens.peek_front().is_err());
        assert!(tokens.peek_back().is_err());

        let error = tokens
            .pop_front_or(|| InpError::too_few("radius"))
            .unwrap_err();
        assert_eq!(error.message, "too few fields, expected radius");
    }

    #[test]
    fn leftovers_are_reported() {
        let mut tokens = TokenDeque::from("1 2 3");
        let taken = tokens.take(2, "pair").unwrap();
        assert_eq!(taken, vec!["1", "2"]);

        let error = tokens.ensure_empty("lost").unwrap_err();
        assert!(error.is_syntax());
        assert!(error.message.contains("\"3\""));

        assert!(tokens.take(2, "pair").is_err());
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn conditional_pop() {
        let mut tokens = TokenDeque::from("no 1 2");
        assert!(tokens.pop_if("no"));
        assert!(!tokens.pop_if("no"));
        assert_eq!(tokens.len(), 2);
    }
}
