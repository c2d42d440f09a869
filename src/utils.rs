//! Common small functions used throughout the crate
//!
//! These are left public for the convenience of the user. For example the
//! canonical number formatting used by every card, or wrapping a long card
//! onto continuation lines.

// external crates
use textwrap::{Options, WordSeparator, WordSplitter};

// Alias for the format! macro out of laziness
pub use std::format as f;

/// Maximum number of columns for any line in a deck
pub const MAX_COLUMNS: usize = 80;

/// Leading blanks written at the start of a continuation line
pub const CONTINUATION_INDENT: usize = 5;

/// Fewest leading blanks that make an input line continue the card above
pub const CONTINUATION_MIN_INDENT: usize = 2;

/// Tab stops used when expanding tabs in raw input
pub const TAB_WIDTH: usize = 8;

/// Extends primitives with the formatting options needed for decks
pub trait NumberFmt {
    /// Shortest text that reads back as exactly the same value
    ///
    /// Plain notation is used for everyday magnitudes and scientific notation
    /// outside of them, so that `1e20` does not become twenty digits.
    ///
    /// ```rust
    /// # use inpdeck::utils::NumberFmt;
    /// assert_eq!(1.0_f64.inp(), "1");
    /// assert_eq!((-2.5_f64).inp(), "-2.5");
    /// assert_eq!(1.0e20_f64.inp(), "1e20");
    /// assert_eq!(2.53e-8_f64.inp(), "2.53e-8");
    /// assert_eq!(0.0_f64.inp(), "0");
    /// ```
    fn inp(&self) -> String;
}

impl NumberFmt for f64 {
    fn inp(&self) -> String {
        let magnitude = self.abs();
        if *self != 0.0 && !(1.0e-4..1.0e6).contains(&magnitude) {
            f!("{:e}", self)
        } else {
            f!("{}", self)
        }
    }
}

/// Split a rendered card over continuation lines
///
/// Lines that fit in [MAX_COLUMNS] are returned untouched. Longer lines are
/// broken at token boundaries only, every segment but the last ends with
/// `" &"`, and every continuation starts with [CONTINUATION_INDENT] blanks.
/// A single token longer than a line is left whole rather than split.
///
/// ```rust
/// # use inpdeck::utils::{f, wrap};
/// let line = f!("imp:n {}", ["1"; 45].join(" "));
/// let wrapped = wrap(&line);
/// assert!(wrapped.lines().all(|l| l.len() <= 80));
/// assert!(wrapped.lines().next().unwrap().ends_with(" &"));
/// assert!(wrapped.lines().nth(1).unwrap().starts_with("     1"));
/// ```
pub fn wrap(line: &str) -> String {
    if line.len() <= MAX_COLUMNS {
        return line.to_string();
    }

    let indent = " ".repeat(CONTINUATION_INDENT);
    let options = Options::new(MAX_COLUMNS - 2)
        .subsequent_indent(&indent)
        .word_separator(WordSeparator::AsciiSpace)
        .word_splitter(WordSplitter::NoHyphenation)
        .break_words(false);

    textwrap::wrap(line, options)
        .iter()
        .map(|segment| segment.trim_end().to_string())
        .collect::<Vec<String>>()
        .join(" &\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.5, "0.5")]
    #[case(1.0e-4, "0.0001")]
    #[case(999999.0, "999999")]
    #[case(1.0e6, "1e6")]
    #[case(-3.2e-5, "-3.2e-5")]
    fn canonical_numbers(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(value.inp(), expected);
        assert_eq!(expected.parse::<f64>().unwrap(), value);
    }

    #[test]
    fn short_lines_untouched() {
        let line = "1 0 -1 imp:n=1";
        assert_eq!(wrap(line), line);
    }

    #[test]
    fn long_lines_split_on_tokens() {
        let tokens = (1..=40).map(|i| i.to_string()).collect::<Vec<_>>();
        let line = f!("sp1 {}", tokens.join(" "));
        let wrapped = wrap(&line);

        let lines = wrapped.lines().collect::<Vec<_>>();
        assert!(lines.len() > 1);
        for l in &lines[..lines.len() - 1] {
            assert!(l.ends_with(" &"));
            assert!(l.len() <= MAX_COLUMNS);
        }
        for l in &lines[1..] {
            assert!(l.starts_with("     "));
        }

        // tokens survive unchanged and in order
        let rejoined = wrapped
            .split_whitespace()
            .filter(|t| *t != "&")
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(rejoined, line);
    }

    #[test]
    fn oversized_token_kept_whole() {
        let long = "x".repeat(100);
        let wrapped = wrap(&f!("fc4 {long} end"));
        assert!(wrapped.contains(&long));
    }
}
