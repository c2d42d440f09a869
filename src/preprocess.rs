//! Normalise raw card text into one canonical line per card
//!
//! Cards in a deck may be spread over several physical lines, abbreviated with
//! shorthand, written with tabs and mixed case, interleaved with comments, and
//! even laid out as vertical tables. Everything downstream expects exactly one
//! logical line per card, so this module folds all of that away.
//!
//! The steps applied to a card region are:
//!
//! 1. Case folding and tab expansion to stops of [TAB_WIDTH] columns
//! 2. Separation of inline `$` comments from code on every physical line
//! 3. Isolation of full-line comments (`c` in column 1, then a blank or nothing)
//! 4. Continuation joining, on a trailing `&` or [CONTINUATION_MIN_INDENT] or
//!    more leading blanks
//! 5. Transposition of vertical tables (a line starting with `#`)
//! 6. Shorthand expansion of `Nj`, `Nr`, `Ni`, `Nilog`, and `xm`
//! 7. Whitespace collapse and `kw = value` becoming `kw=value`
//!
//! Comments are floated to the end of the merged line as `$ text` so that no
//! data is ever lost.
//!
//! ```rust
//! # use inpdeck::preprocess::normalize;
//! let raw = "IMP:N 1 2R $ cells 1-3\n     3j 0";
//! assert_eq!(normalize(raw).unwrap(), "imp:n 1 1 1 j j j 0 $ cells 1-3");
//! ```

// internal modules
use crate::error::{InpError, Result};
use crate::parsers::{self, Shorthand};
use crate::utils::{f, NumberFmt, CONTINUATION_MIN_INDENT, TAB_WIDTH};

// standard library
use std::fmt;

// external crates
use itertools::Itertools;
use log::{debug, trace, warn};

/// Cards that carry free text, left untouched by shorthand expansion
const FREE_TEXT: [&str; 3] = ["fc", "sc", "mplot"];

/// Category of a logical line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Line of nothing but whitespace
    Blank,
    /// Full-line comment, or a line with only an inline comment
    Comment,
    /// A complete card, continuation lines included
    Card,
}

/// One card (or comment) after preprocessing
///
/// `number` is the physical line the card starts on, counted from the
/// `first_line` given to [logical_lines].
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalLine {
    pub number: usize,
    pub kind: LineKind,
    pub code: String,
    pub comments: Vec<String>,
}

impl LogicalLine {
    fn blank(number: usize) -> Self {
        Self {
            number,
            kind: LineKind::Blank,
            code: String::new(),
            comments: Vec::new(),
        }
    }

    fn comment(number: usize, text: &str) -> Self {
        Self {
            number,
            kind: LineKind::Comment,
            code: String::new(),
            comments: vec![text.to_string()],
        }
    }

    fn card(number: usize, code: String, comments: Vec<String>) -> Self {
        Self {
            number,
            kind: LineKind::Card,
            code,
            comments,
        }
    }

    pub fn is_card(&self) -> bool {
        self.kind == LineKind::Card
    }

    pub fn is_comment(&self) -> bool {
        self.kind == LineKind::Comment
    }

    pub fn is_blank(&self) -> bool {
        self.kind == LineKind::Blank
    }
}

impl fmt::Display for LogicalLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            LineKind::Blank => Ok(()),
            LineKind::Comment => match self.comments.first() {
                Some(text) if !text.is_empty() => write!(f, "c {text}"),
                _ => write!(f, "c"),
            },
            LineKind::Card => {
                write!(f, "{}", self.code)?;
                for comment in &self.comments {
                    write!(f, " $ {comment}")?;
                }
                Ok(())
            }
        }
    }
}

/// Normalise a card region into canonical text
///
/// Every card becomes a single line of the form `code $ comment $ comment`,
/// full-line comments become `c text`, and blank lines are kept.
pub fn normalize(raw: &str) -> Result<String> {
    Ok(logical_lines(raw, 1)?.iter().join("\n"))
}

/// Split a line into its code and any inline `$` comments
///
/// ```rust
/// # use inpdeck::preprocess::extract_inline_comments;
/// let (code, comments) = extract_inline_comments("1 0  -1 $ void $ sphere");
/// assert_eq!(code, "1 0 -1");
/// assert_eq!(comments, vec!["void", "sphere"]);
/// ```
pub fn extract_inline_comments(line: &str) -> (String, Vec<String>) {
    let mut pieces = line.split('$');
    let code = pieces
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .join(" ");

    let comments = pieces
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();

    (code, comments)
}

/// Replace tabs with blanks up to the next tab stop
///
/// ```rust
/// # use inpdeck::preprocess::expand_tabs;
/// assert_eq!(expand_tabs("ab\tc"), "ab      c");
/// assert_eq!(expand_tabs("\t1"), "        1");
/// ```
pub fn expand_tabs(line: &str) -> String {
    let mut expanded = String::with_capacity(line.len());
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let width = TAB_WIDTH - (column % TAB_WIDTH);
            expanded.push_str(&" ".repeat(width));
            column += width;
        } else {
            expanded.push(c);
            column += 1;
        }
    }
    expanded
}

/// Run the full preprocessing pipeline over a card region
///
/// Line numbers start at `first_line` so that errors and cards point back to
/// the right place in the original deck.
pub fn logical_lines(raw: &str, first_line: usize) -> Result<Vec<LogicalLine>> {
    let mut lines: Vec<LogicalLine> = Vec::new();
    let mut pending: Option<Pending> = None;
    // full-line comments not yet known to be inside or after the pending card
    let mut held: Vec<LogicalLine> = Vec::new();

    for (i, physical) in raw.lines().enumerate() {
        let number = first_line + i;
        let text = expand_tabs(&physical.to_lowercase());
        trace!("{number:>5}: {text}");

        if text.trim().is_empty() {
            close(&mut pending, &mut held, &mut lines)?;
            lines.push(LogicalLine::blank(number));
            continue;
        }

        if is_comment_line(&text) {
            held.push(LogicalLine::comment(number, text[1..].trim()));
            continue;
        }

        let indent = text.len() - text.trim_start().len();
        let (code, comments) = extract_inline_comments(&text);

        // rows of a vertical table are new lines, never continuations
        if let Some(table) = pending.as_mut().filter(|p| p.is_table() && !p.open) {
            let first = code.split_whitespace().next();
            if first.is_some_and(parsers::is_value_token) {
                lines.append(&mut held);
                table.add_row(number, &code, comments)?;
                continue;
            }
        }

        let continues = pending
            .as_ref()
            .is_some_and(|p| p.open || indent >= CONTINUATION_MIN_INDENT);

        if continues {
            lines.append(&mut held);
            if let Some(card) = pending.as_mut() {
                card.extend(number, &code, comments);
            }
            continue;
        }

        close(&mut pending, &mut held, &mut lines)?;
        if code.is_empty() {
            for comment in &comments {
                lines.push(LogicalLine::comment(number, comment));
            }
        } else {
            pending = Some(Pending::new(number, &code, comments));
        }
    }

    close(&mut pending, &mut held, &mut lines)?;
    debug!("Preprocessed {} logical lines", lines.len());
    Ok(lines)
}

/// Expand every shorthand token in a card
///
/// ```rust
/// # use inpdeck::preprocess::expand_shorthand;
/// let tokens = ["5", "2r", "3j"].map(String::from).to_vec();
/// assert_eq!(expand_shorthand(tokens).unwrap(), vec!["5", "5", "5", "j", "j", "j"]);
///
/// let tokens = ["1", "3i", "5"].map(String::from).to_vec();
/// assert_eq!(expand_shorthand(tokens).unwrap(), vec!["1", "2", "3", "4", "5"]);
/// ```
pub fn expand_shorthand(tokens: Vec<String>) -> Result<Vec<String>> {
    let mut expanded: Vec<String> = Vec::with_capacity(tokens.len());
    let mut tokens = tokens.into_iter().peekable();

    while let Some(token) = tokens.next() {
        let Some(shorthand) = parsers::parse_shorthand(&token) else {
            expanded.push(token);
            continue;
        };

        match shorthand {
            Shorthand::Jump(n) => {
                expanded.extend(std::iter::repeat("j".to_string()).take(n));
            }
            Shorthand::Repeat(n) => {
                let previous = match expanded.last() {
                    Some(p) if p != "=" => p.clone(),
                    _ => return Err(no_neighbour("before", &token)),
                };
                expanded.extend(std::iter::repeat(previous).take(n));
            }
            Shorthand::Interpolate(n) | Shorthand::LogInterpolate(n) => {
                let start = previous_number(&expanded, &token)?;
                let end = tokens
                    .peek()
                    .and_then(|t| parsers::parse_real(t))
                    .ok_or_else(|| no_neighbour("after", &token))?;
                let logarithmic = matches!(shorthand, Shorthand::LogInterpolate(_));
                expanded.extend(interpolate(start, end, n, logarithmic)?);
            }
            Shorthand::Multiply(factor) => {
                let previous = previous_number(&expanded, &token)?;
                expanded.push(tidy(previous * factor).inp());
            }
        }
    }

    Ok(expanded)
}

/// Card being assembled from one or more physical lines
#[derive(Debug)]
struct Pending {
    number: usize,
    last: usize,
    parts: Vec<String>,
    comments: Vec<String>,
    /// Last physical line ended with `&`
    open: bool,
    rows: Vec<(usize, Vec<String>)>,
}

impl Pending {
    fn new(number: usize, code: &str, comments: Vec<String>) -> Self {
        let mut pending = Self {
            number,
            last: number,
            parts: Vec::new(),
            comments: Vec::new(),
            open: false,
            rows: Vec::new(),
        };
        pending.extend(number, code, comments);
        pending
    }

    fn extend(&mut self, number: usize, code: &str, comments: Vec<String>) {
        let (code, open) = strip_ampersand(code);
        if !code.is_empty() {
            self.parts.push(code.to_string());
        }
        self.comments.extend(comments);
        self.open = open;
        self.last = number;
    }

    fn is_table(&self) -> bool {
        self.parts.first().is_some_and(|p| p.starts_with('#'))
    }

    fn add_row(&mut self, number: usize, code: &str, comments: Vec<String>) -> Result<()> {
        if strip_ampersand(code).1 {
            return Err(
                InpError::syntax("continuation inside a vertical table row").at_line(number)
            );
        }
        if !comments.is_empty() {
            warn!("Warning: comment dropped from vertical table row on line {number}");
        }
        let row = code.split_whitespace().map(str::to_string).collect();
        self.rows.push((number, row));
        Ok(())
    }

    /// Turn the collected text into one or more card lines
    fn finish(self) -> Result<Vec<LogicalLine>> {
        if self.open {
            return Err(InpError::syntax(f!(
                "unterminated continuation \"&\" on line {}",
                self.last
            ))
            .at_line(self.last));
        }

        if self.is_table() {
            return self.transpose();
        }

        let code = self.parts.join(" ");
        let code = canonical_code(&code).map_err(|e| e.at_line(self.number))?;
        Ok(vec![LogicalLine::card(self.number, code, self.comments)])
    }

    /// Vertical format, one card per header mnemonic
    ///
    /// Rows may start with an extra label entry (usually the cell number)
    /// which is ignored.
    fn transpose(self) -> Result<Vec<LogicalLine>> {
        let header = self.parts.join(" ");
        let mnemonics = header
            .trim_start_matches('#')
            .split_whitespace()
            .collect::<Vec<&str>>();

        if mnemonics.is_empty() {
            return Err(InpError::syntax("vertical table without any mnemonics").at_line(self.number));
        }
        if self.rows.is_empty() {
            return Err(InpError::syntax("vertical table without any rows").at_line(self.number));
        }

        let n = mnemonics.len();
        let mut columns: Vec<Vec<String>> = vec![Vec::with_capacity(self.rows.len()); n];
        for (number, row) in self.rows {
            let values = match row.len() {
                len if len == n => &row[..],
                len if len == n + 1 => &row[1..],
                len => {
                    return Err(InpError::syntax(f!(
                        "vertical table row has {len} entries for {n} mnemonics"
                    ))
                    .at_line(number))
                }
            };
            for (column, value) in columns.iter_mut().zip(values) {
                column.push(value.clone());
            }
        }

        let mut comments = Some(self.comments);
        let mut lines = Vec::with_capacity(n);
        for (mnemonic, column) in mnemonics.iter().zip(columns) {
            let code = f!("{mnemonic} {}", column.join(" "));
            let code = canonical_code(&code).map_err(|e| e.at_line(self.number))?;
            // header comments stay with the first card
            let comments = comments.take().unwrap_or_default();
            lines.push(LogicalLine::card(self.number, code, comments));
        }

        trace!("Transposed vertical table into {} cards", lines.len());
        Ok(lines)
    }
}

/// Flush the pending card followed by any held comments
fn close(
    pending: &mut Option<Pending>,
    held: &mut Vec<LogicalLine>,
    lines: &mut Vec<LogicalLine>,
) -> Result<()> {
    if let Some(card) = pending.take() {
        lines.extend(card.finish()?);
    }
    lines.append(held);
    Ok(())
}

/// `c` alone or followed by a blank, in the first column
fn is_comment_line(text: &str) -> bool {
    let text = text.trim_end();
    text == "c" || text.starts_with("c ")
}

fn strip_ampersand(code: &str) -> (&str, bool) {
    match code.trim_end().strip_suffix('&') {
        Some(code) => (code.trim_end(), true),
        None => (code, false),
    }
}

/// Expand shorthand and tidy the spacing of a single card
fn canonical_code(code: &str) -> Result<String> {
    let mut tokens = code.split_whitespace();
    let is_free_text = tokens
        .next()
        .and_then(parsers::parse_mnemonic)
        .is_some_and(|m| m.prefix.is_none() && FREE_TEXT.contains(&m.name));

    if is_free_text {
        return Ok(code.split_whitespace().join(" "));
    }

    let tokens = split_equals(code);
    let tokens = expand_shorthand(tokens)?;
    Ok(join_tokens(&tokens))
}

/// Tokenise with every `=` as a token of its own
fn split_equals(code: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in code.split_whitespace() {
        for (i, piece) in word.split('=').enumerate() {
            if i > 0 {
                tokens.push("=".to_string());
            }
            if !piece.is_empty() {
                tokens.push(piece.to_string());
            }
        }
    }
    tokens
}

/// Join tokens with single blanks, gluing `=` to both neighbours
fn join_tokens(tokens: &[String]) -> String {
    let mut line = String::new();
    let mut glue = true;
    for token in tokens {
        if token == "=" {
            line.push('=');
            glue = true;
            continue;
        }
        if !glue {
            line.push(' ');
        }
        line.push_str(token);
        glue = false;
    }
    line
}

fn previous_number(expanded: &[String], token: &str) -> Result<f64> {
    expanded
        .last()
        .and_then(|t| parsers::parse_real(t))
        .ok_or_else(|| no_neighbour("before", token))
}

fn no_neighbour(side: &str, token: &str) -> InpError {
    InpError::syntax(f!("shorthand \"{token}\" has no value {side} it"))
}

fn interpolate(start: f64, end: f64, n: usize, logarithmic: bool) -> Result<Vec<String>> {
    if logarithmic && (start <= 0.0 || end <= 0.0) {
        return Err(InpError::semantic(f!(
            "log interpolation between {start} and {end} needs positive values"
        )));
    }

    let values = (1..=n)
        .map(|k| {
            let fraction = k as f64 / (n + 1) as f64;
            let value = match logarithmic {
                true => start * (end / start).powf(fraction),
                false => start + (end - start) * fraction,
            };
            tidy(value).inp()
        })
        .collect();

    Ok(values)
}

/// Round away the floating point noise of interpolation (12 significant digits)
fn tidy(value: f64) -> f64 {
    f!("{value:.11e}").parse::<f64>().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn cards(raw: &str) -> Vec<String> {
        logical_lines(raw, 1)
            .unwrap()
            .into_iter()
            .filter(LogicalLine::is_card)
            .map(|l| l.to_string())
            .collect()
    }

    #[rstest]
    #[case("3j", "j j j")]
    #[case("5 2r", "5 5 5")]
    #[case("imp:n 1 r 2", "imp:n 1 1 2")]
    #[case("e4 1 3i 5", "e4 1 2 3 4 5")]
    #[case("e0 1 1ilog 100", "e0 1 10 100")]
    #[case("e0 1 2m 2m", "e0 1 2 4")]
    #[case("imp:n = 1 2r", "imp:n=1 1 1")]
    #[case("IMP:N=1\t0", "imp:n=1 0")]
    #[case("fc4 a r i tally", "fc4 a r i tally")]
    #[case("1 0 -1 imp:n=1", "1 0 -1 imp:n=1")]
    fn single_lines(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("r 1")]
    #[case("imp:n= 2r")]
    #[case("e0 1 3i")]
    #[case("e0 3i 5")]
    #[case("e0 j 2m")]
    fn shorthand_without_neighbours(#[case] raw: &str) {
        assert!(normalize(raw).unwrap_err().is_syntax());
    }

    #[test]
    fn log_interpolation_needs_positive_values() {
        assert!(normalize("e0 0 2ilog 10").unwrap_err().is_semantic());
    }

    #[test]
    fn ampersand_continuation() {
        let raw = "sp1 0 &\n 1 2 &\n3";
        assert_eq!(cards(raw), vec!["sp1 0 1 2 3"]);
    }

    #[test]
    fn indented_continuation() {
        let raw = "1 0 -1\n     imp:n=1\n2 0 1";
        assert_eq!(cards(raw), vec!["1 0 -1 imp:n=1", "2 0 1"]);
    }

    #[rstest]
    #[case("imp:n 1 1\n  1 0")]
    #[case("imp:n 1 1\n    1 0")]
    #[case("imp:n 1 1\n\t1 0")]
    fn short_indents_continue(#[case] raw: &str) {
        assert_eq!(cards(raw), vec!["imp:n 1 1 1 0"]);
        assert_eq!(normalize(raw).unwrap(), "imp:n 1 1 1 0");
    }

    #[test]
    fn one_blank_starts_a_new_card() {
        let raw = "1 0 -1\n 2 0 1";
        assert_eq!(cards(raw), vec!["1 0 -1", "2 0 1"]);
    }

    #[test]
    fn comments_float_to_the_end() {
        let raw = "1 0 $ void &\n     -1 imp:n=1 $ sphere";
        assert_eq!(cards(raw), vec!["1 0 -1 imp:n=1 $ void & $ sphere"]);

        let raw = "1 0 & $ void\n -1";
        assert_eq!(cards(raw), vec!["1 0 -1 $ void"]);
    }

    #[test]
    fn full_line_comments_inside_continuations() {
        let lines = logical_lines("imp:n 1 &\nc note\n 2\nc after", 1).unwrap();
        let text = lines.iter().map(|l| l.to_string()).collect::<Vec<_>>();
        assert_eq!(text, vec!["c note", "imp:n 1 2", "c after"]);
        assert_eq!(lines[1].number, 1);
        assert!(lines[0].is_comment());
    }

    #[test]
    fn comment_after_complete_card_keeps_order() {
        let lines = logical_lines("1 0 -1\nc between\n2 0 1", 10).unwrap();
        let text = lines.iter().map(|l| l.to_string()).collect::<Vec<_>>();
        assert_eq!(text, vec!["1 0 -1", "c between", "2 0 1"]);
        assert_eq!(lines[2].number, 12);
    }

    #[rstest]
    #[case("c")]
    #[case("C  upper")]
    #[case("c\tafter tab")]
    fn comment_lines(#[case] raw: &str) {
        let lines = logical_lines(raw, 1).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].is_comment());
    }

    #[test]
    fn cards_starting_with_c_are_not_comments() {
        assert_eq!(cards("cut:n 1e20 0"), vec!["cut:n 1e20 0"]);
    }

    #[test]
    fn unterminated_continuation() {
        let error = logical_lines("imp:n 1\nsp1 1 &", 4).unwrap_err();
        assert!(error.is_syntax());
        assert_eq!(error.line, Some(5));

        let error = logical_lines("imp:n 1 &\n\nnps 1", 1).unwrap_err();
        assert_eq!(error.line, Some(1));
    }

    #[test]
    fn vertical_tables() {
        let raw = "# imp:n imp:p\n1 1 0\n2 1 1\n3 0 r\nnps 10";
        assert_eq!(cards(raw), vec!["imp:n 1 1 0", "imp:p 0 1 1", "nps 10"]);

        let raw = "#  imp:n  vol $ header\n   1     2\n   1     3";
        assert_eq!(cards(raw), vec!["imp:n 1 1 $ header", "vol 2 3"]);
    }

    #[rstest]
    #[case("# imp:n imp:p\n1 1 0 0 0")]
    #[case("# imp:n\nnps 1")]
    #[case("#\n1 1")]
    fn bad_vertical_tables(#[case] raw: &str) {
        assert!(logical_lines(raw, 1).unwrap_err().is_syntax());
    }

    #[test]
    fn blank_lines_are_kept() {
        let lines = logical_lines("1 0 -1\n\n2 0 1", 1).unwrap();
        assert!(lines[1].is_blank());
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn inline_comment_only_lines() {
        let lines = logical_lines("$ just a note", 1).unwrap();
        assert_eq!(lines[0].to_string(), "c just a note");
    }
}
