//! Card variants and the machinery shared between them
//!
//! Every line of a card region is turned into one of three closed sum types:
//!
//! | Region   | Variant              | Identifier                      |
//! | -------- | -------------------- | ------------------------------- |
//! | cells    | [Cell]               | cell number                     |
//! | surfaces | [Surface]            | surface number                  |
//! | data     | [Datum]              | mnemonic, suffix, designator    |
//!
//! All three implement [Variant], which is what a
//! [Block](crate::block::Block) needs to read, key, and write them. The
//! variant is wrapped in a [Card] to carry the source line and any inline
//! comments along with it.

// internal modules
use crate::error::{InpError, Result};
use crate::parsers;
use crate::particle::Designator;
use crate::preprocess::LogicalLine;
use crate::utils::{f, wrap, CONTINUATION_INDENT, MAX_COLUMNS};

// standard library
use std::fmt;
use std::hash::Hash;
use std::ops::RangeInclusive;

// files under the cards module
pub mod cell;
pub mod data;
pub mod fields;
pub mod options;
pub mod surface;
pub mod transform;

// inline the variants for a nice API
#[doc(inline)]
pub use crate::cards::cell::Cell;

#[doc(inline)]
pub use crate::cards::data::Datum;

#[doc(inline)]
pub use crate::cards::surface::Surface;

/// Behaviour every card payload provides
pub trait Variant: Sized {
    /// Key used to address the card within its block
    type Id: Clone + Eq + Hash + fmt::Debug + fmt::Display;

    /// Build and validate from the code of a single logical line
    fn parse(code: &str) -> Result<Self>;

    /// Identifier, which always exists once constructed
    fn id(&self) -> Self::Id;

    /// Canonical single line text, before any wrapping
    fn to_text(&self) -> String;
}

/// A card payload with its source line and comments
///
/// ```rust
/// # use inpdeck::cards::{Card, Cell};
/// let card = Card::<Cell>::parse("1 0 -1 imp:n=1").unwrap();
/// assert_eq!(card.id(), 1);
/// assert_eq!(card.to_text(), "1 0 -1 imp:n=1");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Card<V> {
    pub variant: V,
    /// Physical line of the deck the card started on
    pub line: Option<usize>,
    /// Inline comments, in order of appearance
    pub comments: Vec<String>,
}

impl<V: Variant> Card<V> {
    pub fn new(variant: V) -> Self {
        Self {
            variant,
            line: None,
            comments: Vec::new(),
        }
    }

    /// Parse card text without any line information
    pub fn parse(code: &str) -> Result<Self> {
        V::parse(code).map(Self::new)
    }

    /// Build from a preprocessed line, tagging any error with its line number
    pub fn from_line(line: &LogicalLine) -> Result<Self> {
        let variant = V::parse(&line.code).map_err(|e| e.at_line(line.number))?;
        Ok(Self {
            variant,
            line: Some(line.number),
            comments: line.comments.clone(),
        })
    }

    pub fn id(&self) -> V::Id {
        self.variant.id()
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comments.push(comment.into());
        self
    }

    /// Card text wrapped to the column limit
    ///
    /// Only the code is wrapped. Comments follow on the last line when they
    /// fit, otherwise each goes on its own indented continuation line. No
    /// continuation marker is ever written after a comment.
    pub fn to_text(&self) -> String {
        let mut text = wrap(&self.variant.to_text());
        if self.comments.is_empty() {
            return text;
        }

        let inline = self.comments.iter().map(|c| f!(" $ {c}")).collect::<String>();
        let last = text.lines().last().map_or(0, str::len);
        if last + inline.len() <= MAX_COLUMNS {
            text += &inline;
        } else {
            let indent = " ".repeat(CONTINUATION_INDENT);
            for comment in &self.comments {
                text += &f!("\n{indent}$ {comment}");
            }
        }
        text
    }
}

impl<V: Variant> fmt::Display for Card<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

/// Leading token of a data card or cell option, split into its parts
///
/// ```rust
/// # use inpdeck::cards::Mnemonic;
/// # use inpdeck::particle::Particle;
/// let m = Mnemonic::parse("wwn3:p").unwrap();
/// assert_eq!(m.name, "wwn");
/// assert_eq!(m.suffix, Some(3));
/// assert!(m.designator.unwrap().contains(Particle::Photon));
///
/// let m = Mnemonic::parse("*tr2").unwrap();
/// assert_eq!(m.key(), "tr2");
/// assert_eq!(m.to_string(), "*tr2");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Mnemonic {
    /// `*` or `+` modifier
    pub prefix: Option<char>,
    pub name: String,
    pub suffix: Option<u32>,
    pub designator: Option<Designator>,
}

impl Mnemonic {
    pub fn new(name: &str) -> Self {
        Self {
            prefix: None,
            name: name.to_string(),
            suffix: None,
            designator: None,
        }
    }

    pub fn parse(token: &str) -> Result<Self> {
        let raw = parsers::parse_mnemonic(token)
            .ok_or_else(|| InpError::unrecognised("mnemonic", token))?;

        let suffix = match raw.suffix {
            Some(s) => Some(
                s.parse::<u32>()
                    .map_err(|_| InpError::semantic(f!("suffix \"{s}\" is out of range")))?,
            ),
            None => None,
        };

        let designator = match raw.designator {
            Some(d) => Some(Designator::parse(d)?),
            None => None,
        };

        Ok(Self {
            prefix: raw.prefix,
            name: raw.name.to_string(),
            suffix,
            designator,
        })
    }

    pub fn with_prefix(mut self, prefix: Option<char>) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn with_suffix(mut self, suffix: Option<u32>) -> Self {
        self.suffix = suffix;
        self
    }

    pub fn with_designator(mut self, designator: Option<Designator>) -> Self {
        self.designator = designator;
        self
    }

    /// Block key: name, suffix, and designator with no prefix
    pub fn key(&self) -> String {
        let mut key = self.name.clone();
        if let Some(s) = self.suffix {
            key += &s.to_string();
        }
        if let Some(d) = &self.designator {
            key += &f!(":{d}");
        }
        key
    }

    pub fn is_starred(&self) -> bool {
        self.prefix == Some('*')
    }

    /// Fail unless the prefix is absent or one of `allowed`
    pub fn check_prefix(&self, allowed: &[char]) -> Result<()> {
        match self.prefix {
            Some(p) if !allowed.contains(&p) => Err(InpError::semantic(f!(
                "\"{p}\" prefix not allowed on {}",
                self.name
            ))),
            _ => Ok(()),
        }
    }

    pub fn no_suffix(&self) -> Result<()> {
        match self.suffix {
            Some(s) => Err(InpError::semantic(f!(
                "{} does not take a numeric suffix, found {s}",
                self.name
            ))),
            None => Ok(()),
        }
    }

    /// Suffix that must be present and inside `range`
    pub fn required_suffix(&self, range: RangeInclusive<u32>) -> Result<u32> {
        let suffix = self
            .suffix
            .ok_or_else(|| InpError::semantic(f!("{} requires a numeric suffix", self.name)))?;
        self.suffix_in(suffix, range)
    }

    /// Suffix that may be absent, but otherwise must be inside `range`
    pub fn optional_suffix(&self, range: RangeInclusive<u32>) -> Result<Option<u32>> {
        match self.suffix {
            Some(s) => self.suffix_in(s, range).map(Some),
            None => Ok(None),
        }
    }

    fn suffix_in(&self, suffix: u32, range: RangeInclusive<u32>) -> Result<u32> {
        if range.contains(&suffix) {
            Ok(suffix)
        } else {
            Err(InpError::semantic(f!(
                "{} suffix {suffix} not in {}..={}",
                self.name,
                range.start(),
                range.end()
            )))
        }
    }

    pub fn no_designator(&self) -> Result<()> {
        match &self.designator {
            Some(d) => Err(InpError::semantic(f!(
                "{} does not take a particle designator, found \":{d}\"",
                self.name
            ))),
            None => Ok(()),
        }
    }

    pub fn required_designator(&self) -> Result<Designator> {
        self.designator
            .clone()
            .ok_or_else(|| InpError::semantic(f!("{} requires a particle designator", self.name)))
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(p) = self.prefix {
            write!(f, "{p}")?;
        }
        write!(f, "{}", self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Particle;
    use rstest::rstest;

    #[rstest]
    #[case("imp:n", "imp", None, vec![Particle::Neutron])]
    #[case("wwn3:p", "wwn", Some(3), vec![Particle::Photon])]
    #[case("f4:n,p", "f", Some(4), vec![Particle::Neutron, Particle::Photon])]
    fn suffix_and_designator(
        #[case] token: &str,
        #[case] name: &str,
        #[case] suffix: Option<u32>,
        #[case] particles: Vec<Particle>,
    ) {
        let m = Mnemonic::parse(token).unwrap();
        assert_eq!(m.name, name);
        assert_eq!(m.suffix, suffix);
        assert_eq!(m.designator.unwrap().particles(), particles.as_slice());
    }

    #[test]
    fn checks() {
        let m = Mnemonic::parse("tr1000").unwrap();
        assert!(m.required_suffix(1..=999).unwrap_err().is_semantic());
        assert!(m.no_designator().is_ok());
        assert!(m.required_designator().unwrap_err().is_semantic());
        assert!(m.check_prefix(&['*']).is_ok());

        let m = Mnemonic::parse("+nps").unwrap();
        assert!(m.check_prefix(&['*']).is_err());
        assert!(m.optional_suffix(1..=9).unwrap().is_none());
    }

    #[test]
    fn not_a_mnemonic() {
        assert!(Mnemonic::parse("12").unwrap_err().is_syntax());
        assert!(Mnemonic::parse("imp:j").is_err());
    }

    #[test]
    fn comments_follow_wrapped_code() {
        let card = Card::<Cell>::parse("1 0 -1").unwrap().with_comment("sphere");
        assert_eq!(card.to_text(), "1 0 -1 $ sphere");
    }

    #[test]
    fn long_comments_move_to_their_own_lines() {
        let code = (2..=21).map(|s| f!("-{s}")).fold("1 0 -1".to_string(), |c, s| c + " " + &s);
        let card = Card::<Cell>::parse(&code)
            .unwrap()
            .with_comment("inner sphere of the reference problem")
            .with_comment("vacuum outside");

        let text = card.to_text();
        assert!(text.lines().all(|line| line.len() <= MAX_COLUMNS), "{text}");
        assert_eq!(text.lines().next(), Some(code.as_str()));
        assert_eq!(
            text.lines().skip(1).collect::<Vec<_>>(),
            vec!["     $ inner sphere of the reference problem", "     $ vacuum outside"]
        );

        // the indented comment lines read back as part of the same card
        let lines = crate::preprocess::logical_lines(&text, 1).unwrap();
        let cards = lines.iter().filter(|l| !l.code.is_empty()).collect::<Vec<_>>();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].code, code);
        assert_eq!(cards[0].comments.len(), 2);
    }
}
