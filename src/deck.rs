//! A complete input deck
//!
//! The layout of a deck is fixed, with blank lines separating the regions:
//!
//! ```text
//! [message block]
//!
//! title
//! cell cards
//!
//! surface cards
//!
//! data cards
//!
//! [anything else]
//! ```
//!
//! The message block, title, and trailing text are kept exactly as written.
//! Only the three card regions go through preprocessing and validation.

// internal modules
use crate::block::Block;
use crate::cards::{Card, Cell, Datum, Surface, Variant};
use crate::error::{InpError, Result};
use crate::utils::{f, MAX_COLUMNS};

// standard library
use std::fmt;

// external crates
use log::debug;

/// An MCNP input deck split into its regions
///
/// ```rust
/// # use inpdeck::Deck;
/// let text = "Test Problem\n1 0 -1 imp:n=1\n2 0 1 imp:n=0\n\n1 so 5\n\nnps 1e6\n";
/// let deck = Deck::parse(text).unwrap();
///
/// assert_eq!(deck.title, "Test Problem");
/// assert_eq!(deck.cells.len(), 2);
/// assert_eq!(deck.surfaces.len(), 1);
/// assert_eq!(deck.data.len(), 1);
/// assert!(deck.datum("nps").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Deck {
    /// Message block, including the leading `message:`
    pub message: Option<String>,
    pub title: String,
    pub cells: Block<Cell>,
    pub surfaces: Block<Surface>,
    pub data: Block<Datum>,
    /// Text after the blank line closing the data cards
    pub trailer: Option<String>,
}

impl Deck {
    /// An empty deck with nothing but a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Read a whole deck from text, failing on the first bad card
    pub fn parse(text: &str) -> Result<Self> {
        let lines: Vec<&str> = text.lines().collect();
        let mut cursor = 0;

        let message = match lines.first() {
            Some(first) if is_message(first) => {
                let end = next_blank(&lines, 0);
                cursor = (end + 1).min(lines.len());
                debug!("Message block of {end} lines");
                Some(lines[..end].join("\n"))
            }
            _ => None,
        };

        let title = lines
            .get(cursor)
            .ok_or_else(|| InpError::syntax("deck has no title line"))?
            .to_string();
        if title.chars().count() > MAX_COLUMNS {
            return Err(InpError::semantic(f!(
                "title is longer than {MAX_COLUMNS} columns"
            ))
            .at_line(cursor + 1));
        }
        cursor += 1;

        let (cells, next) = region::<Cell>(&lines, cursor)?;
        let (surfaces, next) = region::<Surface>(&lines, next)?;
        let (data, next) = region::<Datum>(&lines, next)?;

        let trailer = match lines.get(next..) {
            Some(rest) if rest.iter().any(|l| !l.trim().is_empty()) => Some(rest.join("\n")),
            _ => None,
        };

        debug!(
            "Read deck with {} cells, {} surfaces, {} data cards",
            cells.len(),
            surfaces.len(),
            data.len()
        );

        Ok(Self {
            message,
            title,
            cells,
            surfaces,
            data,
            trailer,
        })
    }

    pub fn cell(&self, number: u32) -> Option<&Card<Cell>> {
        self.cells.get(&number)
    }

    pub fn surface(&self, number: u32) -> Option<&Card<Surface>> {
        self.surfaces.get(&number)
    }

    /// Data card by identifier, e.g. `"imp:n"` or `"f4"`
    pub fn datum(&self, id: &str) -> Option<&Card<Datum>> {
        self.data.get(&id.to_string())
    }

    /// Total number of cards over every region
    pub fn card_count(&self) -> usize {
        self.cells.len() + self.surfaces.len() + self.data.len()
    }

    /// Canonical text of the whole deck
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Deck {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(message) = &self.message {
            writeln!(f, "{message}")?;
            writeln!(f)?;
        }
        writeln!(f, "{}", self.title)?;
        write!(f, "{}", self.cells)?;
        write!(f, "{}", self.surfaces)?;
        write!(f, "{}", self.data)?;
        if let Some(trailer) = &self.trailer {
            writeln!(f, "{trailer}")?;
        }
        Ok(())
    }
}

fn is_message(line: &str) -> bool {
    line.trim_start().to_lowercase().starts_with("message:")
}

/// Index of the first blank line at or after `from`, or the end
fn next_blank(lines: &[&str], from: usize) -> usize {
    lines
        .iter()
        .skip(from)
        .position(|l| l.trim().is_empty())
        .map_or(lines.len(), |p| from + p)
}

/// Read one card region, returning it with the index just past its blank line
fn region<V: Variant>(lines: &[&str], start: usize) -> Result<(Block<V>, usize)> {
    let start = start.min(lines.len());
    let end = next_blank(lines, start);
    let block = Block::from_text(&lines[start..end].join("\n"), start + 1)?;
    Ok((block, (end + 1).min(lines.len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECK: &str = "\
MESSAGE: datapath=/opt/xs

Sphere In A Box
1 1 -7.8 -1 imp:n=1 $ iron
2 0 1 -2
     imp:n=1
3 0 2 imp:n=0

1 so 5
2 rpp -10 10 -10 10 -10 10

M1 26056 1
sdef pos=0 0 0 erg=14.1
f4:n 1
nps 1e5

Notes kept as written
";

    #[test]
    fn regions() {
        let deck = Deck::parse(DECK).unwrap();
        assert_eq!(deck.message.as_deref(), Some("MESSAGE: datapath=/opt/xs"));
        assert_eq!(deck.title, "Sphere In A Box");
        assert_eq!(deck.cells.len(), 3);
        assert_eq!(deck.surfaces.len(), 2);
        assert_eq!(deck.data.len(), 4);
        assert_eq!(deck.card_count(), 9);
        assert_eq!(deck.trailer.as_deref(), Some("Notes kept as written"));

        assert_eq!(deck.cell(2).unwrap().to_text(), "2 0 1 -2 imp:n=1");
        assert_eq!(deck.cell(1).unwrap().comments, vec!["iron"]);
        assert!(deck.datum("m1").is_some());
        assert!(deck.surface(3).is_none());
    }

    #[test]
    fn canonical_text_is_stable() {
        let once = Deck::parse(DECK).unwrap().to_text();
        let twice = Deck::parse(&once).unwrap().to_text();
        assert_eq!(once, twice);
        assert!(once.starts_with("MESSAGE: datapath=/opt/xs\n\nSphere In A Box\n"));
        assert!(once.contains("\nnps 100000\n\nNotes kept as written\n"));
    }

    #[test]
    fn title_limit() {
        let text = f!("{}\n1 0 -1\n\n1 so 1\n\nnps 1\n", "x".repeat(81));
        let error = Deck::parse(&text).unwrap_err();
        assert!(error.is_semantic());
        assert_eq!(error.line, Some(1));
    }

    #[test]
    fn errors_point_at_the_deck_line() {
        let text = "title\n1 0 -1\n\n1 so 1\n\nnps 1\nimp:n 1\nfoo 2\n";
        let error = Deck::parse(text).unwrap_err();
        assert!(error.is_syntax());
        assert_eq!(error.line, Some(8));
    }

    #[test]
    fn short_decks() {
        assert!(Deck::parse("").unwrap_err().is_syntax());

        let deck = Deck::parse("only a title").unwrap();
        assert!(deck.cells.is_empty());
        assert!(deck.data.is_empty());
        assert_eq!(deck.to_text(), "only a title\n\n\n\n");
        assert_eq!(Deck::new("only a title"), deck);
    }
}
