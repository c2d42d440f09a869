//! Ordered, keyed collection of cards from one deck region
//!
//! A [Block] keeps cards in insertion order while also allowing lookup by the
//! card identifier. Adding a card whose identifier already exists replaces the
//! old card in place, so the order of a deck is stable under edits.

// internal modules
use crate::cards::{Card, Variant};
use crate::error::Result;
use crate::preprocess::{self, LogicalLine};

// standard library
use std::collections::HashMap;
use std::fmt;

// external crates
use log::{debug, trace, warn};

/// Cards of a single region in insertion order, indexed by identifier
///
/// ```rust
/// # use inpdeck::block::Block;
/// # use inpdeck::cards::{Card, Cell};
/// let mut block = Block::<Cell>::new();
/// block.append(Card::<Cell>::parse("1 0 -1").unwrap());
/// block.append(Card::<Cell>::parse("2 0 1").unwrap());
///
/// // same number, so the first card is replaced where it stands
/// block.append(Card::<Cell>::parse("1 0 -2").unwrap());
///
/// assert_eq!(block.len(), 2);
/// assert_eq!(block.to_text(), "1 0 -2\n2 0 1\n\n");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Block<V: Variant> {
    cards: Vec<Card<V>>,
    index: HashMap<V::Id, usize>,
}

impl<V: Variant> Default for Block<V> {
    fn default() -> Self {
        Self {
            cards: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V: Variant> Block<V> {
    pub fn new() -> Self {
        Default::default()
    }

    /// Read every card of a region from its raw text
    ///
    /// `first_line` is the line number of the region within the whole deck,
    /// used for error messages.
    pub fn from_text(raw: &str, first_line: usize) -> Result<Self> {
        let lines = preprocess::logical_lines(raw, first_line)?;
        Self::parse(&lines)
    }

    /// Build from preprocessed lines, stopping at the first blank line
    ///
    /// Comment lines are skipped, and the first card that fails to parse is
    /// returned as the error with its line number attached.
    pub fn parse(lines: &[LogicalLine]) -> Result<Self> {
        let mut block = Self::new();

        for line in lines {
            if line.is_blank() {
                trace!("Blank line {}, end of block", line.number);
                break;
            }
            if line.is_comment() {
                continue;
            }
            block.append(Card::<V>::from_line(line)?);
        }

        debug!("Read block of {} cards", block.len());
        Ok(block)
    }

    /// Add a card, replacing any existing card with the same identifier
    ///
    /// Returns the identifier of the card, or `None` if there was no card.
    pub fn append(&mut self, card: impl Into<Option<Card<V>>>) -> Option<V::Id> {
        let card = card.into()?;
        let id = card.id();

        match self.index.get(&id) {
            Some(&position) => {
                warn!("Replacing existing card {id}");
                self.cards[position] = card;
            }
            None => {
                self.index.insert(id.clone(), self.cards.len());
                self.cards.push(card);
            }
        }

        Some(id)
    }

    /// Remove and return the card with identifier `id`
    pub fn remove(&mut self, id: &V::Id) -> Option<Card<V>> {
        let position = self.index.remove(id)?;
        let card = self.cards.remove(position);

        // everything after the removed card moves up one place
        for p in self.index.values_mut() {
            if *p > position {
                *p -= 1;
            }
        }
        Some(card)
    }

    pub fn get(&self, id: &V::Id) -> Option<&Card<V>> {
        self.index.get(id).map(|&p| &self.cards[p])
    }

    /// Mutable access to a card, which must keep the same identifier
    pub fn get_mut(&mut self, id: &V::Id) -> Option<&mut Card<V>> {
        self.index.get(id).map(|&p| &mut self.cards[p])
    }

    pub fn contains(&self, id: &V::Id) -> bool {
        self.index.contains_key(id)
    }

    /// Cards in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Card<V>> {
        self.cards.iter()
    }

    /// Identifiers in insertion order
    pub fn ids(&self) -> impl Iterator<Item = V::Id> + '_ {
        self.cards.iter().map(Card::id)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Every card on its own wrapped line, then a blank separator line
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for card in &self.cards {
            text += &card.to_text();
            text.push('\n');
        }
        text.push('\n');
        text
    }
}

impl<'a, V: Variant> IntoIterator for &'a Block<V> {
    type Item = &'a Card<V>;
    type IntoIter = std::slice::Iter<'a, Card<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.cards.iter()
    }
}

impl<V: Variant> fmt::Display for Block<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Cell, Datum, Surface};

    fn cell(text: &str) -> Card<Cell> {
        Card::parse(text).unwrap()
    }

    #[test]
    fn replace_keeps_position() {
        let mut block = Block::<Cell>::new();
        assert_eq!(block.append(cell("1 0 -1")), Some(1));
        assert_eq!(block.append(cell("2 0 1 -3")), Some(2));
        assert_eq!(block.append(cell("3 0 3")), Some(3));
        assert_eq!(block.append(cell("2 0 1 -4")), Some(2));

        assert_eq!(block.len(), 3);
        assert_eq!(block.ids().collect::<Vec<u32>>(), vec![1, 2, 3]);
        assert_eq!(block.get(&2).unwrap().to_text(), "2 0 1 -4");
    }

    #[test]
    fn absent_cards_are_ignored() {
        let mut block = Block::<Cell>::new();
        assert_eq!(block.append(None::<Card<Cell>>), None);
        assert!(block.is_empty());
    }

    #[test]
    fn remove_shifts_the_index() {
        let mut block = Block::<Cell>::new();
        for text in ["1 0 -1", "2 0 1 -2", "3 0 2"] {
            block.append(cell(text));
        }

        let removed = block.remove(&1).unwrap();
        assert_eq!(removed.id(), 1);
        assert!(block.remove(&1).is_none());
        assert!(!block.contains(&1));
        assert_eq!(block.get(&3).unwrap().to_text(), "3 0 2");

        block.append(cell("4 0 -3"));
        assert_eq!(block.ids().collect::<Vec<u32>>(), vec![2, 3, 4]);
    }

    #[test]
    fn parse_skips_comments_and_stops_at_blank() {
        let raw = "c the sphere\n1 so 5 $ outer\n2 px 0\n\n3 py 0";
        let block = Block::<Surface>::from_text(raw, 10).unwrap();

        assert_eq!(block.len(), 2);
        let first = block.get(&1).unwrap();
        assert_eq!(first.line, Some(11));
        assert_eq!(first.comments, vec!["outer"]);
        assert_eq!(block.to_text(), "1 so 5 $ outer\n2 px 0\n\n");
    }

    #[test]
    fn errors_carry_the_line() {
        let raw = "nps 10\nimp:n 1\nbogus 3";
        let error = Block::<Datum>::from_text(raw, 20).unwrap_err();
        assert!(error.is_syntax());
        assert_eq!(error.line, Some(22));
    }

    #[test]
    fn data_keys_ignore_the_prefix() {
        let raw = "tr1 0 0 1\n*tr1 0 0 2";
        let block = Block::<Datum>::from_text(raw, 1).unwrap();
        assert_eq!(block.len(), 1);
        assert_eq!(block.get(&"tr1".to_string()).unwrap().to_text(), "*tr1 0 0 2");
    }
}
