//! File input and output for whole decks
//!
//! These are the only functions in the crate that touch the file system.
//! Everything else works on text, so decks held in memory can go straight to
//! [Deck::parse](crate::Deck::parse).

// internal modules
use crate::deck::Deck;
use crate::utils::f;

// standard library
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

// external crates
use anyhow::{Context, Result};
use log::{debug, info};

/// Read and validate the deck at `path`
///
/// Returns the parsed [Deck], or the first syntax or semantic error found
/// with the file name and line attached.
///
/// - `path` - Path to the input deck, can be [&str], [String], [Path], etc...
///
/// Example
/// ```ignore
/// let deck = inpdeck::read_deck("path/to/problem.inp")?;
/// println!("{} cells", deck.cells.len());
/// ```
pub fn read_deck<P: AsRef<Path>>(path: P) -> Result<Deck> {
    let path: &Path = path.as_ref();
    debug!("Reading {}", path.display());

    let file = File::open(path).with_context(|| f!("could not open {}", path.display()))?;
    let mut text = String::new();
    BufReader::new(file)
        .read_to_string(&mut text)
        .with_context(|| f!("could not read {}", path.display()))?;

    let deck = Deck::parse(&text).with_context(|| f!("invalid deck {}", path.display()))?;
    info!("Read {} cards from {}", deck.card_count(), path.display());
    Ok(deck)
}

/// Write the canonical text of a deck to `path`
///
/// Any existing file is overwritten.
pub fn write_deck<P: AsRef<Path>>(deck: &Deck, path: P) -> Result<()> {
    let path: &Path = path.as_ref();
    let file = File::create(path).with_context(|| f!("could not create {}", path.display()))?;

    let mut writer = BufWriter::new(file);
    writer
        .write_all(deck.to_text().as_bytes())
        .and_then(|_| writer.flush())
        .with_context(|| f!("could not write {}", path.display()))?;

    info!("Written {} cards to {}", deck.card_count(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file() {
        let error = read_deck("data/decks/does_not_exist.inp").unwrap_err();
        assert!(error.to_string().contains("could not open"));
    }

    #[test]
    fn write_then_read() {
        let path = std::env::temp_dir().join("inpdeck_readers_test.inp");
        let deck = Deck::parse("title\n1 0 -1\n\n1 so 1\n\nnps 10\n").unwrap();

        write_deck(&deck, &path).unwrap();
        let read = read_deck(&path).unwrap();
        assert_eq!(read, deck);

        std::fs::remove_file(&path).unwrap();
    }
}
