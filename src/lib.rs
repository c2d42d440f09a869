//! # The Inpdeck crate
//!
//! Reader, validator, and writer for MCNP input decks
//!
//! ## Installation
//!
//! Direct install from github:
//!
//! ```shell
//! cargo install --git https://github.com/repositony/inpdeck.git
//! ```
//!
//! ## Overview
//!
//! Input decks are read into a typed model where every card has been checked
//! for the right number of fields and for values inside their allowed ranges.
//! The model can then be inspected, edited, and written back out in a single
//! canonical form.
//!
//! | Command line | Description                                               |
//! | ------------ | --------------------------------------------------------- |
//! | `inpfmt`     | Rewrite a deck in canonical form                          |
//! | `inpcheck`   | Validate decks and summarise their contents               |
//!
//! All tools are fully documented with detailed `--help` messages, including
//! examples for common use cases.
//!
//! ### Deck layout
//!
//! | Region         | Type                               | Card identifier         |
//! | -------------- | ---------------------------------- | ----------------------- |
//! | message block  | kept verbatim                      |                         |
//! | title          | kept verbatim                      |                         |
//! | cell cards     | [Block]<[Cell](crate::cards::Cell)>        | cell number     |
//! | surface cards  | [Block]<[Surface](crate::cards::Surface)>  | surface number  |
//! | data cards     | [Block]<[Datum](crate::cards::Datum)>      | mnemonic, e.g. `imp:n` |
//! | trailing text  | kept verbatim                      |                         |
//!
//! ### What canonical means
//!
//! - Lower case everywhere except the message, title, and trailing text
//! - Shorthand (`3j`, `2r`, `4i`, `2ilog`, `0.5m`) expanded in full
//! - Vertical tables (`#` cards) transposed into ordinary cards
//! - One card per line, wrapped with `&` continuations at 80 columns
//! - Inline comments moved to the end of their card
//! - Numbers in the shortest form that reads back as the same value
//!
//! ## Advanced use
//!
//! Read any deck into a [Deck] with a one-liner, then inspect or change it.
//!
//! ```rust
//! use inpdeck::cards::{Card, Datum};
//! use inpdeck::Deck;
//!
//! let text = "sphere\n1 0 -1 imp:n=1\n2 0 1 imp:n=0\n\n1 so 10\n\nsdef\nnps 1e4\n";
//! let mut deck = Deck::parse(text).unwrap();
//!
//! // replace the history count in place
//! deck.data.append(Card::<Datum>::parse("nps 1e6").unwrap());
//! assert_eq!(deck.datum("nps").unwrap().to_text(), "nps 1000000");
//!
//! // look at the geometry of a cell
//! let cell = &deck.cell(1).unwrap().variant;
//! assert_eq!(cell.geometry().unwrap().surfaces(), vec![-1]);
//! ```
//!
//! As an overview:
//! - The [preprocess] module turns raw card regions into one logical line per
//! card
//! - The [cards] module holds every card type and the keyword scanning shared
//! between them
//! - The [geometry] module parses cell geometry formulas
//! - The [block] and [deck] modules assemble cards into a whole deck
//!
//! In the background, the `nom` parser combinator library handles the token
//! level grammars, `textwrap` the continuation lines, and `clap` the command
//! line interface.

// Public facing modules
pub mod block;
pub mod cards;
pub mod deck;
pub mod error;
pub mod geometry;
pub mod parsers;
pub mod particle;
pub mod preprocess;
pub mod tokens;
pub mod utils;

// note that docs are hidden to keep the simple API front and centre
#[doc(hidden)]
pub mod readers;

// Re-exports of useful data structures
#[doc(inline)]
pub use crate::block::Block;

#[doc(inline)]
pub use crate::deck::Deck;

#[doc(inline)]
pub use crate::error::{ErrorKind, InpError};

#[doc(inline)]
pub use crate::readers::{read_deck, write_deck};
