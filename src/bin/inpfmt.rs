//! Command line tool to rewrite a deck in canonical form
//!
//! Reads an input deck, validates every card, and writes the deck back out
//! with all shorthand expanded, vertical tables transposed, and long cards
//! wrapped onto continuation lines.
//!
//! # Usage
//!
//! ```text
//! Usage: inpfmt <deck> [options]
//! ```
//!
//! Help is printed with the `-h` flag, and `--help` will show examples, default
//! values, examples, and any important behaviour.
//!
//! ## Options
//!
//! By default the canonical deck is printed to stdout.
//!
//! ### > How to write to a file
//!
//! Use the `--output` option to write the canonical deck to a file instead.
//! Any existing file is overwritten.
//!
//! ```bash
//! # Write the canonical form of problem.inp to clean.inp
//! inpfmt /path/to/problem.inp --output clean.inp
//! ```
//!
//! ### > How to check a deck is already canonical
//!
//! The `--check` flag writes nothing, and fails if formatting would change the
//! deck in any way.
//!
//! ```bash
//! # Fail if problem.inp is not already in canonical form
//! inpfmt /path/to/problem.inp --check
//! ```
//!

// standard libraries
use std::fs;
use std::io::{self, Write};

// crate modules
use inpdeck::utils::f;
use inpdeck::{read_deck, write_deck};

// external crates
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::*;

#[doc(hidden)]
fn main() -> Result<()> {
    // set up the command line interface and match arguments
    let cli: Cli = Cli::parse();

    // set up logging (+2 to make 'Info' the default)
    let verbosity = cli.verbose as usize + 2;
    logging_init(verbosity, cli.quiet)?;

    info!("Formatting \"{}\"", cli.deck);
    let deck = read_deck(&cli.deck)?;

    if cli.check {
        return check_canonical(&cli.deck, &deck.to_text());
    }

    match &cli.output {
        Some(path) => {
            debug!("Writing canonical deck to {path}");
            write_deck(&deck, path)
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(deck.to_text().as_bytes())
                .context("could not write to stdout")
        }
    }
}

/// Rewrite an input deck in canonical form
///
/// Every card is validated on the way in, so a deck that formats cleanly is
/// also a deck free of syntax and range errors.
///
/// The canonical form is lower case, with shorthand (3j, 2r, 4i, 0.5m)
/// expanded, vertical tables transposed, one card per line, and long cards
/// wrapped at 80 columns with '&' continuations. The message block, title,
/// and any text after the data cards are kept exactly as written.
///
/// Examples
/// --------
///
///  Typical use, printing to the terminal
///     $ inpfmt problem.inp
///
///  Write the result to a new file
///     $ inpfmt problem.inp --output clean.inp
///
///  Only check the deck is already canonical
///     $ inpfmt problem.inp --check
///
#[doc(hidden)]
#[derive(Parser)]
#[command(
    verbatim_doc_comment,
    arg_required_else_help(true),
    before_help(banner()),
    after_help("Typical use: inpfmt problem.inp -o clean.inp\n\nNOTE: --help shows more detail and examples"),
    term_width(70),
    hide_possible_values(true),
    override_usage("inpfmt <deck> [options]")
)]
struct Cli {
    // * Positional
    /// Path to input deck
    #[arg(name = "deck")]
    deck: String,

    /// Write the canonical deck to a file
    ///
    /// By default the deck is printed to stdout. Any existing file at the
    /// given path is overwritten.
    #[arg(help_heading("Format options"))]
    #[arg(short, long)]
    #[arg(value_name = "path")]
    output: Option<String>,

    /// Fail if the deck is not already canonical
    ///
    /// Nothing is written. The exit code is non-zero when formatting would
    /// change the file.
    #[arg(help_heading("Format options"))]
    #[arg(short, long)]
    #[arg(conflicts_with = "output")]
    check: bool,

    // * Flags
    /// Verbose logging (-v, -vv)
    ///
    /// If specified, the default log level of INFO is increased to DEBUG (-v)
    /// or TRACE (-vv). Errors and Warnings are always logged unless in quiet
    /// (-q) mode.
    #[arg(short, long)]
    #[arg(action = clap::ArgAction::Count)]
    verbose: u8,

    /// Supress all log output (overrules --verbose)
    #[arg(short, long)]
    quiet: bool,
}

/// Sets up logging at runtime to allow for multiple verbosity levels
#[doc(hidden)]
fn logging_init(verbosity: usize, quiet: bool) -> Result<()> {
    stderrlog::new()
        .modules(vec![module_path!(), "inpdeck"])
        .quiet(quiet)
        .verbosity(verbosity)
        .show_level(false)
        .color(stderrlog::ColorChoice::Never)
        .timestamp(stderrlog::Timestamp::Off)
        .init()
        .context("could not initialise logging")
}

/// Creates a banner for the command line
#[doc(hidden)]
fn banner() -> String {
    let mut s = f!("{:-<1$}\n", "", 70);
    s += &f!("{:^70}\n", "Inpdeck :: InpFmt");
    s += &f!("{:-<1$}", "", 70);
    s
}

#[doc(hidden)]
/// Compare the file on disk against its canonical text
fn check_canonical(path: &str, canonical: &str) -> Result<()> {
    let original = fs::read_to_string(path).with_context(|| f!("could not read {path}"))?;

    // line endings and trailing blanks are not worth failing over
    let normalise = |text: &str| {
        text.lines()
            .map(str::trim_end)
            .collect::<Vec<&str>>()
            .join("\n")
            .trim_end()
            .to_string()
    };

    if normalise(&original) == normalise(canonical) {
        info!("{path} is already canonical");
        Ok(())
    } else {
        Err(anyhow!("{path} is not in canonical form"))
    }
}
