//! Command line tool to validate input decks
//!
//! Reads one or more input decks and reports whether each is free of syntax
//! and range errors, along with a short summary of what each deck contains.
//!
//! # Usage
//!
//! ```text
//! Usage: inpcheck <decks>... [options]
//! ```
//!
//! Help is printed with the `-h` flag, and `--help` will show examples, default
//! values, examples, and any important behaviour.
//!
//! ## Options
//!
//! By default a plain text summary is printed for every deck, and the exit
//! code is non-zero if any deck failed.
//!
//! ### > How to get machine readable output
//!
//! Use the `--json` flag to print the summaries as a JSON array instead.
//!
//! ```bash
//! # Check every deck in a directory and keep the report
//! inpcheck runs/*.inp --json > report.json
//! ```
//!
//! ### > How to check a single geometry formula
//!
//! The `--geometry` option validates a cell geometry on its own and prints the
//! postfix form, with `&` standing for intersection.
//!
//! ```bash
//! # Prints "1 2 & 3 :"
//! inpcheck --geometry "1 2 : 3"
//! ```
//!

// standard libraries
use std::collections::BTreeMap;

// crate modules
use inpdeck::geometry::CellGeometry;
use inpdeck::utils::f;
use inpdeck::{read_deck, Deck, InpError};

// external crates
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use itertools::Itertools;
use kdam::{Bar, BarBuilder, BarExt};
use log::*;
use serde::Serialize;

#[doc(hidden)]
fn main() -> Result<()> {
    // set up the command line interface and match arguments
    let cli: Cli = Cli::parse();

    // set up logging (+2 to make 'Info' the default)
    let verbosity = cli.verbose as usize + 2;
    logging_init(verbosity, cli.quiet)?;

    if let Some(formula) = &cli.geometry {
        return check_geometry(formula);
    }

    if cli.decks.is_empty() {
        return Err(anyhow!("no decks given, see --help"));
    }

    let reports = check_decks(&cli)?;

    if cli.json {
        let text = serde_json::to_string_pretty(&reports).context("could not write report")?;
        println!("{text}");
    } else {
        for report in &reports {
            println!("{report}");
        }
    }

    let failed = reports.iter().filter(|r| !r.valid).count();
    match failed {
        0 => {
            info!("All {} decks are valid", reports.len());
            Ok(())
        }
        n => Err(anyhow!("{n} of {} decks failed", reports.len())),
    }
}

/// Validate input decks
///
/// Every deck is read in full and every card checked for the right number of
/// fields and for values within their allowed ranges. Reading stops at the
/// first error in a deck, which is reported with its line number.
///
/// A summary of each deck is printed, either as plain text or as JSON with
/// --json. The exit code is non-zero if any deck failed.
///
/// Alternatively, --geometry checks a single cell geometry formula and prints
/// its postfix form.
///
/// Examples
/// --------
///
///  Typical use
///     $ inpcheck problem.inp
///
///  Check many decks at once, as JSON
///     $ inpcheck runs/*.inp --json
///
///  Check a geometry formula on its own
///     $ inpcheck --geometry "-1 2 (#3 : 4)"
///
#[doc(hidden)]
#[derive(Parser)]
#[command(
    verbatim_doc_comment,
    arg_required_else_help(true),
    before_help(banner()),
    after_help("Typical use: inpcheck problem.inp\n\nNOTE: --help shows more detail and examples"),
    term_width(70),
    hide_possible_values(true),
    override_usage("inpcheck <decks>... [options]")
)]
struct Cli {
    // * Positional
    /// Paths to input decks
    #[arg(name = "decks")]
    #[arg(num_args = 0..)]
    decks: Vec<String>,

    /// Print the summaries as JSON
    ///
    /// The output is an array with one object per deck, in the order given.
    /// The progress bar is hidden so that stdout is clean.
    #[arg(help_heading("Report options"))]
    #[arg(short, long)]
    json: bool,

    /// Check a single geometry formula
    ///
    /// The formula is validated on its own and the postfix form printed, with
    /// '&' for intersection. Any decks given are ignored.
    #[arg(help_heading("Report options"))]
    #[arg(short, long)]
    #[arg(value_name = "formula")]
    #[arg(allow_hyphen_values = true)]
    geometry: Option<String>,

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

/// Outcome of checking one deck
#[doc(hidden)]
#[derive(Debug, Serialize)]
struct Report {
    path: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    cells: usize,
    surfaces: usize,
    data: usize,
    /// Number of data cards of each kind
    kinds: BTreeMap<&'static str, usize>,
}

impl Report {
    fn from_deck(path: &str, deck: &Deck) -> Self {
        let mut kinds = BTreeMap::new();
        for card in &deck.data {
            *kinds.entry(card.variant.kind()).or_insert(0) += 1;
        }

        Self {
            path: path.to_string(),
            valid: true,
            error: None,
            line: None,
            title: Some(deck.title.clone()),
            cells: deck.cells.len(),
            surfaces: deck.surfaces.len(),
            data: deck.data.len(),
            kinds,
        }
    }

    fn from_error(path: &str, error: &anyhow::Error) -> Self {
        // the deck error sits under the file context added by the reader
        let line = error.downcast_ref::<InpError>().and_then(|e| e.line);
        let message = error.chain().map(|e| e.to_string()).join(": ");

        Self {
            path: path.to_string(),
            valid: false,
            error: Some(message),
            line,
            title: None,
            cells: 0,
            surfaces: 0,
            data: 0,
            kinds: BTreeMap::new(),
        }
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if let Some(error) = &self.error {
            return write!(f, "FAIL  {}\n      {error}", self.path);
        }

        writeln!(f, "OK    {}", self.path)?;
        writeln!(f, "      title    {}", self.title.as_deref().unwrap_or(""))?;
        write!(
            f,
            "      cards    {} cells, {} surfaces, {} data",
            self.cells, self.surfaces, self.data
        )?;
        if !self.kinds.is_empty() {
            let kinds = self.kinds.iter().map(|(k, n)| f!("{k} x{n}")).join(", ");
            write!(f, "\n      kinds    {kinds}")?;
        }
        Ok(())
    }
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
    s += &f!("{:^70}\n", "Inpdeck :: InpCheck");
    s += &f!("{:-<1$}", "", 70);
    s
}

#[doc(hidden)]
/// Initialise the progress bar, if wanted
fn init_progress_bar(cli: &Cli) -> Result<Bar> {
    BarBuilder::default()
        .total(cli.decks.len())
        .delay(0.0)
        .unit(" decks")
        .disable(hide_progress(cli))
        .build()
        .map_err(|e| anyhow!(e))
}

#[doc(hidden)]
/// No bar for single decks, or when stdout has to stay clean
fn hide_progress(cli: &Cli) -> bool {
    cli.json || cli.quiet || cli.decks.len() < 2
}

#[doc(hidden)]
/// Read every deck in turn, keeping going past failures
fn check_decks(cli: &Cli) -> Result<Vec<Report>> {
    let mut progress_bar = init_progress_bar(cli)?;
    let mut reports = Vec::with_capacity(cli.decks.len());

    for path in &cli.decks {
        let report = match read_deck(path) {
            Ok(deck) => Report::from_deck(path, &deck),
            Err(e) => {
                debug!("{path} failed: {e:#}");
                Report::from_error(path, &e)
            }
        };
        reports.push(report);
        progress_bar.update(1)?;
    }

    // need an extra line for clean spacing if the progress bar is printed
    if !hide_progress(cli) {
        eprintln!();
    }

    Ok(reports)
}

#[doc(hidden)]
/// Validate a lone formula and print its postfix form
fn check_geometry(formula: &str) -> Result<()> {
    let geometry = CellGeometry::parse(&formula.to_lowercase())
        .with_context(|| f!("invalid geometry \"{formula}\""))?;

    debug!("Surfaces referenced: {:?}", geometry.surfaces());
    println!("{}", geometry.postfix().iter().join(" "));
    Ok(())
}
