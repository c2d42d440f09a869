use inpdeck::cards::{Card, Datum};
use inpdeck::utils::MAX_COLUMNS;
use inpdeck::{read_deck, write_deck, Deck};

use rstest::rstest;

const IRON_SHELL: &str = "data/decks/iron_shell.inp";
const BARE_SPHERE: &str = "data/decks/bare_sphere.inp";

#[rstest]
#[case(IRON_SHELL)]
#[case(BARE_SPHERE)]
fn canonical_text_is_a_fixed_point(#[case] path: &str) {
    let deck = read_deck(path).unwrap();
    let once = deck.to_text();

    let reparsed = Deck::parse(&once).unwrap();
    assert_eq!(reparsed.card_count(), deck.card_count());
    assert_eq!(reparsed.to_text(), once);
}

#[rstest]
#[case(IRON_SHELL)]
#[case(BARE_SPHERE)]
fn canonical_lines_fit(#[case] path: &str) {
    let deck = read_deck(path).unwrap();
    for line in deck.to_text().lines() {
        assert!(line.len() <= MAX_COLUMNS, "{line}");
    }
}

#[test]
fn iron_shell() {
    let deck = read_deck(IRON_SHELL).unwrap();
    assert_eq!(deck.message, None);
    assert_eq!(deck.title, "Iron shell around a 14 MeV point source");
    assert_eq!(deck.cells.len(), 4);
    assert_eq!(deck.surfaces.len(), 3);
    assert_eq!(deck.trailer, None);

    // continuation and inline comment
    let shell = deck.cell(2).unwrap();
    assert_eq!(shell.variant.density(), Some(-7.87));
    assert_eq!(shell.comments, vec!["iron shell"]);
    assert_eq!(shell.to_text(), "2 1 -7.87 1 -2 imp:n=1 imp:p=1 $ iron shell");

    // shorthand
    assert_eq!(
        deck.datum("e4").unwrap().to_text(),
        "e4 0.1 1.2 2.3 3.4 4.5 5.6 6.7 7.8 8.9 10"
    );
    assert_eq!(deck.datum("phys:n").unwrap().to_text(), "phys:n 20 0 0 j j j");
    assert_eq!(deck.datum("nps").unwrap().to_text(), "nps 1000000");
    assert_eq!(deck.datum("sp1").unwrap().variant.fields().len(), 41);

    // mnemonic case folded, options kept after the nuclides
    assert_eq!(
        deck.datum("m1").unwrap().to_text(),
        "m1 26056 -0.917 6000 -0.0008 24052 -0.0822 nlib=80c"
    );

    // long cards come back over continuation lines
    let source = deck.datum("si1").unwrap().to_text();
    assert!(source.lines().count() > 1);
    assert!(source.lines().next().unwrap().ends_with(" &"));
}

#[test]
fn bare_sphere() {
    let deck = read_deck(BARE_SPHERE).unwrap();
    assert_eq!(deck.message.as_deref(), Some("message: xsdir=/opt/xs/xsdir"));
    assert_eq!(deck.title, "Bare sphere criticality");
    assert_eq!(deck.trailer.as_deref(), Some("Trailing notes\nare kept verbatim."));

    // vertical table, the first column is the cell label
    assert_eq!(deck.datum("imp:n").unwrap().to_text(), "imp:n 1 0");
    assert_eq!(deck.datum("vol").unwrap().to_text(), "vol 2758.5 1");

    let kinds = deck.data.iter().map(|c| c.variant.kind()).collect::<Vec<_>>();
    assert!(kinds.contains(&"Criticality"));
    assert!(kinds.contains(&"TotalNu"));

    let text = deck.to_text();
    assert!(text.starts_with("message: xsdir=/opt/xs/xsdir\n\nBare sphere criticality\n"));
    assert!(text.ends_with("\n\nTrailing notes\nare kept verbatim.\n"));
}

#[test]
fn edits_survive_a_write() {
    let mut deck = read_deck(BARE_SPHERE).unwrap();
    deck.data.append(Card::<Datum>::parse("nps 5000").unwrap());
    let removed = deck.data.remove(&"totnu".to_string());
    assert!(removed.is_some());

    let path = std::env::temp_dir().join("inpdeck_edits_survive_a_write.inp");
    write_deck(&deck, &path).unwrap();
    let read = read_deck(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert!(read.datum("totnu").is_none());
    assert_eq!(read.datum("nps").unwrap().to_text(), "nps 5000");
    assert_eq!(read.data.ids().last().unwrap(), "nps");
}

#[test]
fn errors_name_the_file_and_line() {
    let path = std::env::temp_dir().join("inpdeck_errors_name_the_file.inp");
    std::fs::write(&path, "title\n1 0 -1\n\n1 so 1\n\nnps 10\nimp:n -1\n").unwrap();

    let error = read_deck(&path).unwrap_err();
    std::fs::remove_file(&path).unwrap();

    let deck_error = error.downcast_ref::<inpdeck::InpError>().unwrap();
    assert!(deck_error.is_semantic());
    assert_eq!(deck_error.line, Some(7));
    assert!(error.to_string().contains("inpdeck_errors_name_the_file.inp"));
}
