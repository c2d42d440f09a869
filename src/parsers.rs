//! Token-level grammars built from nom combinators
//!
//! Everything here works on a single whitespace-free token (or a geometry
//! formula) that the preprocessor has already case folded. Wrappers such as
//! [parse_real] demand that the whole token is consumed so that `1.0x` is
//! never read as `1.0`.

// internal modules
use crate::geometry::GeometryToken;

// external crates
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char, digit0, digit1, multispace0, one_of};
use nom::combinator::{all_consuming, map, map_res, opt, recognize, value};
use nom::multi::many0;
use nom::sequence::{delimited, pair, preceded, terminated, tuple};
use nom::IResult;

/// Pieces of a mnemonic token before any validation
///
/// For `*tr12` this is `('*', "tr", "12", None)`, and for `wwn3:p` it is
/// `(None, "wwn", "3", "p")`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMnemonic<'a> {
    pub prefix: Option<char>,
    pub name: &'a str,
    pub suffix: Option<&'a str>,
    pub designator: Option<&'a str>,
}

/// Split a mnemonic token into prefix, name, suffix, and designator
pub fn mnemonic(i: &str) -> IResult<&str, RawMnemonic> {
    let (i, prefix) = opt(one_of("*+"))(i)?;
    let (i, name) = take_while1(|c: char| c.is_ascii_alphabetic())(i)?;
    let (i, suffix) = opt(digit1)(i)?;
    let (i, designator) = opt(preceded(
        char(':'),
        take_while1(|c: char| c != '=' && !c.is_whitespace()),
    ))(i)?;

    Ok((
        i,
        RawMnemonic {
            prefix,
            name,
            suffix,
            designator,
        },
    ))
}

/// The whole token must be a mnemonic
pub fn parse_mnemonic(token: &str) -> Option<RawMnemonic> {
    all_consuming(mnemonic)(token).ok().map(|(_, m)| m)
}

/// Signed integer with an optional explicit `+`
pub fn integer(i: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), str::parse::<i64>)(i)
}

/// Real number, including the FORTRAN habit of dropping the `e`
///
/// MCNP happily reads `1.5-3` as `1.5e-3`, and decks in the wild rely on it.
/// The exponent marker may also be `d` as in FORTRAN double precision.
pub fn real(i: &str) -> IResult<&str, f64> {
    let (i, mantissa) = recognize(tuple((
        opt(one_of("+-")),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
    )))(i)?;

    let (i, exponent) = opt(alt((
        preceded(
            one_of("eEdD"),
            recognize(pair(opt(one_of("+-")), digit1)),
        ),
        recognize(pair(one_of("+-"), digit1)),
    )))(i)?;

    let text = match exponent {
        Some(exp) => format!("{mantissa}e{exp}"),
        None => mantissa.to_string(),
    };

    match text.parse::<f64>() {
        Ok(number) => Ok((i, number)),
        Err(_) => Err(nom::Err::Error(nom::error::Error::new(
            i,
            nom::error::ErrorKind::Float,
        ))),
    }
}

/// Whole token as an integer
///
/// ```rust
/// # use inpdeck::parsers::parse_integer;
/// assert_eq!(parse_integer("-12"), Some(-12));
/// assert_eq!(parse_integer("+3"), Some(3));
/// assert_eq!(parse_integer("1.0"), None);
/// ```
pub fn parse_integer(token: &str) -> Option<i64> {
    all_consuming(integer)(token).ok().map(|(_, n)| n)
}

/// Whole token as a real number
///
/// ```rust
/// # use inpdeck::parsers::parse_real;
/// assert_eq!(parse_real("2.5"), Some(2.5));
/// assert_eq!(parse_real("1e-3"), Some(1e-3));
/// assert_eq!(parse_real("1.0-3"), Some(1e-3));
/// assert_eq!(parse_real(".5"), Some(0.5));
/// assert_eq!(parse_real("1e"), None);
/// assert_eq!(parse_real("d1"), None);
/// ```
pub fn parse_real(token: &str) -> Option<f64> {
    all_consuming(real)(token).ok().map(|(_, n)| n)
}

/// Input shorthand that expands into several tokens
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shorthand {
    /// `Nj`: N placeholder `j` entries
    Jump(usize),
    /// `Nr`: the previous value N more times
    Repeat(usize),
    /// `Ni`: N values linearly interpolated between the neighbours
    Interpolate(usize),
    /// `Nilog`: N values logarithmically interpolated between the neighbours
    LogInterpolate(usize),
    /// `xm`: the previous value multiplied by x
    Multiply(f64),
}

fn count(i: &str) -> IResult<&str, usize> {
    map(opt(map_res(digit1, str::parse::<usize>)), |n| n.unwrap_or(1))(i)
}

/// Recognise a shorthand token such as `3j`, `r`, `2ilog`, or `0.5m`
pub fn shorthand(i: &str) -> IResult<&str, Shorthand> {
    alt((
        map(terminated(count, tag("ilog")), Shorthand::LogInterpolate),
        map(terminated(count, char('j')), Shorthand::Jump),
        map(terminated(count, char('r')), Shorthand::Repeat),
        map(terminated(count, char('i')), Shorthand::Interpolate),
        map(terminated(real, char('m')), Shorthand::Multiply),
    ))(i)
}

/// Whole token as a shorthand, with zero counts rejected
///
/// ```rust
/// # use inpdeck::parsers::{parse_shorthand, Shorthand};
/// assert_eq!(parse_shorthand("3j"), Some(Shorthand::Jump(3)));
/// assert_eq!(parse_shorthand("r"), Some(Shorthand::Repeat(1)));
/// assert_eq!(parse_shorthand("4ilog"), Some(Shorthand::LogInterpolate(4)));
/// assert_eq!(parse_shorthand("0.5m"), Some(Shorthand::Multiply(0.5)));
/// assert_eq!(parse_shorthand("j"), Some(Shorthand::Jump(1)));
/// assert_eq!(parse_shorthand("3x"), None);
/// ```
pub fn parse_shorthand(token: &str) -> Option<Shorthand> {
    let (_, shorthand) = all_consuming(shorthand)(token).ok()?;
    match shorthand {
        Shorthand::Jump(0)
        | Shorthand::Repeat(0)
        | Shorthand::Interpolate(0)
        | Shorthand::LogInterpolate(0) => None,
        s => Some(s),
    }
}

/// True for tokens that can only be data values, never a mnemonic
///
/// Used to tell the rows of a vertical table apart from the next card.
pub fn is_value_token(token: &str) -> bool {
    parse_real(token).is_some() || parse_shorthand(token).is_some()
}

/// Single token of a cell geometry formula
pub fn geometry_token(i: &str) -> IResult<&str, GeometryToken> {
    alt((
        value(GeometryToken::Open, char('(')),
        value(GeometryToken::Close, char(')')),
        value(GeometryToken::Union, char(':')),
        value(GeometryToken::Complement, char('#')),
        map(integer, GeometryToken::Surface),
    ))(i)
}

/// Lex a formula into its tokens, returning whatever could not be read
pub fn geometry_tokens(i: &str) -> IResult<&str, Vec<GeometryToken>> {
    many0(delimited(multispace0, geometry_token, multispace0))(i)
}

/// True for tokens made only of the characters a geometry formula may use
pub fn is_geometry_text(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || "+-#():".contains(c))
}

/// Nuclide identifier, `zzzaaa` with an optional `.nnX` library
///
/// ```rust
/// # use inpdeck::parsers::parse_zaid;
/// assert_eq!(parse_zaid("1001.80c"), Some((1001, Some("80c"))));
/// assert_eq!(parse_zaid("8016"), Some((8016, None)));
/// assert_eq!(parse_zaid("h1"), None);
/// ```
pub fn parse_zaid(token: &str) -> Option<(u32, Option<&str>)> {
    all_consuming(zaid)(token).ok().map(|(_, z)| z)
}

/// Distribution reference such as `d12`
pub fn parse_distribution(token: &str) -> Option<u32> {
    all_consuming(distribution)(token).ok().map(|(_, n)| n)
}

fn zaid(i: &str) -> IResult<&str, (u32, Option<&str>)> {
    pair(
        map_res(digit1, str::parse::<u32>),
        opt(preceded(
            char('.'),
            take_while1(|c: char| c.is_ascii_alphanumeric()),
        )),
    )(i)
}

fn distribution(i: &str) -> IResult<&str, u32> {
    preceded(char('d'), map_res(digit1, str::parse::<u32>))(i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("imp:n", None, "imp", None, Some("n"))]
    #[case("wwn3:p", None, "wwn", Some("3"), Some("p"))]
    #[case("*tr12", Some('*'), "tr", Some("12"), None)]
    #[case("fmesh14:n,p", None, "fmesh", Some("14"), Some("n,p"))]
    #[case("sdef", None, "sdef", None, None)]
    #[case("+f6", Some('+'), "f", Some("6"), None)]
    fn mnemonic_parts(
        #[case] token: &str,
        #[case] prefix: Option<char>,
        #[case] name: &str,
        #[case] suffix: Option<&str>,
        #[case] designator: Option<&str>,
    ) {
        let raw = parse_mnemonic(token).unwrap();
        assert_eq!(raw.prefix, prefix);
        assert_eq!(raw.name, name);
        assert_eq!(raw.suffix, suffix);
        assert_eq!(raw.designator, designator);
    }

    #[rstest]
    #[case("12")]
    #[case("imp:")]
    #[case("tr1x")]
    fn not_mnemonics(#[case] token: &str) {
        assert!(parse_mnemonic(token).is_none());
    }

    #[rstest]
    #[case("1", 1.0)]
    #[case("-1.", -1.0)]
    #[case("+2.5e+2", 250.0)]
    #[case("3.0d2", 300.0)]
    #[case("1.5+2", 150.0)]
    #[case("7-1", 0.7)]
    fn reals(#[case] token: &str, #[case] expected: f64) {
        let value = parse_real(token).unwrap();
        assert!((value - expected).abs() < 1e-12);
    }

    #[test]
    fn geometry_lexing() {
        let (rest, tokens) = geometry_tokens("#(1 -2):3").unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            tokens,
            vec![
                GeometryToken::Complement,
                GeometryToken::Open,
                GeometryToken::Surface(1),
                GeometryToken::Surface(-2),
                GeometryToken::Close,
                GeometryToken::Union,
                GeometryToken::Surface(3),
            ]
        );

        let (rest, _) = geometry_tokens("1 2.5").unwrap();
        assert_eq!(rest, ".5");
    }

    #[rstest]
    #[case("1001.80c", Some((1001, Some("80c"))))]
    #[case("92235", Some((92235, None)))]
    #[case("1001.", None)]
    #[case("lwtr.20t", None)]
    fn zaids(#[case] token: &str, #[case] expected: Option<(u32, Option<&str>)>) {
        assert_eq!(parse_zaid(token), expected);
    }

    #[rstest]
    #[case("d12", Some(12))]
    #[case("d", None)]
    #[case("d3x", None)]
    #[case("12", None)]
    fn distributions(#[case] token: &str, #[case] expected: Option<u32>) {
        assert_eq!(parse_distribution(token), expected);
    }

    #[test]
    fn value_tokens() {
        assert!(is_value_token("1e5"));
        assert!(is_value_token("2j"));
        assert!(!is_value_token("imp:n"));
        assert!(!is_value_token("m1"));
    }
}
