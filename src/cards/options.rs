//! Keyword option scanning for compound cards
//!
//! Cell options and cards such as `sdef`, `fmesh`, or `ptrac` are a run of
//! `keyword=value...` pairs where the number of values is not always known in
//! advance. The scanner reads one option at a time:
//!
//! 1. Pop the key, split off any `*` prefix, numeric suffix, and designator
//! 2. Resolve the bare name against the card's keyword enum
//! 3. Take the minimum number of values for the keyword unconditionally
//! 4. Keep taking tokens up to the maximum, stopping early at the first token
//!    that resolves to a keyword of the same card
//!
//! The look ahead is a single token, and every loop is bounded by the tokens
//! left on the card.

// internal modules
use crate::cards::cell::Fill;
use crate::cards::data::source::SourceValue;
use crate::cards::fields::{self, Entry, ToToken, Vector3};
use crate::cards::transform::TransformRef;
use crate::error::{InpError, Result};
use crate::parsers;
use crate::particle::Designator;
use crate::tokens::TokenDeque;
use crate::utils::f;

// standard library
use std::collections::HashSet;
use std::fmt;

// external crates
use itertools::Itertools;
use log::trace;

/// Whether a keyword may carry a suffix or designator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allowed {
    Never,
    Optional,
    Required,
}

/// Shape of the value a keyword takes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueKind {
    /// No value at all
    Flag,
    Integer,
    Real,
    /// One or more integers, `j` allowed
    Integers,
    /// One or more reals, `j` allowed
    Reals,
    /// Exactly three reals
    Vector,
    Text,
    /// One or more free tokens
    Texts,
    /// One token from a fixed set
    Choice(&'static [&'static str]),
    /// One or more tokens from a fixed set
    Choices(&'static [&'static str]),
    /// Transformation number or parenthesised transformation
    Transform,
    /// Universe fill, simple or lattice array
    Fill,
    /// Source variable values, distributions, or dependencies
    Source,
}

impl ValueKind {
    /// Minimum and maximum number of value tokens
    fn bounds(&self) -> (usize, Option<usize>) {
        match self {
            Self::Flag => (0, Some(0)),
            Self::Integer | Self::Real | Self::Text | Self::Choice(_) => (1, Some(1)),
            Self::Vector => (3, Some(3)),
            _ => (1, None),
        }
    }
}

/// Typed value of a parsed option
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Flag,
    Integer(i64),
    Real(f64),
    Integers(Vec<Entry<i64>>),
    Reals(Vec<Entry<f64>>),
    Vector(Vector3),
    Text(String),
    Texts(Vec<String>),
    Transform(TransformRef),
    Fill(Fill),
    Source(Vec<SourceValue>),
}

impl OptionValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(r) => Some(*r),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Value text as written after the `=`
    pub fn text(&self) -> String {
        match self {
            Self::Flag => String::new(),
            Self::Integer(i) => i.to_string(),
            Self::Real(r) => r.token(),
            Self::Integers(v) => fields::join(v),
            Self::Reals(v) => fields::join(v),
            Self::Vector(v) => v.to_string(),
            Self::Text(t) => t.clone(),
            Self::Texts(t) => t.join(" "),
            Self::Transform(tr) => tr.to_text(false),
            Self::Fill(fill) => fill.to_string(),
            Self::Source(values) => values.iter().join(" "),
        }
    }

    /// Build from the value tokens collected for a keyword
    fn build(kind: ValueKind, values: Vec<String>, field: &str) -> Result<Self> {
        let single = values.first().cloned().unwrap_or_default();
        let value = match kind {
            ValueKind::Flag => Self::Flag,
            ValueKind::Integer => Self::Integer(fields::parse(&single, field)?),
            ValueKind::Real => Self::Real(fields::parse(&single, field)?),
            ValueKind::Integers => Self::Integers(parse_all(&values, field)?),
            ValueKind::Reals => Self::Reals(parse_all(&values, field)?),
            ValueKind::Vector => Self::Vector(Vector3::from_tokens(&values, field)?),
            ValueKind::Text => Self::Text(single),
            ValueKind::Texts => Self::Texts(values),
            ValueKind::Choice(choices) => {
                check_choices(&values, choices, field)?;
                Self::Text(single)
            }
            ValueKind::Choices(choices) => {
                check_choices(&values, choices, field)?;
                Self::Texts(values)
            }
            ValueKind::Source => Self::Source(
                values
                    .iter()
                    .map(|v| SourceValue::parse(v))
                    .collect::<Result<Vec<SourceValue>>>()?,
            ),
            // read directly from the deque, never collected
            ValueKind::Transform | ValueKind::Fill => {
                return Err(InpError::syntax(f!("{field} cannot be built from a list")))
            }
        };
        Ok(value)
    }
}

fn parse_all<T: fields::FromToken>(values: &[String], field: &str) -> Result<Vec<T>> {
    values.iter().map(|v| fields::parse(v, field)).collect()
}

fn check_choices(values: &[String], choices: &[&str], field: &str) -> Result<()> {
    match values.iter().find(|v| !choices.contains(&v.as_str())) {
        Some(v) => Err(InpError::semantic(f!(
            "{field} must be one of {}, found \"{v}\"",
            choices.join(", ")
        ))),
        None => Ok(()),
    }
}

/// Keyword set of one particular card
pub trait Keyword: Copy + PartialEq + fmt::Debug + Sized {
    /// Resolve a bare keyword name, without prefix, suffix, or designator
    fn resolve(name: &str) -> Option<Self>;

    fn name(&self) -> &'static str;

    fn kind(&self) -> ValueKind;

    fn suffix(&self) -> Allowed {
        Allowed::Never
    }

    fn designator(&self) -> Allowed {
        Allowed::Never
    }

    /// Prefixes accepted on the keyword, only ever `*`
    fn prefixes(&self) -> &'static [char] {
        &[]
    }

    /// Domain checks on the built option
    fn check(&self, _option: &KeywordOption<Self>) -> Result<()> {
        Ok(())
    }
}

/// A single `keyword[suffix][:designator]=value` pair
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordOption<K> {
    pub keyword: K,
    pub prefix: Option<char>,
    pub suffix: Option<u32>,
    pub designator: Option<Designator>,
    pub value: OptionValue,
}

impl<K: Keyword> KeywordOption<K> {
    pub fn new(keyword: K, value: OptionValue) -> Self {
        Self {
            keyword,
            prefix: None,
            suffix: None,
            designator: None,
            value,
        }
    }

    /// Unique key of the option, prefix excluded
    pub fn key(&self) -> String {
        let mut key = self.keyword.name().to_string();
        if let Some(s) = self.suffix {
            key += &s.to_string();
        }
        if let Some(d) = &self.designator {
            key += &f!(":{d}");
        }
        key
    }

    pub fn to_text(&self) -> String {
        let prefix = self.prefix.map(String::from).unwrap_or_default();
        match self.value {
            OptionValue::Flag => f!("{prefix}{}", self.key()),
            _ => f!("{prefix}{}={}", self.key(), self.value.text()),
        }
    }
}

impl<K: Keyword> fmt::Display for KeywordOption<K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

/// Scan every remaining token as keyword options
///
/// Keys may be repeated only with different suffixes or designators.
pub fn scan<K: Keyword>(tokens: &mut TokenDeque) -> Result<Vec<KeywordOption<K>>> {
    let mut pieces = split_pieces(tokens.take_rest());
    let mut options: Vec<KeywordOption<K>> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    while !pieces.is_empty() {
        let option = scan_one::<K>(&mut pieces)?;
        trace!("  option {}", option.to_text());
        if !seen.insert(option.key()) {
            return Err(InpError::semantic(f!("duplicate option \"{}\"", option.key())));
        }
        options.push(option);
    }

    Ok(options)
}

/// Read one option from the front of the pieces
fn scan_one<K: Keyword>(pieces: &mut TokenDeque) -> Result<KeywordOption<K>> {
    let token = pieces.pop_front()?;
    let (key, explicit) = match token.strip_suffix('=') {
        Some(key) => (key, true),
        None => (token.as_str(), false),
    };

    let raw =
        parsers::parse_mnemonic(key).ok_or_else(|| InpError::unrecognised("keyword", key))?;
    let keyword = K::resolve(raw.name).ok_or_else(|| InpError::unrecognised("keyword", key))?;

    if let Some(p) = raw.prefix {
        if !keyword.prefixes().contains(&p) {
            return Err(InpError::semantic(f!("\"{p}\" prefix not allowed on {key}")));
        }
    }

    let suffix = match raw.suffix {
        Some(s) => Some(
            s.parse::<u32>()
                .map_err(|_| InpError::semantic(f!("suffix of {key} is out of range")))?,
        ),
        None => None,
    };
    check_allowed(keyword.suffix(), suffix.is_some(), "numeric suffix", key)?;

    let designator = match raw.designator {
        Some(d) => Some(Designator::parse(d)?),
        None => None,
    };
    check_allowed(keyword.designator(), designator.is_some(), "particle designator", key)?;

    let kind = keyword.kind();
    if explicit && kind == ValueKind::Flag {
        return Err(InpError::syntax(f!("{key} does not take a value")));
    }

    let starred = raw.prefix == Some('*');
    let value = match kind {
        ValueKind::Transform => {
            let values = take_group(pieces, key)?;
            let transform = TransformRef::from_tokens(&values, starred).map_err(|e| e.within(key))?;
            OptionValue::Transform(transform)
        }
        ValueKind::Fill => {
            let fill = Fill::take(pieces, starred).map_err(|e| e.within(key))?;
            OptionValue::Fill(fill)
        }
        _ => {
            let values = collect::<K>(kind, pieces, key)?;
            OptionValue::build(kind, values, key)?
        }
    };

    let option = KeywordOption {
        keyword,
        prefix: raw.prefix,
        suffix,
        designator,
        value,
    };
    keyword.check(&option).map_err(|e| e.within(key))?;
    Ok(option)
}

fn check_allowed(allowed: Allowed, present: bool, what: &str, key: &str) -> Result<()> {
    match (allowed, present) {
        (Allowed::Never, true) => Err(InpError::semantic(f!("{key} does not take a {what}"))),
        (Allowed::Required, false) => Err(InpError::semantic(f!("{key} requires a {what}"))),
        _ => Ok(()),
    }
}

/// Values up to the next keyword, within the bounds of the value kind
fn collect<K: Keyword>(kind: ValueKind, pieces: &mut TokenDeque, key: &str) -> Result<Vec<String>> {
    let (min, max) = kind.bounds();
    let mut values: Vec<String> = Vec::new();

    while max.map_or(true, |m| values.len() < m) {
        let Some(next) = pieces.front() else {
            break;
        };
        if values.len() >= min && is_keyword::<K>(next) {
            break;
        }
        values.push(pieces.pop_front()?);
    }

    if values.len() < min {
        return Err(InpError::too_few(&f!("{min} value(s) for {key}")));
    }
    Ok(values)
}

/// A single token, or a whole parenthesised group
pub fn take_group(pieces: &mut TokenDeque, key: &str) -> Result<Vec<String>> {
    let first = pieces.pop_front_or(|| InpError::too_few(&f!("a value for {key}")))?;
    if first != "(" {
        return Ok(vec![first]);
    }

    let mut group = vec![first];
    loop {
        let token = pieces.pop_front_or(|| InpError::syntax(f!("unclosed \"(\" in {key}")))?;
        let closed = token == ")";
        group.push(token);
        if closed {
            return Ok(group);
        }
    }
}

/// True if the token would start a new option of the card
pub fn is_keyword<K: Keyword>(token: &str) -> bool {
    if token.ends_with('=') {
        return true;
    }
    parsers::parse_mnemonic(token)
        .and_then(|raw| K::resolve(raw.name))
        .is_some()
}

/// Split `key=value` and parentheses into their own pieces
///
/// `trcl=(1 0 0)` becomes `["trcl=", "(", "1", "0", "0", ")"]`.
pub fn split_pieces(tokens: Vec<String>) -> TokenDeque {
    let mut pieces = TokenDeque::new();
    for token in tokens {
        let rest = match token.split_once('=') {
            Some((key, value)) => {
                pieces.push_back(f!("{key}="));
                value.to_string()
            }
            None => token,
        };

        let mut current = String::new();
        for c in rest.chars() {
            if c == '(' || c == ')' {
                if !current.is_empty() {
                    pieces.push_back(std::mem::take(&mut current));
                }
                pieces.push_back(c.to_string());
            } else {
                current.push(c);
            }
        }
        if !current.is_empty() {
            pieces.push_back(current);
        }
    }
    pieces
}

/// Look up the first option using a keyword
pub fn find<K: Keyword>(options: &[KeywordOption<K>], keyword: K) -> Option<&KeywordOption<K>> {
    options.iter().find(|o| o.keyword == keyword)
}

/// Option text for every option in order
pub fn texts<K: Keyword>(options: &[KeywordOption<K>]) -> Vec<String> {
    options.iter().map(KeywordOption::to_text).collect()
}

/// Declare a keyword enum with its names and value kinds in one table
macro_rules! keyword_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal, $kind:ident $(($($arg:tt)*))?;)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant,)*
        }

        impl $name {
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($text => Some(Self::$variant),)*
                    _ => None,
                }
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)*
                }
            }

            pub fn value_kind(&self) -> $crate::cards::options::ValueKind {
                match self {
                    $(Self::$variant => $crate::cards::options::ValueKind::$kind $(($($arg)*))?,)*
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }
    };
}

pub(crate) use keyword_enum;

/// Declare a plain enum read from and written as fixed tokens
macro_rules! token_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant,)*
        }

        impl $name {
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($text => Some(Self::$variant),)*
                    _ => None,
                }
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)*
                }
            }
        }

        impl $crate::cards::fields::FromToken for $name {
            fn from_token(token: &str, field: &str) -> $crate::error::Result<Self> {
                Self::from_name(token).ok_or_else(|| $crate::error::InpError::semantic(format!(
                    "{field} must be one of {}, found \"{token}\"",
                    [$($text),*].join(", ")
                )))
            }
        }

        impl $crate::cards::fields::ToToken for $name {
            fn token(&self) -> String {
                self.as_str().to_string()
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }
    };
}

pub(crate) use token_enum;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    keyword_enum! {
        enum Demo {
            Imp => "imp", Real;
            Pos => "pos", Vector;
            Erg => "erg", Reals;
            Geom => "geom", Choice(&["xyz", "cyl"]);
            Out => "out", Flag;
            Tr => "trcl", Transform;
        }
    }

    impl Keyword for Demo {
        fn resolve(name: &str) -> Option<Self> {
            Self::from_name(name)
        }

        fn name(&self) -> &'static str {
            self.as_str()
        }

        fn kind(&self) -> ValueKind {
            self.value_kind()
        }

        fn designator(&self) -> Allowed {
            match self {
                Self::Imp => Allowed::Required,
                _ => Allowed::Never,
            }
        }

        fn prefixes(&self) -> &'static [char] {
            match self {
                Self::Tr => &['*'],
                _ => &[],
            }
        }
    }

    fn scan_text(text: &str) -> Result<Vec<KeywordOption<Demo>>> {
        scan::<Demo>(&mut TokenDeque::from(text))
    }

    #[test]
    fn pieces() {
        let pieces = split_pieces(vec!["trcl=(1".into(), "0".into(), "0)".into()]);
        assert_eq!(pieces.to_string(), "trcl= ( 1 0 0 )");
    }

    #[test]
    fn greedy_until_next_keyword() {
        let options = scan_text("erg=1 2 3 imp:n=1 pos=0 0 5 out").unwrap();
        assert_eq!(options.len(), 4);
        assert_eq!(options[0].value.text(), "1 2 3");
        assert_eq!(options[1].key(), "imp:n");
        assert_eq!(options[2].value, OptionValue::Vector(Vector3::new(0.0, 0.0, 5.0)));
        assert_eq!(options[3].to_text(), "out");
    }

    #[test]
    fn transforms() {
        let options = scan_text("*trcl=(0 0 0 90 0 90 90 90 0 180 90 90) imp:p=0").unwrap();
        assert_eq!(
            options[0].to_text(),
            "*trcl=(0 0 0 90 0 90 90 90 0 180 90 90)"
        );
        assert!(scan_text("trcl=(0 0 1").unwrap_err().is_syntax());
    }

    #[rstest]
    #[case("vol=1", true)]
    #[case("imp=1", false)]
    #[case("erg=", true)]
    #[case("pos=1 2", true)]
    #[case("out=1", true)]
    #[case("*imp:n=1", false)]
    #[case("geom=sph", false)]
    #[case("imp:n=1 imp:n=2", false)]
    fn rejected(#[case] text: &str, #[case] syntax: bool) {
        let error = scan_text(text).unwrap_err();
        assert_eq!(error.is_syntax(), syntax, "{error}");
    }

    #[test]
    fn same_keyword_different_designator() {
        let options = scan_text("imp:n=1 imp:p=0").unwrap();
        assert_eq!(texts(&options), vec!["imp:n=1", "imp:p=0"]);
        assert!(find(&options, Demo::Imp).is_some());
        assert!(find(&options, Demo::Out).is_none());
    }
}
