//! Typed field reading and rendering shared by every card
//!
//! Reading a field is always a two step affair. The token must first parse as
//! the right type, which is a [Syntax](crate::error::ErrorKind::Syntax) error
//! otherwise, and then the value must sit inside the domain of the field, which
//! is a [Semantic](crate::error::ErrorKind::Semantic) error otherwise.

// internal modules
use crate::error::{InpError, Result};
use crate::parsers;
use crate::tokens::TokenDeque;
use crate::utils::{f, NumberFmt};

// standard library
use std::fmt;
use std::ops::RangeInclusive;

// external crates
use itertools::Itertools;

/// Largest cell, surface, universe, or material number
pub const MAX_NUMBER: u32 = 99_999_999;

/// Read a value from a single deck token
pub trait FromToken: Sized {
    fn from_token(token: &str, field: &str) -> Result<Self>;
}

/// Render a value as a single deck token
pub trait ToToken {
    fn token(&self) -> String;
}

impl FromToken for f64 {
    fn from_token(token: &str, field: &str) -> Result<Self> {
        parsers::parse_real(token).ok_or_else(|| InpError::invalid_token(field, token))
    }
}

impl FromToken for i64 {
    fn from_token(token: &str, field: &str) -> Result<Self> {
        parsers::parse_integer(token).ok_or_else(|| InpError::invalid_token(field, token))
    }
}

impl FromToken for String {
    fn from_token(token: &str, _field: &str) -> Result<Self> {
        Ok(token.to_string())
    }
}

/// Narrower integer types, failing semantically when the value does not fit
macro_rules! narrow_integer {
    ($($t:ty),*) => {
        $(
            impl FromToken for $t {
                fn from_token(token: &str, field: &str) -> Result<Self> {
                    let value = i64::from_token(token, field)?;
                    <$t>::try_from(value).map_err(|_| {
                        InpError::semantic(f!("{field} {value} is out of range"))
                    })
                }
            }
        )*
    };
}

narrow_integer!(i8, i32, u8, u32, u64, usize);

impl ToToken for f64 {
    fn token(&self) -> String {
        self.inp()
    }
}

impl ToToken for String {
    fn token(&self) -> String {
        self.clone()
    }
}

macro_rules! integer_token {
    ($($t:ty),*) => {
        $(
            impl ToToken for $t {
                fn token(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

integer_token!(i8, i32, i64, u8, u32, u64, usize);

/// A value that may be given as the `j` placeholder
///
/// ```rust
/// # use inpdeck::cards::fields::{Entry, FromToken, ToToken};
/// let entry = Entry::<f64>::from_token("j", "importance").unwrap();
/// assert_eq!(entry, Entry::Jump);
/// assert_eq!(Entry::Value(0.5_f64).token(), "0.5");
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entry<T> {
    Value(T),
    Jump,
}

impl<T> Entry<T> {
    /// The value, if this is not a jump
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Jump => None,
        }
    }

    pub fn is_jump(&self) -> bool {
        matches!(self, Self::Jump)
    }

    /// Run a domain check on the value, jumps always pass
    pub fn check(self, check: impl Fn(&T) -> Result<()>) -> Result<Self> {
        if let Self::Value(v) = &self {
            check(v)?;
        }
        Ok(self)
    }
}

impl<T: FromToken> FromToken for Entry<T> {
    fn from_token(token: &str, field: &str) -> Result<Self> {
        match token {
            "j" => Ok(Self::Jump),
            _ => T::from_token(token, field).map(Self::Value),
        }
    }
}

impl<T: ToToken> ToToken for Entry<T> {
    fn token(&self) -> String {
        match self {
            Self::Value(v) => v.token(),
            Self::Jump => "j".to_string(),
        }
    }
}

impl<T: ToToken> fmt::Display for Entry<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Cartesian triplet used for positions and directions
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Read three consecutive reals from the front of the deque
    pub fn pop(tokens: &mut TokenDeque, field: &str) -> Result<Self> {
        Ok(Self {
            x: pop(tokens, field)?,
            y: pop(tokens, field)?,
            z: pop(tokens, field)?,
        })
    }

    /// Build from exactly three tokens
    pub fn from_tokens(tokens: &[String], field: &str) -> Result<Self> {
        match tokens {
            [x, y, z] => Ok(Self {
                x: parse(x, field)?,
                y: parse(y, field)?,
                z: parse(z, field)?,
            }),
            _ => Err(InpError::syntax(f!(
                "{field} needs 3 values, found {}",
                tokens.len()
            ))),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    pub fn tokens(&self) -> Vec<String> {
        vec![self.x.token(), self.y.token(), self.z.token()]
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.tokens().join(" "))
    }
}

/// Parse a single token as the named field
pub fn parse<T: FromToken>(token: &str, field: &str) -> Result<T> {
    T::from_token(token, field)
}

/// Pop and parse a required field from the front
pub fn pop<T: FromToken>(tokens: &mut TokenDeque, field: &str) -> Result<T> {
    let token = tokens.pop_front_or(|| InpError::too_few(field))?;
    T::from_token(&token, field)
}

/// Pop and parse an optional trailing field
pub fn pop_optional<T: FromToken>(tokens: &mut TokenDeque, field: &str) -> Result<Option<T>> {
    match tokens.is_empty() {
        true => Ok(None),
        false => pop(tokens, field).map(Some),
    }
}

/// Parse every remaining token as the same field type
pub fn rest<T: FromToken>(tokens: &mut TokenDeque, field: &str) -> Result<Vec<T>> {
    tokens
        .take_rest()
        .iter()
        .map(|t| T::from_token(t, field))
        .collect()
}

/// As [rest], but at least one value is required
pub fn rest_required<T: FromToken>(tokens: &mut TokenDeque, field: &str) -> Result<Vec<T>> {
    if tokens.is_empty() {
        return Err(InpError::too_few(field));
    }
    rest(tokens, field)
}

/// Value must lie inside an inclusive range
pub fn in_range<T>(value: T, range: RangeInclusive<T>, field: &str) -> Result<T>
where
    T: PartialOrd + fmt::Display + Copy,
{
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(InpError::semantic(f!(
            "{field} {value} not in {}..={}",
            range.start(),
            range.end()
        )))
    }
}

pub fn positive(value: f64, field: &str) -> Result<f64> {
    match value > 0.0 {
        true => Ok(value),
        false => Err(InpError::semantic(f!("{field} must be positive, found {value}"))),
    }
}

pub fn non_negative(value: f64, field: &str) -> Result<f64> {
    match value >= 0.0 {
        true => Ok(value),
        false => Err(InpError::semantic(f!(
            "{field} must not be negative, found {value}"
        ))),
    }
}

/// Value must be one of an explicit set
pub fn one_of<T>(value: T, choices: &[T], field: &str) -> Result<T>
where
    T: PartialEq + fmt::Display + Copy,
{
    if choices.contains(&value) {
        Ok(value)
    } else {
        Err(InpError::semantic(f!(
            "{field} {value} must be one of {}",
            choices.iter().join(", ")
        )))
    }
}

/// Values must be strictly increasing
pub fn increasing(values: &[f64], field: &str) -> Result<()> {
    match values.iter().tuple_windows().find(|(a, b)| b <= a) {
        Some((a, b)) => Err(InpError::semantic(f!(
            "{field} must be strictly increasing, found {} then {}",
            a.inp(),
            b.inp()
        ))),
        None => Ok(()),
    }
}

/// Check every non-jump entry of a list
pub fn check_entries<T>(entries: &[Entry<T>], check: impl Fn(&T) -> Result<()>) -> Result<()> {
    entries
        .iter()
        .filter_map(Entry::value)
        .try_for_each(check)
}

/// Render a list of values as space separated tokens
pub fn join<T: ToToken>(values: &[T]) -> String {
    values.iter().map(ToToken::token).join(" ")
}

/// Every value as a token, for building up field lists
pub fn tokens<T: ToToken>(values: &[T]) -> Vec<String> {
    values.iter().map(ToToken::token).collect()
}

/// Exactly one of two keywords, such as `yes`/`no`
pub fn flag(token: &str, yes: &str, no: &str, field: &str) -> Result<bool> {
    match token {
        t if t == yes => Ok(true),
        t if t == no => Ok(false),
        t => Err(InpError::semantic(f!(
            "{field} must be \"{yes}\" or \"{no}\", found \"{t}\""
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn syntax_then_semantic() {
        let error = parse::<u32>("x", "cell number").unwrap_err();
        assert!(error.is_syntax());
        assert_eq!(error.message, "could not read \"x\" as cell number");

        let error = parse::<u32>("-3", "cell number").unwrap_err();
        assert!(error.is_semantic());
    }

    #[rstest]
    #[case(5, true)]
    #[case(0, false)]
    #[case(100_000_000, false)]
    fn ranges(#[case] value: u32, #[case] ok: bool) {
        assert_eq!(in_range(value, 1..=MAX_NUMBER, "cell").is_ok(), ok);
    }

    #[test]
    fn entries() {
        let entries = ["1", "j", "-2"]
            .iter()
            .map(|t| parse::<Entry<f64>>(t, "importance"))
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(join(&entries), "1 j -2");

        let error = check_entries(&entries, |v| non_negative(*v, "importance").map(|_| ()));
        assert!(error.unwrap_err().is_semantic());
    }

    #[test]
    fn popping_fields() {
        let mut tokens = TokenDeque::from("1 2.5");
        assert_eq!(pop::<u32>(&mut tokens, "n").unwrap(), 1);
        assert_eq!(pop_optional::<f64>(&mut tokens, "r").unwrap(), Some(2.5));
        assert_eq!(pop_optional::<f64>(&mut tokens, "r").unwrap(), None);

        let error = pop::<f64>(&mut tokens, "radius").unwrap_err();
        assert_eq!(error.message, "too few fields, expected radius");
    }

    #[test]
    fn monotonic_values() {
        assert!(increasing(&[1.0, 2.0, 3.0], "bins").is_ok());
        assert!(increasing(&[1.0, 1.0], "bins").unwrap_err().is_semantic());
    }

    #[test]
    fn vectors() {
        let mut tokens = TokenDeque::from("1 0 -2.5 7");
        let v = Vector3::pop(&mut tokens, "position").unwrap();
        assert_eq!(v.to_string(), "1 0 -2.5");
        assert_eq!(tokens.len(), 1);
    }
}
