//! Cell geometry formulas
//!
//! A cell is described by a boolean combination of signed surface numbers.
//!
//! | Syntax     | Meaning                          | Precedence |
//! | ---------- | -------------------------------- | ---------- |
//! | `#a`       | complement                       | highest    |
//! | `a b`      | intersection (implicit, a space) | middle     |
//! | `a : b`    | union                            | lowest     |
//! | `( ... )`  | grouping                         |            |
//!
//! Formulas are checked with a Shunting-Yard scan, which doubles as a check
//! that operators and operands alternate properly. The derived postfix form is
//! kept for anything that wants to evaluate the geometry, but the formula text
//! is what gets written back to a deck.
//!
//! ```rust
//! # use inpdeck::geometry::CellGeometry;
//! let geometry = CellGeometry::parse("-1 2 : #3").unwrap();
//! assert_eq!(geometry.formula(), "-1 2 : #3");
//! assert_eq!(geometry.surfaces(), vec![-1, 2, 3]);
//!
//! assert!(CellGeometry::parse("(1 2").is_err());
//! assert!(CellGeometry::parse("1 : : 2").is_err());
//! ```

// internal modules
use crate::error::{InpError, Result};
use crate::parsers;

// standard library
use std::fmt;

// external crates
use itertools::Itertools;
use log::trace;

/// Largest magnitude of a surface number in a formula
pub const MAX_SURFACE: i64 = 99_999_999;

/// Lexical elements of a geometry formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryToken {
    /// Signed surface (or cell, after `#`) number
    Surface(i64),
    /// `#`
    Complement,
    /// `:`
    Union,
    /// `(`
    Open,
    /// `)`
    Close,
}

/// Operators and operands of the derived postfix expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Postfix {
    Surface(i64),
    Complement,
    Intersection,
    Union,
}

impl Postfix {
    /// Operands consumed when evaluating the item
    fn arity(&self) -> usize {
        match self {
            Self::Surface(_) => 0,
            Self::Complement => 1,
            Self::Intersection | Self::Union => 2,
        }
    }
}

impl fmt::Display for Postfix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Surface(n) => write!(f, "{n}"),
            Self::Complement => write!(f, "#"),
            Self::Intersection => write!(f, "&"),
            Self::Union => write!(f, ":"),
        }
    }
}

/// Entries of the operator stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Complement,
    Intersection,
    Union,
    Open,
}

impl Operator {
    fn precedence(&self) -> u8 {
        match self {
            Self::Complement => 3,
            Self::Intersection => 2,
            Self::Union => 1,
            Self::Open => 0,
        }
    }

    fn postfix(&self) -> Postfix {
        match self {
            Self::Complement => Postfix::Complement,
            Self::Intersection => Postfix::Intersection,
            Self::Union => Postfix::Union,
            // never emitted, parentheses are dropped on the way out
            Self::Open => unreachable!(),
        }
    }
}

/// Validated cell geometry formula
///
/// Immutable once built. The formula is stored with whitespace collapsed but
/// otherwise exactly as written.
#[derive(Debug, Clone, PartialEq)]
pub struct CellGeometry {
    formula: String,
    postfix: Vec<Postfix>,
}

impl CellGeometry {
    /// Validate a formula and derive its postfix form
    pub fn parse(formula: &str) -> Result<Self> {
        let formula = formula.split_whitespace().join(" ");
        trace!("[Geometry] {formula}");

        let tokens = tokenise(&formula)?;
        if tokens.is_empty() {
            return Err(InpError::syntax("too few tokens in geometry formula"));
        }

        let postfix = shunting_yard(&tokens)?;
        check_arity(&postfix)?;

        Ok(Self { formula, postfix })
    }

    /// Formula text as it is written back to a deck
    pub fn formula(&self) -> &str {
        &self.formula
    }

    /// Reverse Polish form, with `&` standing for intersection
    ///
    /// ```rust
    /// # use inpdeck::geometry::{CellGeometry, Postfix};
    /// let geometry = CellGeometry::parse("1 2 : 3").unwrap();
    /// let text = geometry.postfix().iter().map(|p| p.to_string()).collect::<Vec<_>>();
    /// assert_eq!(text, vec!["1", "2", "&", "3", ":"]);
    /// ```
    pub fn postfix(&self) -> &[Postfix] {
        &self.postfix
    }

    /// Every signed number referenced, in order of appearance
    pub fn surfaces(&self) -> Vec<i64> {
        self.postfix
            .iter()
            .filter_map(|p| match p {
                Postfix::Surface(n) => Some(*n),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for CellGeometry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.formula)
    }
}

/// Lex the formula and range check every literal
fn tokenise(formula: &str) -> Result<Vec<GeometryToken>> {
    let (rest, tokens) = parsers::geometry_tokens(formula)
        .map_err(|_| InpError::syntax(format!("could not read geometry \"{formula}\"")))?;

    if !rest.is_empty() {
        return Err(InpError::syntax(format!(
            "unexpected \"{rest}\" in geometry \"{formula}\""
        )));
    }

    for token in &tokens {
        if let GeometryToken::Surface(n) = token {
            if *n == 0 || n.abs() > MAX_SURFACE {
                return Err(InpError::semantic(format!(
                    "geometry literal {n} must be nonzero and within +/-{MAX_SURFACE}"
                )));
            }
        }
    }

    Ok(tokens)
}

/// Convert to postfix, checking operand/operator alternation along the way
///
/// Intersection is never written, so it is inserted whenever something that
/// can start an operand follows something that can end one.
fn shunting_yard(tokens: &[GeometryToken]) -> Result<Vec<Postfix>> {
    let mut output: Vec<Postfix> = Vec::with_capacity(tokens.len());
    let mut operators: Vec<Operator> = Vec::new();

    // true whenever the previous token completed an operand
    let mut after_operand = false;

    for token in tokens {
        let starts_operand = matches!(
            token,
            GeometryToken::Surface(_) | GeometryToken::Complement | GeometryToken::Open
        );

        if after_operand && starts_operand {
            push_operator(Operator::Intersection, &mut operators, &mut output);
            after_operand = false;
        }

        match token {
            GeometryToken::Surface(n) => {
                output.push(Postfix::Surface(*n));
                after_operand = true;
            }
            GeometryToken::Complement => {
                // unary prefix, nothing of higher precedence to pop
                operators.push(Operator::Complement);
            }
            GeometryToken::Open => operators.push(Operator::Open),
            GeometryToken::Union => {
                if !after_operand {
                    return Err(InpError::syntax("union \":\" is missing an operand"));
                }
                push_operator(Operator::Union, &mut operators, &mut output);
                after_operand = false;
            }
            GeometryToken::Close => {
                if !after_operand {
                    return Err(InpError::syntax("empty or incomplete parenthesised group"));
                }
                loop {
                    match operators.pop() {
                        Some(Operator::Open) => break,
                        Some(op) => output.push(op.postfix()),
                        None => return Err(InpError::syntax("unmatched \")\" in geometry")),
                    }
                }
                // a completed group may finish a pending complement
                while let Some(Operator::Complement) = operators.last() {
                    operators.pop();
                    output.push(Postfix::Complement);
                }
            }
        }

        // complements bind tighter than anything, so close them immediately
        if after_operand && matches!(token, GeometryToken::Surface(_)) {
            while let Some(Operator::Complement) = operators.last() {
                operators.pop();
                output.push(Postfix::Complement);
            }
        }
    }

    if !after_operand {
        return Err(InpError::syntax("geometry formula ends with an operator"));
    }

    while let Some(op) = operators.pop() {
        if op == Operator::Open {
            return Err(InpError::syntax("unmatched \"(\" in geometry"));
        }
        output.push(op.postfix());
    }

    Ok(output)
}

/// Pop operators of higher or equal precedence, then push the new one
fn push_operator(operator: Operator, operators: &mut Vec<Operator>, output: &mut Vec<Postfix>) {
    while let Some(top) = operators.last() {
        if *top != Operator::Open && top.precedence() >= operator.precedence() {
            output.push(top.postfix());
            operators.pop();
        } else {
            break;
        }
    }
    operators.push(operator);
}

/// Evaluate the stack depth of the postfix form, which must end at exactly one
fn check_arity(postfix: &[Postfix]) -> Result<()> {
    let mut depth: usize = 0;
    for item in postfix {
        let arity = item.arity();
        if depth < arity {
            return Err(InpError::syntax(format!(
                "operator \"{item}\" is missing an operand"
            )));
        }
        depth = depth - arity + 1;
    }

    match depth {
        1 => Ok(()),
        _ => Err(InpError::syntax("geometry does not reduce to a single region")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn postfix_text(formula: &str) -> String {
        CellGeometry::parse(formula)
            .unwrap()
            .postfix()
            .iter()
            .join(" ")
    }

    #[rstest]
    #[case("1 2 3", "1 2 & 3 &")]
    #[case("#1", "1 #")]
    #[case("-1", "-1")]
    #[case("1 : 2 3", "1 2 3 & :")]
    #[case("(1 : 2) 3", "1 2 : 3 &")]
    #[case("#(1 : 2) -3", "1 2 : # -3 &")]
    #[case("#1 2", "1 # 2 &")]
    #[case("1:2:3", "1 2 : 3 :")]
    #[case("((1))", "1")]
    #[case("+5 #(-6 7)", "5 -6 7 & # &")]
    #[case("99999999 -99999999", "99999999 -99999999 &")]
    fn valid_formulas(#[case] formula: &str, #[case] expected: &str) {
        assert_eq!(postfix_text(formula), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("(1 2")]
    #[case("1 2)")]
    #[case("1 : : 2")]
    #[case(": 1")]
    #[case("1 :")]
    #[case("()")]
    #[case("#")]
    #[case("1 #")]
    #[case("(1 :)")]
    #[case("1 x 2")]
    fn invalid_formulas(#[case] formula: &str) {
        let error = CellGeometry::parse(formula).unwrap_err();
        assert!(error.is_syntax());
    }

    #[rstest]
    #[case("0")]
    #[case("1 100000000")]
    #[case("-100000000")]
    fn out_of_range_literals(#[case] formula: &str) {
        assert!(CellGeometry::parse(formula).unwrap_err().is_semantic());
    }

    #[test]
    fn formula_text_is_kept() {
        let geometry = CellGeometry::parse("  (1   :-2)  #3 ").unwrap();
        assert_eq!(geometry.formula(), "(1 :-2) #3");
        assert_eq!(geometry.to_string(), "(1 :-2) #3");
    }

    #[test]
    fn empty_formula_reports_too_few_tokens() {
        let error = CellGeometry::parse("").unwrap_err();
        assert!(error.message.contains("too few tokens"));
    }
}
