//! Coordinate transformations for `tr` cards and the cell `trcl` option

// internal modules
use crate::cards::fields::{self, Entry, ToToken, Vector3};
use crate::error::{InpError, Result};
use crate::utils::f;

// standard library
use std::fmt;

/// Displacement, optional rotation matrix, and coordinate system flag
///
/// Written as 3, 12, or 13 entries: the displacement vector, then the nine
/// rotation entries, then `m` which says whether the displacement is the
/// origin of the auxiliary system in the main system (`1`) or the reverse
/// (`-1`). Rotation entries are cosines, or angles in degrees when the card is
/// starred, and any of them may be `j`.
///
/// ```rust
/// # use inpdeck::cards::transform::Transformation;
/// let tokens = ["0", "0", "5"].map(String::from);
/// let tr = Transformation::from_tokens(&tokens, false).unwrap();
/// assert!(tr.rotation.is_none());
/// assert_eq!(tr.to_string(), "0 0 5");
///
/// let tokens = ["0", "0", "0", "90", "0", "90"].map(String::from);
/// assert!(Transformation::from_tokens(&tokens, true).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Transformation {
    pub displacement: Vector3,
    pub rotation: Option<[Entry<f64>; 9]>,
    pub system: Option<i8>,
    /// Rotation given in degrees rather than cosines
    pub degrees: bool,
}

impl Transformation {
    /// A pure translation
    pub fn translation(displacement: Vector3) -> Self {
        Self {
            displacement,
            rotation: None,
            system: None,
            degrees: false,
        }
    }

    pub fn from_tokens(tokens: &[String], degrees: bool) -> Result<Self> {
        let n = tokens.len();
        if !matches!(n, 3 | 12 | 13) {
            return Err(InpError::syntax(f!(
                "transformation needs 3, 12, or 13 entries, found {n}"
            )));
        }

        let displacement = Vector3::from_tokens(&tokens[..3], "displacement")?;

        let rotation = match n {
            3 => None,
            _ => {
                let mut matrix = [Entry::Jump; 9];
                for (entry, token) in matrix.iter_mut().zip(&tokens[3..12]) {
                    *entry = fields::parse::<Entry<f64>>(token, "rotation entry")?
                        .check(|v| check_rotation(*v, degrees))?;
                }
                Some(matrix)
            }
        };

        let system = match tokens.get(12) {
            Some(token) => {
                let m = fields::parse::<i8>(token, "coordinate system flag")?;
                Some(fields::one_of(m, &[1, -1], "coordinate system flag")?)
            }
            None => None,
        };

        Ok(Self {
            displacement,
            rotation,
            system,
            degrees,
        })
    }

    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = self.displacement.tokens();
        if let Some(matrix) = &self.rotation {
            tokens.extend(matrix.iter().map(ToToken::token));
        }
        if let Some(m) = self.system {
            tokens.push(m.to_string());
        }
        tokens
    }
}

impl fmt::Display for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.tokens().join(" "))
    }
}

/// A transformation given either by `tr` card number or inline
///
/// Inline transformations are always written inside parentheses, numbers only
/// where the context needs it (the `fill` option).
#[derive(Debug, Clone, PartialEq)]
pub enum TransformRef {
    Number(u32),
    Inline(Transformation),
}

impl TransformRef {
    /// Build from `n`, `(n)`, or `( entries... )`
    ///
    /// ```rust
    /// # use inpdeck::cards::transform::TransformRef;
    /// let tokens = ["(", "0", "0", "1", ")"].map(String::from);
    /// let inline = TransformRef::from_tokens(&tokens, false).unwrap();
    /// assert_eq!(inline.to_text(false), "(0 0 1)");
    ///
    /// let number = TransformRef::from_tokens(&["3".to_string()], false).unwrap();
    /// assert_eq!(number, TransformRef::Number(3));
    /// assert_eq!(number.to_text(true), "(3)");
    /// ```
    pub fn from_tokens(tokens: &[String], degrees: bool) -> Result<Self> {
        let inner = match tokens.first().map(String::as_str) {
            Some("(") => match tokens.last().map(String::as_str) {
                Some(")") if tokens.len() > 1 => &tokens[1..tokens.len() - 1],
                _ => return Err(InpError::syntax("unclosed \"(\" in transformation")),
            },
            _ => tokens,
        };

        match inner {
            [] => Err(InpError::too_few("transformation")),
            [number] => {
                let n = fields::parse::<u32>(number, "transformation number")?;
                fields::in_range(n, 1..=999, "transformation number").map(Self::Number)
            }
            _ => Transformation::from_tokens(inner, degrees).map(Self::Inline),
        }
    }

    pub fn to_text(&self, parenthesise_number: bool) -> String {
        match self {
            Self::Number(n) if parenthesise_number => f!("({n})"),
            Self::Number(n) => n.to_string(),
            Self::Inline(tr) => f!("({tr})"),
        }
    }

    /// True when an inline transformation is given in degrees
    pub fn is_degrees(&self) -> bool {
        matches!(self, Self::Inline(tr) if tr.degrees)
    }
}

fn check_rotation(value: f64, degrees: bool) -> Result<()> {
    match degrees {
        true => fields::in_range(value, 0.0..=180.0, "rotation angle").map(|_| ()),
        false => fields::in_range(value, -1.0..=1.0, "rotation cosine").map(|_| ()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn full_matrix_with_system() {
        let tr = Transformation::from_tokens(&tokens("1 2 3 1 0 0 0 1 0 0 0 1 -1"), false).unwrap();
        assert_eq!(tr.system, Some(-1));
        assert_eq!(tr.to_string(), "1 2 3 1 0 0 0 1 0 0 0 1 -1");
    }

    #[test]
    fn jumps_in_the_matrix() {
        let tr = Transformation::from_tokens(&tokens("0 0 0 j j j 0 1 0 j j j"), false).unwrap();
        let matrix = tr.rotation.unwrap();
        assert!(matrix[0].is_jump());
        assert_eq!(matrix[4], Entry::Value(1.0));
    }

    #[test]
    fn domain_checks() {
        let bad_cosine = tokens("0 0 0 2 0 0 0 1 0 0 0 1");
        assert!(Transformation::from_tokens(&bad_cosine, false).unwrap_err().is_semantic());

        let angles = tokens("0 0 0 90 0 90 180 90 90 90 90 0");
        assert!(Transformation::from_tokens(&angles, true).is_ok());

        let bad_system = tokens("0 0 0 1 0 0 0 1 0 0 0 1 2");
        assert!(Transformation::from_tokens(&bad_system, false).unwrap_err().is_semantic());
    }

    #[test]
    fn wrong_entry_count() {
        assert!(Transformation::from_tokens(&tokens("0 0"), false).unwrap_err().is_syntax());
    }
}
