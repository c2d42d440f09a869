//! Surface cards
//!
//! ```text
//! [*|+]j [n] a list
//! ```
//!
//! `*` makes a reflecting surface and `+` a white boundary. The optional `n`
//! is a transformation number when positive, or the number of the matching
//! periodic surface when negative.

// internal modules
use crate::cards::fields::{self, ToToken, MAX_NUMBER};
use crate::cards::options::token_enum;
use crate::cards::Variant;
use crate::error::{InpError, Result};
use crate::parsers;
use crate::tokens::TokenDeque;
use crate::utils::f;

// standard library
use std::fmt;

// external crates
use itertools::Itertools;
use log::trace;

/// A parsed surface card
///
/// ```rust
/// # use inpdeck::cards::{Surface, Variant};
/// # use inpdeck::cards::surface::ShapeKind;
/// let surface = Surface::parse("*2 1 pz -5").unwrap();
/// assert!(surface.is_reflecting());
/// assert_eq!(surface.transform, Some(1));
/// assert_eq!(surface.shape.kind, ShapeKind::PlaneZ);
/// assert_eq!(surface.to_text(), "*2 1 pz -5");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub number: u32,
    /// `*` for reflecting, `+` for white boundary
    pub modifier: Option<char>,
    /// Transformation number, or negative periodic surface number
    pub transform: Option<i64>,
    pub shape: Shape,
}

impl Surface {
    pub fn is_reflecting(&self) -> bool {
        self.modifier == Some('*')
    }

    pub fn is_white(&self) -> bool {
        self.modifier == Some('+')
    }

    /// Surface this one is periodic with, if any
    pub fn periodic(&self) -> Option<u32> {
        match self.transform {
            Some(n) if n < 0 => u32::try_from(-n).ok(),
            _ => None,
        }
    }

    fn parse_number(token: &str) -> Result<(Option<char>, u32)> {
        let (modifier, digits) = match token.chars().next() {
            Some(c @ ('*' | '+')) => (Some(c), &token[1..]),
            _ => (None, token),
        };
        let number = fields::parse::<u32>(digits, "surface number")?;
        let number = fields::in_range(number, 1..=MAX_NUMBER, "surface number")?;
        Ok((modifier, number))
    }

    fn parse_transform(token: &str) -> Result<i64> {
        let n = fields::parse::<i64>(token, "surface transformation")?;
        match n {
            1..=999 => Ok(n),
            n if n < 0 && -n <= MAX_NUMBER as i64 => Ok(n),
            _ => Err(InpError::semantic(f!(
                "surface transformation {n} must be in 1..=999 or a negative surface number"
            ))),
        }
    }
}

impl Variant for Surface {
    type Id = u32;

    fn parse(code: &str) -> Result<Self> {
        let mut tokens = TokenDeque::from(code);

        let first = tokens.pop_front_or(|| InpError::too_few("surface number"))?;
        let (modifier, number) = Self::parse_number(&first)?;
        trace!("[Surface] {number}");

        let transform = match tokens.front() {
            Some(t) if parsers::parse_integer(t).is_some() => Some(Self::parse_transform(&tokens.pop_front()?)?),
            _ => None,
        };

        let shape = Shape::parse(&mut tokens).map_err(|e| e.within(&f!("surface {number}")))?;

        if transform.is_some_and(|n| n < 0) && (shape.kind.is_macrobody() || modifier.is_some()) {
            return Err(InpError::semantic(f!(
                "periodic surface {number} must be a plain surface"
            )));
        }

        Ok(Self {
            number,
            modifier,
            transform,
            shape,
        })
    }

    fn id(&self) -> u32 {
        self.number
    }

    fn to_text(&self) -> String {
        let mut text = String::new();
        if let Some(m) = self.modifier {
            text.push(m);
        }
        text += &self.number.to_string();
        if let Some(n) = self.transform {
            text += &f!(" {n}");
        }
        f!("{text} {}", self.shape)
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

token_enum! {
    /// Every surface mnemonic and macrobody
    pub enum ShapeKind {
        Plane => "p",
        PlaneX => "px",
        PlaneY => "py",
        PlaneZ => "pz",
        SphereOrigin => "so",
        Sphere => "s",
        SphereX => "sx",
        SphereY => "sy",
        SphereZ => "sz",
        CylinderParX => "c/x",
        CylinderParY => "c/y",
        CylinderParZ => "c/z",
        CylinderX => "cx",
        CylinderY => "cy",
        CylinderZ => "cz",
        ConeParX => "k/x",
        ConeParY => "k/y",
        ConeParZ => "k/z",
        ConeX => "kx",
        ConeY => "ky",
        ConeZ => "kz",
        Quadric => "sq",
        GeneralQuadric => "gq",
        TorusX => "tx",
        TorusY => "ty",
        TorusZ => "tz",
        PointsX => "x",
        PointsY => "y",
        PointsZ => "z",
        Box => "box",
        Rpp => "rpp",
        Sph => "sph",
        Rcc => "rcc",
        Rhp => "rhp",
        Hex => "hex",
        Rec => "rec",
        Trc => "trc",
        Ell => "ell",
        Wed => "wed",
        Arb => "arb",
    }
}

impl ShapeKind {
    /// Allowed numbers of coefficients
    pub fn arity(&self) -> &'static [usize] {
        use ShapeKind::*;
        match self {
            Plane => &[4, 9],
            PlaneX | PlaneY | PlaneZ | SphereOrigin => &[1],
            CylinderX | CylinderY | CylinderZ => &[1],
            SphereX | SphereY | SphereZ => &[2],
            ConeX | ConeY | ConeZ => &[2, 3],
            CylinderParX | CylinderParY | CylinderParZ => &[3],
            Sphere | Sph => &[4],
            ConeParX | ConeParY | ConeParZ => &[4, 5],
            PointsX | PointsY | PointsZ => &[2, 4, 6],
            TorusX | TorusY | TorusZ | Rpp => &[6],
            Rcc | Ell => &[7],
            Trc => &[8],
            Box => &[9, 12],
            Rhp | Hex => &[9, 15],
            Rec => &[10, 12],
            Quadric | GeneralQuadric => &[10],
            Wed => &[12],
            Arb => &[30],
        }
    }

    pub fn is_macrobody(&self) -> bool {
        use ShapeKind::*;
        matches!(
            self,
            Box | Rpp | Sph | Rcc | Rhp | Hex | Rec | Trc | Ell | Wed | Arb
        )
    }
}

/// Surface type and its coefficients
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub kind: ShapeKind,
    pub coefficients: Vec<f64>,
}

impl Shape {
    /// Build from a mnemonic and coefficients, checking count and domain
    ///
    /// ```rust
    /// # use inpdeck::cards::surface::{Shape, ShapeKind};
    /// assert!(Shape::new(ShapeKind::SphereOrigin, vec![5.0]).is_ok());
    /// assert!(Shape::new(ShapeKind::SphereOrigin, vec![-5.0]).is_err());
    /// assert!(Shape::new(ShapeKind::Rcc, vec![0.0; 4]).is_err());
    /// ```
    pub fn new(kind: ShapeKind, coefficients: Vec<f64>) -> Result<Self> {
        let arity = kind.arity();
        let n = coefficients.len();
        if !arity.contains(&n) {
            let expected = arity.iter().join(" or ");
            return Err(InpError::syntax(f!(
                "{kind} needs {expected} coefficients, found {n}"
            )));
        }

        let shape = Self { kind, coefficients };
        shape.check()?;
        Ok(shape)
    }

    fn parse(tokens: &mut TokenDeque) -> Result<Self> {
        let mnemonic = tokens.pop_front_or(|| InpError::too_few("surface mnemonic"))?;
        let kind = ShapeKind::from_name(&mnemonic)
            .ok_or_else(|| InpError::unrecognised("surface mnemonic", &mnemonic))?;
        let coefficients = fields::rest_required::<f64>(tokens, &f!("{kind} coefficients"))?;
        Self::new(kind, coefficients)
    }

    /// Domain checks on the coefficients of each surface type
    fn check(&self) -> Result<()> {
        use ShapeKind::*;
        let c = &self.coefficients;
        let name = self.kind.as_str();
        let positive = |i: usize, what: &str| fields::positive(c[i], &f!("{name} {what}")).map(|_| ());

        match self.kind {
            Plane if c.len() == 4 => {
                if c[..3].iter().all(|v| *v == 0.0) {
                    return Err(InpError::semantic("plane normal must not be zero"));
                }
            }
            Plane => {
                let a = [c[3] - c[0], c[4] - c[1], c[5] - c[2]];
                let b = [c[6] - c[0], c[7] - c[1], c[8] - c[2]];
                if cross(a, b).iter().all(|v| *v == 0.0) {
                    return Err(InpError::semantic("plane points must not be collinear"));
                }
            }
            SphereOrigin | CylinderX | CylinderY | CylinderZ => positive(0, "radius")?,
            SphereX | SphereY | SphereZ => positive(1, "radius")?,
            Sphere | CylinderParX | CylinderParY | CylinderParZ => positive(c.len() - 1, "radius")?,
            ConeX | ConeY | ConeZ => {
                positive(1, "t squared")?;
                sheet(c.get(2), name)?;
            }
            ConeParX | ConeParY | ConeParZ => {
                positive(3, "t squared")?;
                sheet(c.get(4), name)?;
            }
            TorusX | TorusY | TorusZ => {
                positive(4, "minor radius")?;
                positive(5, "minor radius")?;
            }
            PointsX | PointsY | PointsZ => {
                if c.len() == 2 && c[1] == 0.0 {
                    return Err(InpError::semantic(f!("{name} single point must be off axis")));
                }
            }
            Quadric | GeneralQuadric => {
                if c[..c.len() - 1].iter().all(|v| *v == 0.0) {
                    return Err(InpError::semantic(f!("{name} has no nonzero coefficient")));
                }
            }
            Box => {
                for (i, vector) in c[3..].chunks(3).enumerate() {
                    nonzero(vector, &f!("box vector {}", i + 1))?;
                }
            }
            Rpp => {
                for (axis, pair) in ["x", "y", "z"].iter().zip(c.chunks(2)) {
                    if pair[1] <= pair[0] {
                        return Err(InpError::semantic(f!(
                            "rpp {axis} bounds must increase, found {} {}",
                            pair[0].token(),
                            pair[1].token()
                        )));
                    }
                }
            }
            Sph => positive(3, "radius")?,
            Rcc => {
                nonzero(&c[3..6], "rcc height vector")?;
                positive(6, "radius")?;
            }
            Rhp | Hex => {
                nonzero(&c[3..6], &f!("{name} height vector"))?;
                nonzero(&c[6..9], &f!("{name} facet vector"))?;
            }
            Rec => {
                nonzero(&c[3..6], "rec height vector")?;
                nonzero(&c[6..9], "rec major axis")?;
                positive(9, "minor radius")?;
            }
            Trc => {
                nonzero(&c[3..6], "trc height vector")?;
                fields::non_negative(c[6], "trc base radius")?;
                fields::non_negative(c[7], "trc top radius")?;
                if c[6] == c[7] {
                    return Err(InpError::semantic("trc radii must differ"));
                }
            }
            Ell => {
                if c[6] == 0.0 {
                    return Err(InpError::semantic("ell radius must be nonzero"));
                }
            }
            Wed => {
                for (i, vector) in c[3..].chunks(3).enumerate() {
                    nonzero(vector, &f!("wed vector {}", i + 1))?;
                }
            }
            PlaneX | PlaneY | PlaneZ | Arb => {}
        }
        Ok(())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.kind, fields::join(&self.coefficients))
    }
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn nonzero(vector: &[f64], field: &str) -> Result<()> {
    match vector.iter().all(|v| *v == 0.0) {
        true => Err(InpError::semantic(f!("{field} must not be zero"))),
        false => Ok(()),
    }
}

/// Cone sheet selector, `+1` or `-1` when given
fn sheet(value: Option<&f64>, name: &str) -> Result<()> {
    match value {
        Some(v) if v.abs() != 1.0 => Err(InpError::semantic(f!(
            "{name} sheet must be 1 or -1, found {}",
            v.token()
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1 so 10")]
    #[case("+2 px -3.5")]
    #[case("3 -1 py 0")]
    #[case("4 c/z 1 2 3")]
    #[case("5 k/y 0 0 0 0.25 -1")]
    #[case("6 gq 1 1 1 0 0 0 0 0 0 -4")]
    #[case("7 tz 0 0 0 5 1 1")]
    #[case("8 rpp -1 1 -2 2 -3 3")]
    #[case("9 rcc 0 0 0 0 0 10 2")]
    #[case("10 box 0 0 0 1 0 0 0 1 0 0 0 1")]
    #[case("11 p 0 0 0 1 0 0 0 1 0")]
    #[case("12 x 1 2 3 4")]
    #[case("13 2 trc 0 0 0 0 0 5 2 1")]
    #[case("14 pz -1e-5")]
    fn canonical_surfaces(#[case] text: &str) {
        let surface = Surface::parse(text).unwrap();
        assert_eq!(surface.to_text(), text);
    }

    #[test]
    fn fields() {
        let surface = Surface::parse("+20 -10 pz 1e3").unwrap();
        assert!(surface.is_white());
        assert_eq!(surface.periodic(), Some(10));
        assert_eq!(surface.shape.coefficients, vec![1000.0]);
        assert_eq!(surface.to_text(), "+20 -10 pz 1000");
    }

    #[rstest]
    #[case("1 so")]
    #[case("1 so 1 2")]
    #[case("1 p 1 2 3 4 5 6")]
    #[case("1 bogus 1")]
    #[case("1")]
    #[case("1 so x")]
    #[case("a so 1")]
    fn syntax_errors(#[case] text: &str) {
        let error = Surface::parse(text).unwrap_err();
        assert!(error.is_syntax(), "{error}");
    }

    #[rstest]
    #[case("0 so 1")]
    #[case("1 so 0")]
    #[case("1 1000 so 1")]
    #[case("1 p 0 0 0 4")]
    #[case("1 p 0 0 0 1 1 1 2 2 2")]
    #[case("1 kx 0 1 2")]
    #[case("1 rpp 1 -1 0 1 0 1")]
    #[case("1 rcc 0 0 0 0 0 0 1")]
    #[case("1 trc 0 0 0 0 0 1 2 2")]
    #[case("*1 -2 px 0")]
    fn semantic_errors(#[case] text: &str) {
        let error = Surface::parse(text).unwrap_err();
        assert!(error.is_semantic(), "{error}");
    }

    #[test]
    fn shape_table() {
        assert!(ShapeKind::Arb.is_macrobody());
        assert!(!ShapeKind::GeneralQuadric.is_macrobody());
        assert_eq!(ShapeKind::from_name("c/x"), Some(ShapeKind::CylinderParX));
    }
}
