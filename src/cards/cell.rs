//! Cell cards
//!
//! ```text
//! j m d geom params
//! j like n but params
//! ```
//!
//! A cell has a number, a material (`0` for void), a density when the
//! material is not void, a geometry formula, and any number of `keyword=value`
//! options. The `like n but` form copies cell `n` and overrides some options,
//! including the material and density through `mat` and `rho`.

// internal modules
use crate::cards::fields::{self, ToToken, MAX_NUMBER};
use crate::cards::options::{self, keyword_enum, Allowed, Keyword, KeywordOption, ValueKind};
use crate::cards::transform::TransformRef;
use crate::cards::Variant;
use crate::error::{InpError, Result};
use crate::geometry::CellGeometry;
use crate::parsers;
use crate::tokens::TokenDeque;
use crate::utils::f;

// standard library
use std::fmt;

// external crates
use itertools::Itertools;
use log::trace;

/// A parsed cell card
///
/// ```rust
/// # use inpdeck::cards::{Cell, Variant};
/// let cell = Cell::parse("1 0 -1 imp:n=1").unwrap();
/// assert_eq!(cell.number, 1);
/// assert_eq!(cell.material(), Some(0));
/// assert_eq!(cell.density(), None);
/// assert_eq!(cell.geometry().unwrap().formula(), "-1");
/// assert_eq!(cell.options[0].key(), "imp:n");
/// assert_eq!(cell.to_text(), "1 0 -1 imp:n=1");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub number: u32,
    pub form: CellForm,
    pub options: Vec<KeywordOption<CellKeyword>>,
}

/// The two ways of writing the body of a cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellForm {
    /// `m d geom`, with the density only present for non-void materials
    Explicit {
        material: u32,
        density: Option<f64>,
        geometry: CellGeometry,
    },
    /// `like n but`
    Like { template: u32 },
}

impl Cell {
    /// Material number, if given explicitly or through `mat`
    pub fn material(&self) -> Option<u32> {
        match &self.form {
            CellForm::Explicit { material, .. } => Some(*material),
            CellForm::Like { .. } => self
                .option(CellKeyword::Mat)
                .and_then(|o| o.value.as_integer())
                .and_then(|m| u32::try_from(m).ok()),
        }
    }

    /// Density, if given explicitly or through `rho`
    pub fn density(&self) -> Option<f64> {
        match &self.form {
            CellForm::Explicit { density, .. } => *density,
            CellForm::Like { .. } => self.option(CellKeyword::Rho).and_then(|o| o.value.as_real()),
        }
    }

    pub fn geometry(&self) -> Option<&CellGeometry> {
        match &self.form {
            CellForm::Explicit { geometry, .. } => Some(geometry),
            CellForm::Like { .. } => None,
        }
    }

    /// First option using the keyword
    pub fn option(&self, keyword: CellKeyword) -> Option<&KeywordOption<CellKeyword>> {
        options::find(&self.options, keyword)
    }

    pub fn is_void(&self) -> bool {
        self.material() == Some(0)
    }

    fn parse_explicit(tokens: &mut TokenDeque) -> Result<CellForm> {
        let material = fields::pop::<u32>(tokens, "material number")?;
        let material = fields::in_range(material, 0..=MAX_NUMBER, "material number")?;

        let density = match material {
            0 => None,
            _ => {
                let density = fields::pop::<f64>(tokens, "density")?;
                if density == 0.0 {
                    return Err(InpError::semantic("density of a non-void cell must be nonzero"));
                }
                Some(density)
            }
        };

        // the formula runs up to the first token that is not geometry
        let mut formula: Vec<String> = Vec::new();
        while let Some(token) = tokens.front() {
            if !parsers::is_geometry_text(token) {
                break;
            }
            formula.push(tokens.pop_front()?);
        }
        let geometry = CellGeometry::parse(&formula.join(" "))?;

        Ok(CellForm::Explicit {
            material,
            density,
            geometry,
        })
    }

    fn parse_like(tokens: &mut TokenDeque) -> Result<CellForm> {
        let template = fields::pop::<u32>(tokens, "cell to copy")?;
        let template = fields::in_range(template, 1..=MAX_NUMBER, "cell to copy")?;
        if !tokens.pop_if("but") {
            return Err(InpError::syntax("expected \"but\" after \"like n\""));
        }
        Ok(CellForm::Like { template })
    }
}

impl Variant for Cell {
    type Id = u32;

    fn parse(code: &str) -> Result<Self> {
        let mut tokens = TokenDeque::from(code);

        let number = fields::pop::<u32>(&mut tokens, "cell number")?;
        let number = fields::in_range(number, 1..=MAX_NUMBER, "cell number")?;
        trace!("[Cell] {number}");

        let form = match tokens.pop_if("like") {
            true => Self::parse_like(&mut tokens)?,
            false => Self::parse_explicit(&mut tokens)?,
        };

        let options = options::scan::<CellKeyword>(&mut tokens).map_err(|e| e.within(&f!("cell {number}")))?;

        if let CellForm::Explicit { .. } = form {
            if let Some(o) = options
                .iter()
                .find(|o| matches!(o.keyword, CellKeyword::Mat | CellKeyword::Rho))
            {
                return Err(InpError::semantic(f!(
                    "{} is only allowed in the \"like n but\" form",
                    o.keyword
                )));
            }
        }

        Ok(Self {
            number,
            form,
            options,
        })
    }

    fn id(&self) -> u32 {
        self.number
    }

    fn to_text(&self) -> String {
        let mut tokens = vec![self.number.to_string()];

        match &self.form {
            CellForm::Explicit {
                material,
                density,
                geometry,
            } => {
                tokens.push(material.to_string());
                if let Some(d) = density {
                    tokens.push(d.token());
                }
                tokens.push(geometry.formula().to_string());
            }
            CellForm::Like { template } => tokens.push(f!("like {template} but")),
        }

        tokens.extend(options::texts(&self.options));
        tokens.join(" ")
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

keyword_enum! {
    /// Options that may follow the geometry of a cell
    pub enum CellKeyword {
        Imp => "imp", Real;
        Vol => "vol", Real;
        Pwt => "pwt", Real;
        Ext => "ext", Text;
        Fcl => "fcl", Real;
        Wwn => "wwn", Real;
        Dxc => "dxc", Real;
        Nonu => "nonu", Integer;
        Pd => "pd", Real;
        Tmp => "tmp", Real;
        U => "u", Integer;
        Trcl => "trcl", Transform;
        Lat => "lat", Integer;
        Fill => "fill", Fill;
        Elpt => "elpt", Real;
        Cosy => "cosy", Integer;
        Bflcl => "bflcl", Integer;
        Unc => "unc", Integer;
        Mat => "mat", Integer;
        Rho => "rho", Real;
    }
}

impl Keyword for CellKeyword {
    fn resolve(name: &str) -> Option<Self> {
        Self::from_name(name)
    }

    fn name(&self) -> &'static str {
        self.as_str()
    }

    fn kind(&self) -> ValueKind {
        self.value_kind()
    }

    fn suffix(&self) -> Allowed {
        match self {
            Self::Pd => Allowed::Required,
            Self::Wwn | Self::Dxc | Self::Tmp => Allowed::Optional,
            _ => Allowed::Never,
        }
    }

    fn designator(&self) -> Allowed {
        match self {
            Self::Imp | Self::Ext | Self::Fcl | Self::Wwn | Self::Dxc | Self::Elpt | Self::Unc => {
                Allowed::Required
            }
            _ => Allowed::Never,
        }
    }

    fn prefixes(&self) -> &'static [char] {
        match self {
            Self::Trcl | Self::Fill => &['*'],
            _ => &[],
        }
    }

    fn check(&self, option: &KeywordOption<Self>) -> Result<()> {
        let value = &option.value;
        let real = || value.as_real().unwrap_or_default();
        let integer = || value.as_integer().unwrap_or_default();
        let name = self.as_str();

        match self {
            Self::Imp | Self::Vol | Self::Pd | Self::Elpt | Self::Tmp => {
                fields::non_negative(real(), name)?;
            }
            Self::Fcl => {
                fields::in_range(real(), -1.0..=1.0, name)?;
            }
            Self::Dxc => {
                fields::in_range(real(), 0.0..=1.0, name)?;
            }
            Self::Wwn => {
                let w = real();
                if w < 0.0 && w != -1.0 {
                    return Err(InpError::semantic(f!("{name} must be -1 or not negative")));
                }
            }
            Self::Nonu => {
                fields::in_range(integer(), 0..=2, name)?;
            }
            Self::Lat => {
                fields::one_of(integer(), &[1, 2], name)?;
            }
            Self::Unc => {
                fields::one_of(integer(), &[0, 1], name)?;
            }
            Self::U => {
                let max = MAX_NUMBER as i64;
                fields::in_range(integer(), -max..=max, name)?;
            }
            Self::Mat => {
                fields::in_range(integer(), 0..=MAX_NUMBER as i64, name)?;
            }
            Self::Bflcl | Self::Cosy => {
                fields::in_range(integer(), 0..=i64::MAX, name)?;
            }
            Self::Rho => {
                if real() == 0.0 {
                    return Err(InpError::semantic("rho must be nonzero"));
                }
            }
            Self::Ext => {
                let text = value.as_text().unwrap_or_default();
                check_exponential(text)?;
            }
            Self::Pwt | Self::Trcl | Self::Fill => {}
        }
        Ok(())
    }
}

/// Exponential transform entry: `0`, `s`, `-s`, a stretch `p`, with `vN` or `xN` directions
pub fn check_exponential(text: &str) -> Result<()> {
    let invalid = || InpError::invalid_token("exponential transform", text);

    let (stretch, direction) = match text.find(['v', 'x', 'y', 'z']) {
        Some(i) => text.split_at(i),
        None => (text, ""),
    };

    match stretch.trim_start_matches('-') {
        "s" => (),
        s => {
            let p = parsers::parse_real(s).ok_or_else(invalid)?;
            fields::in_range(p, 0.0..=1.0, "exponential transform stretch")?;
        }
    }

    match direction {
        "" | "x" | "y" | "z" => Ok(()),
        d if d.starts_with('v') && d[1..].parse::<u32>().is_ok() => Ok(()),
        _ => Err(invalid()),
    }
}

/// Universes filling a cell
#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    /// `fill=u` or `fill=u (tr)`
    Universe {
        universe: u32,
        transform: Option<TransformRef>,
    },
    /// `fill=i1:i2 j1:j2 k1:k2 u u u ...` for lattice cells
    Array {
        ranges: [(i64, i64); 3],
        entries: Vec<FillEntry>,
    },
}

/// One lattice element of a fill array
#[derive(Debug, Clone, PartialEq)]
pub struct FillEntry {
    pub universe: u32,
    pub transform: Option<TransformRef>,
}

impl Fill {
    /// Read a fill value off the front of the option pieces
    ///
    /// Lattice arrays take exactly one entry per element of the ranges.
    pub fn take(pieces: &mut TokenDeque, degrees: bool) -> Result<Self> {
        let first = pieces.pop_front_or(|| InpError::too_few("fill universe"))?;

        if !first.contains(':') {
            let universe = Self::universe(&first)?;
            let transform = Self::transform(pieces, degrees)?;
            return Ok(Self::Universe {
                universe,
                transform,
            });
        }

        let ranges = [
            Self::range(&first)?,
            Self::range(&pieces.pop_front_or(|| InpError::too_few("fill j range"))?)?,
            Self::range(&pieces.pop_front_or(|| InpError::too_few("fill k range"))?)?,
        ];

        // every element needs at least one token, so more than are left is an error
        let count = ranges
            .iter()
            .try_fold(1_usize, |count, (lo, hi)| {
                let width = hi.checked_sub(*lo)?.checked_add(1)?;
                count.checked_mul(usize::try_from(width).ok()?)
            })
            .filter(|count| *count <= pieces.len())
            .ok_or_else(|| InpError::syntax("too few fill array entries"))?;

        let mut entries = Vec::new();
        for _ in 0..count {
            let token = pieces.pop_front_or(|| {
                InpError::too_few(&f!("{count} fill array entries, found {}", entries.len()))
            })?;
            entries.push(FillEntry {
                universe: Self::universe(&token)?,
                transform: Self::transform(pieces, degrees)?,
            });
        }

        Ok(Self::Array { ranges, entries })
    }

    fn universe(token: &str) -> Result<u32> {
        let u = fields::parse::<u32>(token, "fill universe")?;
        fields::in_range(u, 0..=MAX_NUMBER, "fill universe")
    }

    fn range(token: &str) -> Result<(i64, i64)> {
        let (lo, hi) = token
            .split_once(':')
            .ok_or_else(|| InpError::invalid_token("fill index range", token))?;
        let lo = fields::parse::<i64>(lo, "fill index range")?;
        let hi = fields::parse::<i64>(hi, "fill index range")?;
        if hi < lo {
            return Err(InpError::semantic(f!("fill index range {lo}:{hi} is reversed")));
        }
        Ok((lo, hi))
    }

    fn transform(pieces: &mut TokenDeque, degrees: bool) -> Result<Option<TransformRef>> {
        match pieces.front() {
            Some("(") => {
                let group = options::take_group(pieces, "fill")?;
                TransformRef::from_tokens(&group, degrees).map(Some)
            }
            _ => Ok(None),
        }
    }
}

impl fmt::Display for Fill {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let entry = |universe: &u32, transform: &Option<TransformRef>| match transform {
            Some(tr) => f!("{universe} {}", tr.to_text(true)),
            None => universe.to_string(),
        };

        match self {
            Self::Universe {
                universe,
                transform,
            } => write!(f, "{}", entry(universe, transform)),
            Self::Array { ranges, entries } => {
                let ranges = ranges.iter().map(|(lo, hi)| f!("{lo}:{hi}")).join(" ");
                let entries = entries
                    .iter()
                    .map(|e| entry(&e.universe, &e.transform))
                    .join(" ");
                write!(f, "{ranges} {entries}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::options::OptionValue;
    use crate::particle::Particle;
    use rstest::rstest;

    #[test]
    fn void_cell() {
        let cell = Cell::parse("1 0 -1 imp:n=1").unwrap();
        assert_eq!(cell.id(), 1);
        assert!(cell.is_void());
        let imp = cell.option(CellKeyword::Imp).unwrap();
        assert!(imp.designator.as_ref().unwrap().contains(Particle::Neutron));
        assert_eq!(imp.value, OptionValue::Real(1.0));
    }

    #[test]
    fn material_cell() {
        let cell = Cell::parse("2 3 -7.86 -2 1 #(3 : -4) imp:n,p=2 vol=10").unwrap();
        assert_eq!(cell.material(), Some(3));
        assert_eq!(cell.density(), Some(-7.86));
        assert_eq!(cell.geometry().unwrap().formula(), "-2 1 #(3 : -4)");
        assert_eq!(cell.options.len(), 2);
        assert_eq!(cell.to_text(), "2 3 -7.86 -2 1 #(3 : -4) imp:n,p=2 vol=10");
    }

    #[test]
    fn like_but() {
        let cell = Cell::parse("5 like 2 but mat=4 rho=-1.2 trcl=1").unwrap();
        assert_eq!(cell.form, CellForm::Like { template: 2 });
        assert_eq!(cell.material(), Some(4));
        assert_eq!(cell.density(), Some(-1.2));
        assert!(cell.geometry().is_none());
        assert_eq!(cell.to_text(), "5 like 2 but mat=4 rho=-1.2 trcl=1");
    }

    #[test]
    fn universes_and_fills() {
        let cell = Cell::parse("10 0 -10 u=2 lat=1 fill=0:1 0:0 0:0 3 4 (1)").unwrap();
        let fill = cell.option(CellKeyword::Fill).unwrap();
        match &fill.value {
            OptionValue::Fill(Fill::Array { ranges, entries }) => {
                assert_eq!(ranges[0], (0, 1));
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[1].transform, Some(TransformRef::Number(1)));
            }
            other => panic!("unexpected fill {other:?}"),
        }
        assert_eq!(
            cell.to_text(),
            "10 0 -10 u=2 lat=1 fill=0:1 0:0 0:0 3 4 (1)"
        );

        let cell = Cell::parse("11 0 -11 *fill=7 (0 0 0 0 90 90 90 0 90 90 90 0)").unwrap();
        assert_eq!(
            cell.to_text(),
            "11 0 -11 *fill=7 (0 0 0 0 90 90 90 0 90 90 90 0)"
        );
    }

    #[test]
    fn inline_transformation() {
        let cell = Cell::parse("3 0 -3 trcl=(1 0 0)").unwrap();
        assert_eq!(cell.to_text(), "3 0 -3 trcl=(1 0 0)");
    }

    #[rstest]
    #[case("1 1 -1")]
    #[case("1 0")]
    #[case("1 0 -1 bogus=1")]
    #[case("1 like 2 mat=1")]
    #[case("1 0 (1 imp:n=1")]
    #[case("1 0 -1 fill=0:1 0:0 0:0 3")]
    #[case("1 0 -1 lat=1 fill=0:99999999999 0:99999999999 0:99999999999 1")]
    #[case("1 0 -1 lat=1 fill=-9223372036854775808:9223372036854775807 0:0 0:0 1")]
    #[case("1 0 -1 lat=1 fill=0:999 0:999 0:0 1 imp:n=1")]
    #[case("x 0 -1")]
    fn syntax_errors(#[case] text: &str) {
        let error = Cell::parse(text).unwrap_err();
        assert!(error.is_syntax(), "{error}");
    }

    #[rstest]
    #[case("0 0 -1")]
    #[case("100000000 0 -1")]
    #[case("1 1 0 -1")]
    #[case("1 0 -1 imp=1")]
    #[case("1 0 -1 imp:n=-1")]
    #[case("1 0 -1 lat=3")]
    #[case("1 0 -1 mat=2")]
    #[case("1 0 -1 fcl:n=2")]
    #[case("1 0 -1 pd=1")]
    #[case("1 0 -1 ext:n=2v1")]
    #[case("1 0 -1 trcl=1000")]
    #[case("1 0 -1 fill=0:-1 0:0 0:0")]
    fn semantic_errors(#[case] text: &str) {
        let error = Cell::parse(text).unwrap_err();
        assert!(error.is_semantic(), "{error}");
    }

    #[rstest]
    #[case("0")]
    #[case("s")]
    #[case("-0.7v2")]
    #[case("0.5x")]
    #[case("sv10")]
    fn exponential_entries(#[case] text: &str) {
        assert!(check_exponential(text).is_ok());
    }
}
