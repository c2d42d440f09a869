//! Material data cards
//!
//! A material `mn` is a list of nuclide and fraction pairs followed by a few
//! keyword options for default libraries. Fractions are atom fractions when
//! positive and weight fractions when negative, and a material may not mix
//! the two.

// internal modules
use crate::cards::data::{self, checks, value_list, DataCard, Form, ListRule, Suffix};
use crate::cards::fields::{self, FromToken, ToToken, MAX_NUMBER};
use crate::cards::options::{self, keyword_enum, Allowed, Keyword, KeywordOption, OptionValue, ValueKind};
use crate::cards::Mnemonic;
use crate::error::{InpError, Result};
use crate::parsers;
use crate::tokens::TokenDeque;
use crate::utils::f;

// standard library
use std::fmt;

/// Nuclide identifier with an optional library extension
///
/// ```rust
/// # use inpdeck::cards::data::material::Zaid;
/// # use inpdeck::cards::fields::FromToken;
/// let zaid = Zaid::from_token("92235.80c", "nuclide").unwrap();
/// assert_eq!(zaid.z(), 92);
/// assert_eq!(zaid.a(), 235);
/// assert_eq!(zaid.to_string(), "92235.80c");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Zaid {
    pub za: u32,
    pub library: Option<String>,
}

impl Zaid {
    pub fn z(&self) -> u32 {
        (self.za / 1000) % 1000
    }

    pub fn a(&self) -> u32 {
        self.za % 1000
    }
}

impl FromToken for Zaid {
    fn from_token(token: &str, field: &str) -> Result<Self> {
        let (za, library) =
            parsers::parse_zaid(token).ok_or_else(|| InpError::invalid_token(field, token))?;
        if za == 0 {
            return Err(InpError::semantic(f!("{field} must not be zero")));
        }
        Ok(Self {
            za,
            library: library.map(str::to_string),
        })
    }
}

impl ToToken for Zaid {
    fn token(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Zaid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.library {
            Some(library) => write!(f, "{}.{library}", self.za),
            None => write!(f, "{}", self.za),
        }
    }
}

/// One nuclide of a material and its fraction
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub zaid: Zaid,
    /// Atom fraction if positive, weight fraction if negative
    pub fraction: f64,
}

keyword_enum! {
    /// Keyword options following the components of an `m` card
    pub enum MaterialKeyword {
        Gas => "gas", Integer;
        Estep => "estep", Integer;
        Hstep => "hstep", Integer;
        Nlib => "nlib", Text;
        Plib => "plib", Text;
        Pnlib => "pnlib", Text;
        Elib => "elib", Text;
        Hlib => "hlib", Text;
        Alib => "alib", Text;
        Slib => "slib", Text;
        Tlib => "tlib", Text;
        Dlib => "dlib", Text;
        Cond => "cond", Real;
        Refi => "refi", Real;
        Refc => "refc", Reals;
        Refs => "refs", Reals;
    }
}

impl Keyword for MaterialKeyword {
    fn resolve(name: &str) -> Option<Self> {
        Self::from_name(name)
    }

    fn name(&self) -> &'static str {
        self.as_str()
    }

    fn kind(&self) -> ValueKind {
        self.value_kind()
    }

    fn check(&self, option: &KeywordOption<Self>) -> Result<()> {
        match (self, &option.value) {
            (Self::Gas, OptionValue::Integer(g)) => fields::one_of(*g, &[0, 1], "gas").map(drop),
            (Self::Estep | Self::Hstep, OptionValue::Integer(n)) => {
                fields::in_range(*n, 0..=i64::MAX, self.as_str()).map(drop)
            }
            (Self::Refc, OptionValue::Reals(v)) if v.len() != 3 => {
                Err(InpError::syntax(f!("refc needs 3 coefficients, found {}", v.len())))
            }
            _ => Ok(()),
        }
    }
}

/// `mn zaid1 fraction1 zaid2 fraction2 ... [keyword=value ...]` material
///
/// ```rust
/// # use inpdeck::cards::{Datum, Variant};
/// let card = Datum::parse("m1 1001.80c 2 8016.80c 1 nlib=80c").unwrap();
/// assert_eq!(card.id(), "m1");
/// assert_eq!(card.to_text(), "m1 1001.80c 2 8016.80c 1 nlib=80c");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub number: u32,
    pub components: Vec<Component>,
    pub options: Vec<KeywordOption<MaterialKeyword>>,
}

impl Material {
    /// True if fractions are given by weight rather than by atom
    pub fn is_by_weight(&self) -> bool {
        self.components.first().map_or(false, |c| c.fraction < 0.0)
    }

    /// Sum of the magnitudes of every fraction, before any normalisation
    pub fn total_fraction(&self) -> f64 {
        self.components.iter().map(|c| c.fraction.abs()).sum()
    }

    pub fn option(&self, keyword: MaterialKeyword) -> Option<&OptionValue> {
        options::find(&self.options, keyword).map(|o| &o.value)
    }

    fn components(pieces: &mut TokenDeque) -> Result<Vec<Component>> {
        let mut components: Vec<Component> = Vec::new();

        while let Some(token) = pieces.front() {
            if options::is_keyword::<MaterialKeyword>(token) {
                break;
            }
            let zaid = fields::pop::<Zaid>(pieces, "nuclide")?;
            let fraction = fields::pop::<f64>(pieces, "nuclide fraction")?;

            if fraction == 0.0 {
                return Err(InpError::semantic(f!("fraction of {zaid} must not be zero")));
            }
            if let Some(first) = components.first() {
                if first.fraction.is_sign_negative() != fraction.is_sign_negative() {
                    return Err(InpError::semantic(
                        "atom and weight fractions cannot be mixed",
                    ));
                }
            }
            components.push(Component { zaid, fraction });
        }

        Ok(components)
    }
}

impl DataCard for Material {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        let number = Form::suffixed(0..=MAX_NUMBER).check(mnemonic)?.unwrap_or_default();

        let mut pieces = options::split_pieces(tokens.take_rest());
        let components = Self::components(&mut pieces)?;
        let options = options::scan::<MaterialKeyword>(&mut pieces)?;

        match (number, components.is_empty()) {
            (0, false) => Err(InpError::semantic("m0 only sets defaults and takes no nuclides")),
            (n, true) if n != 0 => Err(InpError::too_few("nuclide and fraction")),
            _ => Ok(Self {
                number,
                components,
                options,
            }),
        }
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("m").with_suffix(Some(self.number))
    }

    fn fields(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        for c in &self.components {
            tokens.push(c.zaid.token());
            tokens.push(c.fraction.token());
        }
        tokens.extend(options::texts(&self.options));
        tokens
    }
}

value_list! {
    /// `mtn id1 id2 ...` thermal scattering tables of material `n`
    pub Thermal(String) = ListRule {
        form: Form::suffixed(1..=MAX_NUMBER),
        field: "thermal table",
        allow_empty: false,
        check: checks::any,
    };
}

/// `mxn:<pl> zaid1 zaid2 ...` nuclide substitution for other particles
///
/// Each entry replaces the nuclide at the same position of `mn`, and may be
/// a nuclide, `0` to drop it, or `model` to use physics models.
#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    pub mnemonic: Mnemonic,
    pub entries: Vec<String>,
}

impl DataCard for Substitution {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        let form = Form {
            prefixes: &[],
            suffix: Suffix::Required(1..=MAX_NUMBER),
            designator: Allowed::Required,
        };
        form.check(mnemonic)?;

        let entries = tokens.take_rest();
        if entries.is_empty() {
            return Err(InpError::too_few("substitute nuclide"));
        }
        if let Some(bad) = entries
            .iter()
            .find(|e| e.as_str() != "model" && parsers::parse_zaid(e).is_none())
        {
            return Err(InpError::invalid_token("substitute nuclide", bad));
        }

        Ok(Self {
            mnemonic: mnemonic.clone(),
            entries,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        self.mnemonic.clone()
    }

    fn fields(&self) -> Vec<String> {
        self.entries.clone()
    }
}

value_list! {
    /// `otfdb zaid1 zaid2 ...` nuclides with on the fly Doppler broadening
    pub Broadening(Zaid) = ListRule {
        form: Form::PLAIN,
        field: "nuclide",
        allow_empty: false,
        check: checks::any,
    };
}

/// `totnu [no]` total or prompt only fission neutrons
#[derive(Debug, Clone, PartialEq)]
pub struct TotalNu {
    /// `no`, only prompt neutrons are used
    pub prompt_only: bool,
}

impl DataCard for TotalNu {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        let prompt_only = tokens.pop_if("no");
        Ok(Self { prompt_only })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("totnu")
    }

    fn fields(&self) -> Vec<String> {
        match self.prompt_only {
            true => vec!["no".to_string()],
            false => Vec::new(),
        }
    }
}

value_list! {
    /// `nonu a1 a2 ...` fission treatment of every cell
    ///
    /// With no entries, fission is turned off in every cell.
    pub NoFission(i64) = ListRule {
        form: Form::PLAIN,
        field: "fission treatment",
        allow_empty: true,
        check: |v| fields::in_range(*v, 0..=2, "fission treatment").map(drop),
    };
}

/// `awtab zaid1 aw1 zaid2 aw2 ...` atomic weight ratios
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicWeights {
    pub weights: Vec<(Zaid, f64)>,
}

impl DataCard for AtomicWeights {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        if tokens.is_empty() {
            return Err(InpError::too_few("nuclide and atomic weight ratio"));
        }

        let weights = data::pairs::<Zaid, f64>(tokens, "nuclide", "atomic weight ratio")?;
        for (_, awr) in &weights {
            fields::positive(*awr, "atomic weight ratio")?;
        }
        Ok(Self { weights })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("awtab")
    }

    fn fields(&self) -> Vec<String> {
        data::pair_tokens(&self.weights)
    }
}

/// `xsn zaid awr entries...` cross section directory entry
///
/// The directory fields after the atomic weight ratio are kept as written.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSection {
    pub number: u32,
    pub zaid: Zaid,
    pub awr: f64,
    pub entries: Vec<String>,
}

impl DataCard for CrossSection {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        let number = Form::suffixed(1..=MAX_NUMBER).check(mnemonic)?.unwrap_or_default();
        let zaid = fields::pop::<Zaid>(tokens, "nuclide")?;
        let awr = fields::positive(fields::pop(tokens, "atomic weight ratio")?, "atomic weight ratio")?;

        let entries = tokens.take_rest();
        if entries.is_empty() {
            return Err(InpError::too_few("cross section file"));
        }

        Ok(Self {
            number,
            zaid,
            awr,
            entries,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("xs").with_suffix(Some(self.number))
    }

    fn fields(&self) -> Vec<String> {
        let mut tokens = vec![self.zaid.token(), self.awr.token()];
        tokens.extend(self.entries.iter().cloned());
        tokens
    }
}

value_list! {
    /// `void [c1 c2 ...]` cells made void, every cell when empty
    pub Void(i64) = ListRule {
        form: Form::PLAIN,
        field: "cell",
        allow_empty: true,
        check: |v| fields::in_range(*v, 1..=MAX_NUMBER as i64, "cell").map(drop),
    };
}

value_list! {
    /// `drxs [zaid1 zaid2 ...]` nuclides using discrete reaction data
    pub DiscreteReactions(Zaid) = ListRule {
        form: Form::PLAIN,
        field: "nuclide",
        allow_empty: true,
        check: checks::any,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Datum, Variant};
    use rstest::rstest;

    #[rstest]
    #[case("m1 1001.80c 2 8016.80c 1")]
    #[case("m2 26056 -0.7 24052 -0.2 28058 -0.1 gas=0")]
    #[case("m0 nlib=80c plib=04p")]
    #[case("m3 6000 1 cond=-1 refc=1 2 3")]
    #[case("mt1 lwtr.20t")]
    #[case("mx1:p 0 model 26056")]
    #[case("otfdb 92235 92238")]
    #[case("totnu")]
    #[case("totnu no")]
    #[case("nonu")]
    #[case("nonu 0 1 2")]
    #[case("awtab 1001 0.999167 8016 15.857")]
    #[case("xs1 92235.99c 233.025 u235.dat 0 1 1 1000")]
    #[case("void")]
    #[case("void 1 2 3")]
    #[case("drxs")]
    #[case("drxs 1001.80c")]
    fn canonical(#[case] text: &str) {
        assert_eq!(Datum::parse(text).unwrap().to_text(), text);
    }

    #[rstest]
    #[case("m1")]
    #[case("m1 1001.80c")]
    #[case("m1 1001 1 8016 -1")]
    #[case("m1 1001 0")]
    #[case("m1 h 1")]
    #[case("m0 1001 1")]
    #[case("m1 1001 1 gas=2")]
    #[case("m1 1001 1 nlib=80c nlib=70c")]
    #[case("m1:n 1001 1")]
    #[case("mt1")]
    #[case("mx1 0")]
    #[case("mx1:n water")]
    #[case("totnu yes")]
    #[case("nonu 3")]
    #[case("awtab 1001")]
    #[case("awtab 1001 -1")]
    #[case("xs1 92235.99c 233.025")]
    #[case("void 0")]
    fn rejected(#[case] text: &str) {
        assert!(Datum::parse(text).is_err(), "{text}");
    }

    #[test]
    fn fractions() {
        let Datum::Material(m) = Datum::parse("m2 26056 -0.7 24052 -0.3").unwrap() else {
            panic!("not a material");
        };
        assert!(m.is_by_weight());
        assert!((m.total_fraction() - 1.0).abs() < 1e-12);
        assert_eq!(m.components[0].zaid.z(), 26);
        assert!(m.option(MaterialKeyword::Nlib).is_none());
    }
}
