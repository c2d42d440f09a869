//! Data cards and the mnemonic registry
//!
//! Every data card starts with a mnemonic, optionally carrying a `*`/`+`
//! prefix, a numeric suffix, and a particle designator. The bare name selects
//! the card kind through a single static table, and the card kind then
//! decides which of the prefix, suffix, and designator it accepts before
//! reading its own fields.
//!
//! | Group            | Cards                                                   |
//! | ---------------- | ------------------------------------------------------- |
//! | [geometry]       | `vol area u lat fill tr`                                |
//! | [variance]       | `imp esplt tsplt ext vect fcl ww* mesh pd dxt dxc dd bbrem pwt` |
//! | [source]         | `sdef si sp sb ds sc ssw ssr kcode ksrc kopts hsrc`     |
//! | [tally]          | `f fc e t c fq fm de df em tm cm cf sf fs sd fu tf ft fmesh notrn pert` |
//! | [material]       | `m mt mx otfdb totnu nonu awtab xs void drxs`           |
//! | [physics]        | `mode phys tmp thtme cut elpt lc* le* act cosy bfld bflcl` |
//! | [control]        | `nps ctme prdmp lost dbcn print talnp rand stop ptrac histp mplot` |

// internal modules
use crate::cards::fields::{self, Entry, FromToken, ToToken};
use crate::cards::options::Allowed;
use crate::cards::{Mnemonic, Variant};
use crate::error::{InpError, Result};
use crate::tokens::TokenDeque;
use crate::utils::f;

// standard library
use std::fmt;
use std::ops::RangeInclusive;

// external crates
use log::trace;

// files under the data module
pub mod control;
pub mod geometry;
pub mod material;
pub mod physics;
pub mod source;
pub mod tally;
pub mod variance;

/// Field reading and writing for one data card kind
///
/// The mnemonic has already been split off the front of the tokens, and any
/// token left once `from_tokens` returns is reported as "too many fields".
pub trait DataCard: Sized {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self>;

    /// Mnemonic to write the card back out with
    fn mnemonic(&self) -> Mnemonic;

    /// Field tokens following the mnemonic
    fn fields(&self) -> Vec<String>;
}

/// Rule for the numeric suffix of a mnemonic
#[derive(Debug, Clone, PartialEq)]
pub enum Suffix {
    Never,
    Optional(RangeInclusive<u32>),
    Required(RangeInclusive<u32>),
}

/// What a card kind accepts around its bare mnemonic name
#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    pub prefixes: &'static [char],
    pub suffix: Suffix,
    pub designator: Allowed,
}

impl Form {
    /// No prefix, suffix, or designator
    pub const PLAIN: Form = Form {
        prefixes: &[],
        suffix: Suffix::Never,
        designator: Allowed::Never,
    };

    /// Designator required, nothing else
    pub const PARTICLE: Form = Form {
        prefixes: &[],
        suffix: Suffix::Never,
        designator: Allowed::Required,
    };

    pub const fn suffixed(range: RangeInclusive<u32>) -> Form {
        Form {
            prefixes: &[],
            suffix: Suffix::Required(range),
            designator: Allowed::Never,
        }
    }

    /// Check the mnemonic against the form, returning the suffix if any
    pub fn check(&self, mnemonic: &Mnemonic) -> Result<Option<u32>> {
        mnemonic.check_prefix(self.prefixes)?;

        let suffix = match &self.suffix {
            Suffix::Never => mnemonic.no_suffix().map(|_| None)?,
            Suffix::Optional(range) => mnemonic.optional_suffix(range.clone())?,
            Suffix::Required(range) => Some(mnemonic.required_suffix(range.clone())?),
        };

        match self.designator {
            Allowed::Never => mnemonic.no_designator()?,
            Allowed::Required => mnemonic.required_designator().map(|_| ())?,
            Allowed::Optional => (),
        }

        Ok(suffix)
    }
}

/// How a plain list card reads its values
pub struct ListRule<T> {
    pub form: Form,
    pub field: &'static str,
    /// Whether the card may be given with no values at all
    pub allow_empty: bool,
    /// Domain check run on every value that is not a jump
    pub check: fn(&T) -> Result<()>,
}

/// A mnemonic followed by a list of values, one per cell or surface
///
/// Most data cards with a cell by cell layout (`imp`, `vol`, `u`, ...) are
/// this, differing only in the type and domain of the value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueList<T> {
    pub mnemonic: Mnemonic,
    pub values: Vec<Entry<T>>,
}

impl<T: FromToken + ToToken> ValueList<T> {
    pub fn read(mnemonic: &Mnemonic, tokens: &mut TokenDeque, rule: &ListRule<T>) -> Result<Self> {
        rule.form.check(mnemonic)?;

        let values: Vec<Entry<T>> = match rule.allow_empty {
            true => fields::rest(tokens, rule.field)?,
            false => fields::rest_required(tokens, rule.field)?,
        };
        fields::check_entries(&values, rule.check)?;

        Ok(Self {
            mnemonic: mnemonic.clone(),
            values,
        })
    }

    pub fn tokens(&self) -> Vec<String> {
        fields::tokens(&self.values)
    }
}

/// Declare a data card that is only a [ValueList] with a fixed [ListRule]
macro_rules! value_list {
    ($(#[$meta:meta])* $vis:vis $name:ident($t:ty) = $rule:expr;) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis struct $name(pub $crate::cards::data::ValueList<$t>);

        impl $name {
            const RULE: $crate::cards::data::ListRule<$t> = $rule;
        }

        impl $crate::cards::data::DataCard for $name {
            fn from_tokens(
                mnemonic: &$crate::cards::Mnemonic,
                tokens: &mut $crate::tokens::TokenDeque,
            ) -> $crate::error::Result<Self> {
                $crate::cards::data::ValueList::read(mnemonic, tokens, &Self::RULE).map(Self)
            }

            fn mnemonic(&self) -> $crate::cards::Mnemonic {
                self.0.mnemonic.clone()
            }

            fn fields(&self) -> Vec<String> {
                self.0.tokens()
            }
        }

        impl ::std::ops::Deref for $name {
            type Target = $crate::cards::data::ValueList<$t>;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
    };
}

pub(crate) use value_list;

/// Common domain checks for list values
pub mod checks {
    use crate::cards::fields::{self, MAX_NUMBER};
    use crate::error::Result;

    pub fn any<T>(_value: &T) -> Result<()> {
        Ok(())
    }

    pub fn non_negative(value: &f64) -> Result<()> {
        fields::non_negative(*value, "value").map(drop)
    }

    pub fn positive(value: &f64) -> Result<()> {
        fields::positive(*value, "value").map(drop)
    }

    pub fn fraction(value: &f64) -> Result<()> {
        fields::in_range(*value, 0.0..=1.0, "value").map(drop)
    }

    pub fn cosine(value: &f64) -> Result<()> {
        fields::in_range(*value, -1.0..=1.0, "value").map(drop)
    }

    /// Signed universe or cell style number
    pub fn number(value: &i64) -> Result<()> {
        let max = MAX_NUMBER as i64;
        fields::in_range(*value, -max..=max, "number").map(drop)
    }

    pub fn unsigned(value: &i64) -> Result<()> {
        fields::in_range(*value, 0..=i64::MAX, "value").map(drop)
    }
}

/// Free text following a mnemonic, for `fc`, `sc`, and `mplot`
#[derive(Debug, Clone, PartialEq)]
pub struct FreeText {
    pub mnemonic: Mnemonic,
    pub text: String,
}

impl FreeText {
    pub fn read(mnemonic: &Mnemonic, tokens: &mut TokenDeque, form: &Form) -> Result<Self> {
        form.check(mnemonic)?;
        Ok(Self {
            mnemonic: mnemonic.clone(),
            text: tokens.take_rest().join(" "),
        })
    }

    pub fn tokens(&self) -> Vec<String> {
        match self.text.is_empty() {
            true => Vec::new(),
            false => vec![self.text.clone()],
        }
    }
}

/// Build the [Datum] enum and its dispatch from one table
macro_rules! registry {
    ($($(#[$meta:meta])* $($name:literal)|+ => $variant:ident($ty:ty),)*) => {
        /// Every kind of data card, one variant each
        #[derive(Debug, Clone, PartialEq)]
        pub enum Datum {
            $($(#[$meta])* $variant($ty),)*
        }

        impl Datum {
            fn dispatch(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
                match mnemonic.name.as_str() {
                    $($($name)|+ => <$ty as DataCard>::from_tokens(mnemonic, tokens).map(Self::$variant),)*
                    _ => Err(InpError::unrecognised("data card", &mnemonic.to_string())),
                }
            }

            /// Mnemonic including prefix, suffix, and designator
            pub fn mnemonic(&self) -> Mnemonic {
                match self {
                    $(Self::$variant(card) => card.mnemonic(),)*
                }
            }

            /// Field tokens after the mnemonic
            pub fn fields(&self) -> Vec<String> {
                match self {
                    $(Self::$variant(card) => card.fields(),)*
                }
            }

            /// Name of the card kind, e.g. `"Tally"`
            pub fn kind(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => stringify!($variant),)*
                }
            }

            /// True if the bare mnemonic name is a known data card
            pub fn is_known(name: &str) -> bool {
                matches!(name, $($($name)|+)|*)
            }
        }
    };
}

registry! {
    // geometry
    "vol" => Volumes(geometry::Volumes),
    "area" => Areas(geometry::Areas),
    "u" => Universes(geometry::Universes),
    "lat" => Lattices(geometry::Lattices),
    "fill" => Fills(geometry::Fills),
    "tr" => Transform(geometry::TransformCard),

    // variance reduction
    "imp" => Importances(variance::Importances),
    "esplt" | "tsplt" => Splitting(variance::Splitting),
    "ext" => Exponential(variance::Exponential),
    "vect" => Vectors(variance::Vectors),
    "fcl" => ForcedCollisions(variance::ForcedCollisions),
    "wwe" | "wwt" | "wwge" | "wwgt" => WindowBounds(variance::WindowBounds),
    "wwn" => WindowLimits(variance::WindowLimits),
    "wwp" => WindowParameters(variance::WindowParameters),
    "wwg" => WindowGenerator(variance::WindowGenerator),
    "mesh" => Mesh(variance::Mesh),
    "pd" => DetectorContributions(variance::DetectorContributions),
    "dxt" => Dxtran(variance::Dxtran),
    "dxc" => DxtranContributions(variance::DxtranContributions),
    "dd" => DetectorDiagnostics(variance::DetectorDiagnostics),
    "bbrem" => Bremsstrahlung(variance::Bremsstrahlung),
    "pwt" => PhotonWeights(variance::PhotonWeights),

    // source
    "sdef" => Source(source::Source),
    "si" => SourceInformation(source::SourceInformation),
    "sp" | "sb" => SourceProbability(source::SourceProbability),
    "ds" => DependentSource(source::DependentSource),
    "sc" => SourceComment(source::SourceComment),
    "ssw" => SurfaceSourceWrite(source::SurfaceSourceWrite),
    "ssr" => SurfaceSourceRead(source::SurfaceSourceRead),
    "kcode" => Criticality(source::Criticality),
    "ksrc" => CriticalitySource(source::CriticalitySource),
    "kopts" => CriticalityOptions(source::CriticalityOptions),
    "hsrc" => SourceMesh(source::SourceMesh),

    // tallies
    "f" => Tally(tally::Tally),
    "fc" => TallyComment(tally::TallyComment),
    "e" | "t" | "c" | "fu" => TallyBins(tally::TallyBins),
    "fq" => PrintOrder(tally::PrintOrder),
    "fm" => TallyMultiplier(tally::TallyMultiplier),
    "de" | "df" => DoseFunction(tally::DoseFunction),
    "em" | "tm" | "cm" => BinMultipliers(tally::BinMultipliers),
    "cf" | "sf" => Flagging(tally::Flagging),
    "fs" => Segments(tally::Segments),
    "sd" => SegmentDivisors(tally::SegmentDivisors),
    "tf" => TallyFluctuation(tally::TallyFluctuation),
    "ft" => SpecialTreatments(tally::SpecialTreatments),
    "fmesh" => MeshTally(tally::MeshTally),
    "notrn" => NoTransport(tally::NoTransport),
    "pert" => Perturbation(tally::Perturbation),

    // materials
    "m" => Material(material::Material),
    "mt" => Thermal(material::Thermal),
    "mx" => Substitution(material::Substitution),
    "otfdb" => Broadening(material::Broadening),
    "totnu" => TotalNu(material::TotalNu),
    "nonu" => NoFission(material::NoFission),
    "awtab" => AtomicWeights(material::AtomicWeights),
    "xs" => CrossSection(material::CrossSection),
    "void" => Void(material::Void),
    "drxs" => DiscreteReactions(material::DiscreteReactions),

    // physics
    "mode" => Mode(physics::Mode),
    "phys" => Physics(physics::Physics),
    "tmp" => Temperatures(physics::Temperatures),
    "thtme" => TemperatureTimes(physics::TemperatureTimes),
    "cut" => Cutoffs(physics::Cutoffs),
    "elpt" => EnergyCutoffs(physics::EnergyCutoffs),
    "lca" | "lcb" | "lcc" | "lea" | "leb" => Model(physics::ModelParameters),
    "act" => Activation(physics::Activation),
    "cosy" => CosyMaps(physics::CosyMaps),
    "bfld" => MagneticField(physics::MagneticField),
    "bflcl" => FieldCells(physics::FieldCells),

    // problem control
    "nps" => Histories(control::Histories),
    "ctme" => ComputerTime(control::ComputerTime),
    "prdmp" => Dumps(control::Dumps),
    "lost" => LostParticles(control::LostParticles),
    "dbcn" => Debug(control::DebugInfo),
    "print" => Print(control::Print),
    "talnp" => NoTallyPrint(control::NoTallyPrint),
    "rand" => Random(control::Random),
    "stop" => Stop(control::Stop),
    "ptrac" => Ptrac(control::Ptrac),
    "histp" => HistoryFile(control::HistoryFile),
    "mplot" => Plotting(control::Plotting),
}

impl Variant for Datum {
    type Id = String;

    fn parse(code: &str) -> Result<Self> {
        let mut tokens = TokenDeque::from(code);
        let first = tokens.pop_front_or(|| InpError::too_few("data card mnemonic"))?;
        let mnemonic = Mnemonic::parse(&first)?;
        trace!("[Datum] {mnemonic}");

        let datum = Self::dispatch(&mnemonic, &mut tokens).map_err(|e| e.within(&first))?;
        tokens.ensure_empty(&first)?;
        Ok(datum)
    }

    /// Mnemonic, suffix, and designator, without any prefix
    fn id(&self) -> String {
        self.mnemonic().key()
    }

    fn to_text(&self) -> String {
        let mut tokens = vec![self.mnemonic().to_string()];
        tokens.extend(self.fields());
        tokens.join(" ")
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

/// Pairs of values, failing if the count is odd
pub(crate) fn pairs<A, B>(tokens: &mut TokenDeque, first: &str, second: &str) -> Result<Vec<(A, B)>>
where
    A: FromToken,
    B: FromToken,
{
    let rest = tokens.take_rest();
    if rest.len() % 2 != 0 {
        return Err(InpError::syntax(f!(
            "{first} and {second} must come in pairs, found {} values",
            rest.len()
        )));
    }
    rest.chunks(2)
        .map(|pair| Ok((fields::parse(&pair[0], first)?, fields::parse(&pair[1], second)?)))
        .collect()
}

/// Flatten value pairs back into tokens
pub(crate) fn pair_tokens<A: ToToken, B: ToToken>(pairs: &[(A, B)]) -> Vec<String> {
    pairs
        .iter()
        .flat_map(|(a, b)| [a.token(), b.token()])
        .collect()
}

/// At most `max` values, each possibly a jump
pub(crate) fn bounded<T: FromToken>(tokens: &mut TokenDeque, max: usize, field: &str) -> Result<Vec<Entry<T>>> {
    if tokens.len() > max {
        let extra = tokens.take_rest().split_off(max);
        return Err(InpError::too_many(field, &extra));
    }
    fields::rest(tokens, field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("imp:n 1 1 0", "imp:n", "Importances")]
    #[case("*tr2 0 0 1", "tr2", "Transform")]
    #[case("f4:n 1 2 t", "f4:n", "Tally")]
    #[case("m1 1001.80c 2 8016.80c 1", "m1", "Material")]
    #[case("sdef pos=0 0 0 erg=14", "sdef", "Source")]
    #[case("nps 1e6", "nps", "Histories")]
    #[case("mode n p", "mode", "Mode")]
    fn dispatch_by_name(#[case] text: &str, #[case] id: &str, #[case] kind: &str) {
        let datum = Datum::parse(text).unwrap();
        assert_eq!(datum.id(), id);
        assert_eq!(datum.kind(), kind);
    }

    #[test]
    fn unknown_cards() {
        let error = Datum::parse("bogus 1 2").unwrap_err();
        assert!(error.is_syntax());
        assert!(error.message.contains("unrecognised data card"));
        assert!(Datum::is_known("fmesh"));
        assert!(!Datum::is_known("bogus"));
    }

    #[test]
    fn leftovers_are_too_many() {
        let error = Datum::parse("ctme 10 20").unwrap_err();
        assert!(error.is_syntax());
        assert!(error.message.contains("too many fields"));
    }

    #[test]
    fn forms() {
        let tally = Form {
            prefixes: &['*'],
            suffix: Suffix::Required(1..=99),
            designator: Allowed::Required,
        };
        assert_eq!(tally.check(&Mnemonic::parse("*f4:n").unwrap()).unwrap(), Some(4));
        assert!(tally.check(&Mnemonic::parse("f4").unwrap()).unwrap_err().is_semantic());
        assert!(tally.check(&Mnemonic::parse("+f4:n").unwrap()).is_err());
        assert!(Form::PLAIN.check(&Mnemonic::parse("nps").unwrap()).is_ok());
    }

    #[test]
    fn value_pairs() {
        let mut tokens = TokenDeque::from("1 0.5 2 0.25");
        let values = pairs::<u32, f64>(&mut tokens, "n", "x").unwrap();
        assert_eq!(values, vec![(1, 0.5), (2, 0.25)]);
        assert_eq!(pair_tokens(&values), vec!["1", "0.5", "2", "0.25"]);

        let mut tokens = TokenDeque::from("1 0.5 2");
        assert!(pairs::<u32, f64>(&mut tokens, "n", "x").unwrap_err().is_syntax());
    }
}
