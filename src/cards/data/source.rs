//! Source definition data cards
//!
//! The general source `sdef` describes each source variable either as a
//! fixed value, as a distribution `dn` defined by `si`/`sp`/`sb` cards, or as
//! a function of another variable (`erg=fcel d1`) resolved through a `ds`
//! card. Criticality sources use `kcode`, `ksrc`, `kopts`, and `hsrc`, and
//! surface sources are written with `ssw` and read back with `ssr`.

// internal modules
use crate::cards::data::{self, DataCard, Form, FreeText};
use crate::cards::fields::{self, Entry, ToToken, Vector3};
use crate::cards::options::{self, keyword_enum, Keyword, KeywordOption, OptionValue, ValueKind};
use crate::cards::Mnemonic;
use crate::error::{InpError, Result};
use crate::parsers;
use crate::particle::Particle;
use crate::tokens::TokenDeque;
use crate::utils::f;

// standard library
use std::fmt;

/// Distribution numbers run from 1 to 999
const DISTRIBUTION_FORM: Form = Form::suffixed(1..=999);

/// A single value of a source variable
///
/// ```rust
/// # use inpdeck::cards::data::source::{SourceKeyword, SourceValue};
/// assert_eq!(SourceValue::parse("d3").unwrap(), SourceValue::Distribution(3));
/// assert_eq!(SourceValue::parse("14.1").unwrap(), SourceValue::Number(14.1));
/// assert_eq!(
///     SourceValue::parse("fcel").unwrap(),
///     SourceValue::DependsOn(SourceKeyword::Cel)
/// );
/// assert_eq!(SourceValue::parse("n").unwrap().to_string(), "n");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SourceValue {
    Number(f64),
    /// `dn`, a distribution defined by `si`/`sp`/`sb` cards
    Distribution(u32),
    /// `fvar`, a function of another source variable
    DependsOn(SourceKeyword),
    /// Particle names and anything else that is not a number
    Text(String),
}

impl SourceValue {
    pub fn parse(token: &str) -> Result<Self> {
        if let Some(n) = parsers::parse_distribution(token) {
            return fields::in_range(n, 1..=999, "distribution number").map(Self::Distribution);
        }
        if let Some(x) = parsers::parse_real(token) {
            return Ok(Self::Number(x));
        }
        let dependency = token
            .strip_prefix('f')
            .and_then(SourceKeyword::from_name);
        match dependency {
            Some(variable) => Ok(Self::DependsOn(variable)),
            None => Ok(Self::Text(token.to_string())),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(x) => Some(*x),
            _ => None,
        }
    }

    pub fn is_distribution(&self) -> bool {
        matches!(self, Self::Distribution(_))
    }
}

impl fmt::Display for SourceValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Number(x) => write!(f, "{}", x.token()),
            Self::Distribution(n) => write!(f, "d{n}"),
            Self::DependsOn(variable) => write!(f, "f{variable}"),
            Self::Text(t) => write!(f, "{t}"),
        }
    }
}

keyword_enum! {
    /// Source variables of the `sdef` card
    pub enum SourceKeyword {
        Cel => "cel", Source;
        Sur => "sur", Source;
        Erg => "erg", Source;
        Tme => "tme", Source;
        Dir => "dir", Source;
        Vec => "vec", Source;
        Nrm => "nrm", Source;
        Pos => "pos", Source;
        Rad => "rad", Source;
        Ext => "ext", Source;
        Axs => "axs", Source;
        X => "x", Source;
        Y => "y", Source;
        Z => "z", Source;
        Ccc => "ccc", Source;
        Ara => "ara", Source;
        Wgt => "wgt", Source;
        Eff => "eff", Source;
        Par => "par", Source;
        Tr => "tr", Source;
        Dat => "dat", Source;
        Loc => "loc", Source;
        Bem => "bem", Source;
        Bap => "bap", Source;
    }
}

impl SourceKeyword {
    /// Variables taking a position or direction vector
    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Vec | Self::Pos | Self::Axs)
    }

    fn check_number(&self, x: f64) -> Result<()> {
        let name = self.as_str();
        match self {
            Self::Wgt | Self::Erg => fields::positive(x, name).map(drop),
            Self::Rad | Self::Ext | Self::Ara | Self::Tme => fields::non_negative(x, name).map(drop),
            Self::Dir => fields::in_range(x, -1.0..=1.0, name).map(drop),
            Self::Nrm => fields::one_of(x, &[-1.0, 1.0], name).map(drop),
            Self::Eff => fields::in_range(x, 0.0..=1.0, name).map(drop),
            Self::Tr => fields::in_range(x, 1.0..=999.0, name).map(drop),
            _ => Ok(()),
        }
    }
}

impl Keyword for SourceKeyword {
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
        let OptionValue::Source(values) = &option.value else {
            return Ok(());
        };

        match values.as_slice() {
            // dependent variable, e.g. erg=fcel d1
            [SourceValue::DependsOn(v), SourceValue::Distribution(_)] if v != self => Ok(()),
            [SourceValue::Distribution(_)] => Ok(()),
            [SourceValue::Number(x)] if !self.is_vector() => self.check_number(*x),
            [SourceValue::Text(t)] if *self == Self::Par => match t.as_str() {
                "sf" | "sp" => Ok(()),
                t => Particle::try_from(t).map(drop),
            },
            [SourceValue::Text(_)] if matches!(self, Self::Dat | Self::Loc) => Ok(()),
            [x, y, z] if self.is_vector() || *self == Self::Loc => {
                match (x.as_number(), y.as_number(), z.as_number()) {
                    (Some(_), Some(_), Some(_)) => Ok(()),
                    _ => Err(InpError::semantic(f!("{self} needs three numbers"))),
                }
            }
            _ => Err(InpError::semantic(f!(
                "{self} cannot take \"{}\"",
                option.value.text()
            ))),
        }
    }
}

/// `sdef var=value ...` general source
///
/// ```rust
/// # use inpdeck::cards::{Datum, Variant};
/// let card = Datum::parse("sdef pos=0 0 0 erg=fcel d1 cel=d2").unwrap();
/// assert_eq!(card.to_text(), "sdef pos=0 0 0 erg=fcel d1 cel=d2");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub options: Vec<KeywordOption<SourceKeyword>>,
}

impl Source {
    pub fn get(&self, keyword: SourceKeyword) -> Option<&[SourceValue]> {
        match &options::find(&self.options, keyword)?.value {
            OptionValue::Source(values) => Some(values),
            _ => None,
        }
    }

    /// Distribution numbers referenced by any variable
    pub fn distributions(&self) -> Vec<u32> {
        self.options
            .iter()
            .filter_map(|o| match &o.value {
                OptionValue::Source(values) => Some(values),
                _ => None,
            })
            .flatten()
            .filter_map(|v| match v {
                SourceValue::Distribution(n) => Some(*n),
                _ => None,
            })
            .collect()
    }
}

impl DataCard for Source {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        let options = options::scan::<SourceKeyword>(tokens)?;
        Ok(Self { options })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("sdef")
    }

    fn fields(&self) -> Vec<String> {
        options::texts(&self.options)
    }
}

/// Table of a source distribution, shaped by its option letter
#[derive(Debug, Clone, PartialEq)]
pub enum SourceTable {
    /// `h` (or no option), non-decreasing histogram bounds
    Bins(Vec<f64>),
    /// `l`, discrete values such as cell numbers or particle names
    Discrete(Vec<String>),
    /// `a`, points of a piecewise linear function
    Points(Vec<f64>),
    /// `s`, other distributions to sample from
    Distributions(Vec<SourceValue>),
    /// `t` and `q`, values paired with a distribution
    Pairs(Vec<(f64, SourceValue)>),
}

impl SourceTable {
    fn read(option: Option<char>, tokens: &mut TokenDeque, field: &str) -> Result<Self> {
        let table = match option {
            None | Some('h') => {
                let bins = fields::rest_required::<f64>(tokens, field)?;
                if let Some((a, b)) = bins.windows(2).map(|w| (w[0], w[1])).find(|(a, b)| b < a) {
                    return Err(InpError::semantic(f!(
                        "{field} histogram bounds decrease from {} to {}",
                        a.token(),
                        b.token()
                    )));
                }
                Self::Bins(bins)
            }
            Some('l') => Self::Discrete(fields::rest_required(tokens, field)?),
            Some('a') => {
                let points = fields::rest_required::<f64>(tokens, field)?;
                fields::increasing(&points, field)?;
                Self::Points(points)
            }
            Some('s') => {
                let values = fields::rest_required::<String>(tokens, field)?
                    .iter()
                    .map(|t| Self::distribution(t))
                    .collect::<Result<Vec<SourceValue>>>()?;
                Self::Distributions(values)
            }
            Some(_) => {
                let pairs = data::pairs::<f64, String>(tokens, field, "distribution")?;
                if pairs.is_empty() {
                    return Err(InpError::too_few(field));
                }
                let pairs = pairs
                    .into_iter()
                    .map(|(x, d)| Ok((x, Self::distribution(&d)?)))
                    .collect::<Result<Vec<(f64, SourceValue)>>>()?;
                Self::Pairs(pairs)
            }
        };
        Ok(table)
    }

    /// `dn`, a plain distribution number, or `0` for no distribution
    fn distribution(token: &str) -> Result<SourceValue> {
        match SourceValue::parse(token)? {
            SourceValue::Number(x) if x >= 0.0 && x.fract() == 0.0 => Ok(SourceValue::Number(x)),
            d @ SourceValue::Distribution(_) => Ok(d),
            _ => Err(InpError::invalid_token("distribution number", token)),
        }
    }

    fn tokens(&self) -> Vec<String> {
        match self {
            Self::Bins(v) | Self::Points(v) => fields::tokens(v),
            Self::Discrete(v) => v.clone(),
            Self::Distributions(v) => v.iter().map(SourceValue::to_string).collect(),
            Self::Pairs(v) => v
                .iter()
                .flat_map(|(x, d)| [x.token(), d.to_string()])
                .collect(),
        }
    }
}

/// Leading option letter of a table, if it is one of `allowed`
fn table_option(tokens: &mut TokenDeque, allowed: &str) -> Option<char> {
    let front = tokens.front()?;
    let mut chars = front.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if allowed.contains(c) => {
            tokens.pop_front().ok();
            Some(c)
        }
        _ => None,
    }
}

/// `sin [option] i1 i2 ...` source information
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInformation {
    pub number: u32,
    pub option: Option<char>,
    pub table: SourceTable,
}

impl DataCard for SourceInformation {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        let number = DISTRIBUTION_FORM.check(mnemonic)?.unwrap_or_default();
        let option = table_option(tokens, "hlas");
        let table = SourceTable::read(option, tokens, "source information")?;
        Ok(Self {
            number,
            option,
            table,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("si").with_suffix(Some(self.number))
    }

    fn fields(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self.option.iter().map(char::to_string).collect();
        tokens.extend(self.table.tokens());
        tokens
    }
}

/// Probabilities of an `sp` or `sb` card
#[derive(Debug, Clone, PartialEq)]
pub enum Probabilities {
    /// `[d|c|v|w] p1 p2 ...`
    Table { option: Option<char>, values: Vec<f64> },
    /// `-f a b`, a built in analytic function
    Function { function: i64, parameters: Vec<f64> },
}

impl Probabilities {
    pub const FUNCTIONS: [i64; 9] = [-2, -3, -4, -5, -6, -7, -21, -31, -41];
}

/// `spn` source probability or `sbn` source bias
#[derive(Debug, Clone, PartialEq)]
pub struct SourceProbability {
    /// `sb` rather than `sp`
    pub bias: bool,
    pub number: u32,
    pub probabilities: Probabilities,
}

impl DataCard for SourceProbability {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        let number = DISTRIBUTION_FORM.check(mnemonic)?.unwrap_or_default();

        let function = tokens
            .front()
            .and_then(parsers::parse_integer)
            .filter(|n| *n < 0);

        let probabilities = match function {
            Some(function) => {
                tokens.pop_front()?;
                fields::one_of(function, &Probabilities::FUNCTIONS, "source function")?;
                let parameters = fields::rest::<f64>(tokens, "function parameter")?;
                if parameters.len() > 4 {
                    return Err(InpError::too_many(
                        "source function",
                        &fields::tokens(&parameters[4..]),
                    ));
                }
                Probabilities::Function {
                    function,
                    parameters,
                }
            }
            None => {
                let option = table_option(tokens, "dcvw");
                let values = fields::rest_required::<f64>(tokens, "probability")?;
                for p in &values {
                    fields::non_negative(*p, "probability")?;
                }
                if option == Some('c') && values.windows(2).any(|w| w[1] < w[0]) {
                    return Err(InpError::semantic("cumulative probabilities must not decrease"));
                }
                Probabilities::Table { option, values }
            }
        };

        Ok(Self {
            bias: mnemonic.name == "sb",
            number,
            probabilities,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        let name = match self.bias {
            true => "sb",
            false => "sp",
        };
        Mnemonic::new(name).with_suffix(Some(self.number))
    }

    fn fields(&self) -> Vec<String> {
        match &self.probabilities {
            Probabilities::Table { option, values } => {
                let mut tokens: Vec<String> = option.iter().map(char::to_string).collect();
                tokens.extend(fields::tokens(values));
                tokens
            }
            Probabilities::Function {
                function,
                parameters,
            } => {
                let mut tokens = vec![function.to_string()];
                tokens.extend(fields::tokens(parameters));
                tokens
            }
        }
    }
}

/// `dsn [option] j1 j2 ...` dependent source distribution
#[derive(Debug, Clone, PartialEq)]
pub struct DependentSource {
    pub number: u32,
    pub option: Option<char>,
    pub table: SourceTable,
}

impl DataCard for DependentSource {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        let number = DISTRIBUTION_FORM.check(mnemonic)?.unwrap_or_default();
        let option = table_option(tokens, "hlstq");
        let table = SourceTable::read(option, tokens, "dependent source")?;
        Ok(Self {
            number,
            option,
            table,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("ds").with_suffix(Some(self.number))
    }

    fn fields(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self.option.iter().map(char::to_string).collect();
        tokens.extend(self.table.tokens());
        tokens
    }
}

/// `scn text` source comment
#[derive(Debug, Clone, PartialEq)]
pub struct SourceComment(pub FreeText);

impl DataCard for SourceComment {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        FreeText::read(mnemonic, tokens, &DISTRIBUTION_FORM).map(Self)
    }

    fn mnemonic(&self) -> Mnemonic {
        self.0.mnemonic.clone()
    }

    fn fields(&self) -> Vec<String> {
        self.0.tokens()
    }
}

keyword_enum! {
    /// Options of the `ssw` card
    pub enum SswKeyword {
        Sym => "sym", Integer;
        Pty => "pty", Texts;
        Cel => "cel", Integers;
    }
}

impl Keyword for SswKeyword {
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
            (Self::Sym, OptionValue::Integer(m)) => fields::in_range(*m, 0..=2, "sym").map(drop),
            (Self::Pty, OptionValue::Texts(particles)) => particles
                .iter()
                .try_for_each(|p| Particle::try_from(p.as_str()).map(drop)),
            _ => Ok(()),
        }
    }
}

/// `ssw s1 s2 (c1 c2) ... sym= pty= cel=` surface source write
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSourceWrite {
    /// Signed surfaces, with any cell groups kept as written
    pub surfaces: Vec<String>,
    pub options: Vec<KeywordOption<SswKeyword>>,
}

impl DataCard for SurfaceSourceWrite {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;

        let mut surfaces = Vec::new();
        while let Some(token) = tokens.front() {
            if !parsers::is_geometry_text(token) {
                break;
            }
            surfaces.push(tokens.pop_front()?);
        }

        let options = options::scan::<SswKeyword>(tokens)?;
        if surfaces.is_empty() && options::find(&options, SswKeyword::Cel).is_none() {
            return Err(InpError::too_few("surface or cel"));
        }

        Ok(Self { surfaces, options })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("ssw")
    }

    fn fields(&self) -> Vec<String> {
        let mut tokens = self.surfaces.clone();
        tokens.extend(options::texts(&self.options));
        tokens
    }
}

keyword_enum! {
    /// Options of the `ssr` card
    pub enum SsrKeyword {
        Old => "old", Integers;
        Cel => "cel", Integers;
        New => "new", Integers;
        Pty => "pty", Texts;
        Col => "col", Integer;
        Wtf => "wtf", Reals;
        Psc => "psc", Real;
        Poa => "poa", Real;
        Bcw => "bcw", Reals;
        Axs => "axs", Vector;
        Ext => "ext", Texts;
        Tr => "tr", Texts;
    }
}

impl Keyword for SsrKeyword {
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
            (Self::Col, OptionValue::Integer(c)) => fields::in_range(*c, -1..=1, "col").map(drop),
            (Self::Psc, OptionValue::Real(x)) => fields::non_negative(*x, "psc").map(drop),
            (Self::Poa, OptionValue::Real(x)) => fields::in_range(*x, 0.0..=1.0, "poa").map(drop),
            _ => Ok(()),
        }
    }
}

/// `ssr old= cel= new= ...` surface source read
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSourceRead {
    pub options: Vec<KeywordOption<SsrKeyword>>,
}

impl DataCard for SurfaceSourceRead {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        let options = options::scan::<SsrKeyword>(tokens)?;
        Ok(Self { options })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("ssr")
    }

    fn fields(&self) -> Vec<String> {
        options::texts(&self.options)
    }
}

/// `kcode nsrck rkk ikz kct msrk knrm mrkp kc8` criticality run parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Criticality {
    pub entries: Vec<Entry<f64>>,
}

impl Criticality {
    const NAMES: [&'static str; 8] = ["nsrck", "rkk", "ikz", "kct", "msrk", "knrm", "mrkp", "kc8"];

    /// Entry by name, `None` when absent or a jump
    pub fn get(&self, name: &str) -> Option<f64> {
        let index = Self::NAMES.iter().position(|n| *n == name)?;
        self.entries.get(index).and_then(|e| e.value().copied())
    }

    /// Source histories per cycle
    pub fn histories(&self) -> Option<u64> {
        self.get("nsrck").map(|n| n as u64)
    }

    /// Cycles skipped before tallies start, and the total
    pub fn cycles(&self) -> (Option<u64>, Option<u64>) {
        (
            self.get("ikz").map(|n| n as u64),
            self.get("kct").map(|n| n as u64),
        )
    }
}

impl DataCard for Criticality {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        let card = Self {
            entries: data::bounded::<f64>(tokens, 8, "kcode")?,
        };

        let whole = |name: &str| -> Result<()> {
            match card.get(name) {
                Some(x) if x < 0.0 || x.fract() != 0.0 => Err(InpError::semantic(f!(
                    "{name} must be a whole number, found {}",
                    x.token()
                ))),
                _ => Ok(()),
            }
        };
        for name in ["nsrck", "ikz", "kct", "msrk", "mrkp"] {
            whole(name)?;
        }
        if let Some(rkk) = card.get("rkk") {
            fields::positive(rkk, "rkk")?;
        }
        if let Some(knrm) = card.get("knrm") {
            fields::one_of(knrm, &[0.0, 1.0], "knrm")?;
        }
        if let Some(kc8) = card.get("kc8") {
            fields::one_of(kc8, &[0.0, 1.0], "kc8")?;
        }
        if let (Some(ikz), Some(kct)) = card.cycles() {
            if kct != 0 && kct <= ikz {
                return Err(InpError::semantic(f!(
                    "kct {kct} must exceed the {ikz} skipped cycles"
                )));
            }
        }

        Ok(card)
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("kcode")
    }

    fn fields(&self) -> Vec<String> {
        fields::tokens(&self.entries)
    }
}

/// `ksrc x1 y1 z1 x2 y2 z2 ...` initial fission source points
#[derive(Debug, Clone, PartialEq)]
pub struct CriticalitySource {
    pub points: Vec<Vector3>,
}

impl DataCard for CriticalitySource {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        if tokens.is_empty() || tokens.len() % 3 != 0 {
            return Err(InpError::syntax(f!(
                "ksrc needs points of 3 coordinates, found {} values",
                tokens.len()
            )));
        }

        let mut points = Vec::new();
        while !tokens.is_empty() {
            points.push(Vector3::pop(tokens, "source point")?);
        }
        Ok(Self { points })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("ksrc")
    }

    fn fields(&self) -> Vec<String> {
        self.points.iter().flat_map(Vector3::tokens).collect()
    }
}

keyword_enum! {
    /// Options of the `kopts` card
    pub enum KoptsKeyword {
        Blocksize => "blocksize", Integer;
        Kinetics => "kinetics", Choice(&["yes", "no"]);
        Precursor => "precursor", Choice(&["yes", "no"]);
        Ksental => "ksental", Choice(&["mctal", "fmesh"]);
        Fmat => "fmat", Choice(&["yes", "no"]);
    }
}

impl Keyword for KoptsKeyword {
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
            (Self::Blocksize, OptionValue::Integer(n)) => {
                fields::in_range(*n, 2..=i64::MAX, "blocksize").map(drop)
            }
            _ => Ok(()),
        }
    }
}

/// `kopts blocksize= kinetics= ...` criticality options
#[derive(Debug, Clone, PartialEq)]
pub struct CriticalityOptions {
    pub options: Vec<KeywordOption<KoptsKeyword>>,
}

impl DataCard for CriticalityOptions {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        let options = options::scan::<KoptsKeyword>(tokens)?;
        Ok(Self { options })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("kopts")
    }

    fn fields(&self) -> Vec<String> {
        options::texts(&self.options)
    }
}

/// One axis of a source entropy mesh: bin count and bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshAxis {
    pub bins: u32,
    pub lower: f64,
    pub upper: f64,
}

/// `hsrc ix x0 x1 iy y0 y1 iz z0 z1` source entropy mesh
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMesh {
    pub axes: [MeshAxis; 3],
}

impl DataCard for SourceMesh {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;

        let mut axis = |name: &str| -> Result<MeshAxis> {
            let bins = fields::pop::<u32>(tokens, &f!("{name} bins"))?;
            let bins = fields::in_range(bins, 1..=u32::MAX, &f!("{name} bins"))?;
            let lower = fields::pop::<f64>(tokens, &f!("{name} lower bound"))?;
            let upper = fields::pop::<f64>(tokens, &f!("{name} upper bound"))?;
            if upper <= lower {
                return Err(InpError::semantic(f!("hsrc {name} bounds must increase")));
            }
            Ok(MeshAxis { bins, lower, upper })
        };

        Ok(Self {
            axes: [axis("x")?, axis("y")?, axis("z")?],
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("hsrc")
    }

    fn fields(&self) -> Vec<String> {
        self.axes
            .iter()
            .flat_map(|a| [a.bins.to_string(), a.lower.token(), a.upper.token()])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Datum, Variant};
    use rstest::rstest;

    #[rstest]
    #[case("sdef")]
    #[case("sdef pos=0 0 0 erg=14.1 par=n")]
    #[case("sdef cel=d1 erg=fcel d2 wgt=2")]
    #[case("sdef pos=d1 axs=0 0 1 rad=d2 ext=d3")]
    #[case("si1 h 0 1 2")]
    #[case("si2 1 2 3")]
    #[case("si3 l 1001 8016")]
    #[case("si4 a 0 1 10")]
    #[case("si5 s 6 d7 0")]
    #[case("sp1 0 1 1")]
    #[case("sp2 d 0.5 0.5")]
    #[case("sp3 -3 0.988 2.249")]
    #[case("sb4 -21 2")]
    #[case("ds1 s 2 3")]
    #[case("ds2 q 1 d3 2 d4")]
    #[case("ds3 t 1 2 3 4")]
    #[case("sc1 energy spectrum of the beam")]
    #[case("ssw 1 -2 (3 4) sym=1 pty=n p")]
    #[case("ssr old=1 2 new=3 4 col=1")]
    #[case("kcode 1000 1 50 250")]
    #[case("kcode 1000 1 j 250 j 1")]
    #[case("ksrc 0 0 0 1 1 1")]
    #[case("kopts blocksize=10 kinetics=yes")]
    #[case("hsrc 5 -10 10 5 -10 10 1 0 1")]
    fn canonical(#[case] text: &str) {
        assert_eq!(Datum::parse(text).unwrap().to_text(), text);
    }

    #[rstest]
    #[case("sdef erg=-1")]
    #[case("sdef pos=0 0")]
    #[case("sdef erg=ferg d1")]
    #[case("sdef par=nn")]
    #[case("sdef bogus=1")]
    #[case("si0 1 2")]
    #[case("si1 h 2 1")]
    #[case("si1 a 2 1")]
    #[case("si1 s x")]
    #[case("sp1 -8 1")]
    #[case("sp1 0 -1")]
    #[case("sp1 c 0 0.5 0.4")]
    #[case("ds1 q 1 d3 2")]
    #[case("ssw sym=1")]
    #[case("ssr col=2")]
    #[case("kcode 1000.5")]
    #[case("kcode 1000 0")]
    #[case("kcode 1000 1 50 40")]
    #[case("kcode 1 1 1 1 1 1 1 1 1")]
    #[case("ksrc 0 0")]
    #[case("kopts blocksize=1")]
    #[case("hsrc 5 10 -10 5 -10 10 1 0 1")]
    #[case("hsrc 5 -10 10")]
    fn rejected(#[case] text: &str) {
        assert!(Datum::parse(text).is_err(), "{text}");
    }

    #[test]
    fn source_accessors() {
        let Datum::Source(sdef) = Datum::parse("sdef erg=d1 pos=0 0 5 cel=fpos d2").unwrap() else {
            panic!("not a source");
        };
        assert_eq!(sdef.get(SourceKeyword::Erg), Some(&[SourceValue::Distribution(1)][..]));
        assert_eq!(sdef.distributions(), vec![1, 2]);
        assert!(sdef.get(SourceKeyword::Wgt).is_none());
    }

    #[test]
    fn criticality_accessors() {
        let Datum::Criticality(kcode) = Datum::parse("kcode 5000 1.0 25 125").unwrap() else {
            panic!("not kcode");
        };
        assert_eq!(kcode.histories(), Some(5000));
        assert_eq!(kcode.cycles(), (Some(25), Some(125)));
        assert_eq!(kcode.get("msrk"), None);
    }
}
