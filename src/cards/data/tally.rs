//! Tally data cards
//!
//! The tally itself is an `fn` card where the last digit of `n` selects the
//! tally type. Every other card here modifies the tally with the same number:
//! bins (`e t c fu`), multipliers, segmenting, special treatments, and so on.
//! Mesh tallies (`fmesh`) and perturbations (`pert`) are keyword cards.

// internal modules
use crate::cards::data::{self, DataCard, Form, FreeText, Suffix};
use crate::cards::fields::{self, Entry, ToToken, Vector3, MAX_NUMBER};
use crate::cards::options::{self, keyword_enum, token_enum, Allowed, Keyword, KeywordOption, OptionValue, ValueKind};
use crate::cards::Mnemonic;
use crate::error::{InpError, Result};
use crate::particle::Designator;
use crate::tokens::TokenDeque;
use crate::utils::f;

// standard library
use std::fmt;

// external crates
use itertools::Itertools;

/// Tally types selected by the last digit of the tally number
pub const TALLY_TYPES: [u32; 7] = [1, 2, 4, 5, 6, 7, 8];

/// Tally modifier cards: suffix is the tally number, `0` for the default
const MODIFIER_FORM: Form = Form::suffixed(0..=MAX_NUMBER);

/// Tally number from a suffix, checking its type digit
fn tally_type(number: u32, allowed: &[u32]) -> Result<u32> {
    let kind = number % 10;
    if allowed.contains(&kind) {
        Ok(kind)
    } else {
        Err(InpError::semantic(f!(
            "tally {number} has type {kind}, expected one of {}",
            allowed.iter().join(", ")
        )))
    }
}

/// A point detector: position and exclusion sphere radius
#[derive(Debug, Clone, PartialEq)]
pub struct PointDetector {
    pub position: Vector3,
    /// Radius in cm, or in mean free paths when negative
    pub radius: f64,
}

/// A single cell or surface bin of a tally
///
/// ```rust
/// # use inpdeck::cards::data::tally::TallyBin;
/// let bins = TallyBin::parse_list(&["(1", "2)", "<", "3", "t"].map(String::from)).unwrap();
/// assert_eq!(bins.len(), 2);
/// assert_eq!(bins[0].to_string(), "(1 2 < 3)");
/// assert_eq!(bins[1], TallyBin::Total);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum TallyBin {
    Number(u32),
    /// `t`, a bin for the total over the previous ones
    Total,
    /// A parenthesised union, with `<` separating repeated structure levels
    Group(Vec<Vec<TallyBin>>),
}

impl TallyBin {
    /// Read a whole bin list, splitting parentheses and `<` off the tokens
    pub fn parse_list(tokens: &[String]) -> Result<Vec<TallyBin>> {
        let mut pieces = split_bin_tokens(tokens);
        let mut bins = Vec::new();

        while !pieces.is_empty() {
            let token = pieces.pop_front()?;
            let bin = match token.as_str() {
                "(" => Self::group(&mut pieces)?,
                "t" => Self::Total,
                t => Self::number(t)?,
            };
            bins.push(bin);
        }

        if bins.is_empty() {
            return Err(InpError::too_few("tally bin"));
        }
        Ok(bins)
    }

    /// Remainder of a group once its `(` has been taken
    fn group(pieces: &mut TokenDeque) -> Result<Self> {
        let mut levels = Vec::new();
        let mut current = Vec::new();

        loop {
            let token = pieces.pop_front_or(|| InpError::syntax("unclosed \"(\" in tally bins"))?;
            match token.as_str() {
                ")" | "<" => {
                    if current.is_empty() {
                        return Err(InpError::syntax("empty level in tally bin group"));
                    }
                    levels.push(std::mem::take(&mut current));
                    if token == ")" {
                        return Ok(Self::Group(levels));
                    }
                }
                "(" => current.push(Self::group(pieces)?),
                t => current.push(Self::number(t)?),
            }
        }
    }

    fn number(token: &str) -> Result<Self> {
        if token == ")" || token == "<" {
            return Err(InpError::syntax(f!("unexpected \"{token}\" in tally bins")));
        }
        let n = fields::parse::<u32>(token, "tally bin")?;
        fields::in_range(n, 1..=MAX_NUMBER, "tally bin").map(Self::Number)
    }
}

impl fmt::Display for TallyBin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Total => write!(f, "t"),
            Self::Group(levels) => {
                let levels = levels.iter().map(|l| l.iter().join(" ")).join(" < ");
                write!(f, "({levels})")
            }
        }
    }
}

/// Put every parenthesis and `<` into its own piece
fn split_bin_tokens(tokens: &[String]) -> TokenDeque {
    let mut pieces = TokenDeque::new();
    for token in tokens {
        let mut current = String::new();
        for c in token.chars() {
            if "()<".contains(c) {
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

/// What a tally scores over
#[derive(Debug, Clone, PartialEq)]
pub enum TallyRegions {
    /// Type 5 point detectors, with `nd` suppressing the direct contribution
    Detectors {
        detectors: Vec<PointDetector>,
        no_direct: bool,
    },
    /// Surfaces or cells for every other type
    Bins(Vec<TallyBin>),
}

/// `[*|+]fn:<pl> ...` a standard tally
///
/// ```rust
/// # use inpdeck::cards::{Datum, Variant};
/// let card = Datum::parse("f14:n 1 (2 3) t").unwrap();
/// assert_eq!(card.id(), "f14:n");
///
/// let card = Datum::parse("f5:p 0 0 10 0.5 nd").unwrap();
/// assert_eq!(card.to_text(), "f5:p 0 0 10 0.5 nd");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Tally {
    pub number: u32,
    /// `*` for energy units, `+` for collision heating or charge deposition
    pub prefix: Option<char>,
    pub designator: Option<Designator>,
    pub regions: TallyRegions,
}

impl Tally {
    /// Type digit of the tally, `1` to `8`
    pub fn kind(&self) -> u32 {
        self.number % 10
    }

    fn detectors(tokens: &mut TokenDeque) -> Result<TallyRegions> {
        let no_direct = tokens.back() == Some("nd");
        if no_direct {
            tokens.pop_back()?;
        }

        if tokens.is_empty() || tokens.len() % 4 != 0 {
            return Err(InpError::syntax(f!(
                "point detectors need groups of 4 values, found {}",
                tokens.len()
            )));
        }

        let mut detectors = Vec::new();
        while !tokens.is_empty() {
            detectors.push(PointDetector {
                position: Vector3::pop(tokens, "detector position")?,
                radius: fields::pop(tokens, "exclusion radius")?,
            });
        }
        Ok(TallyRegions::Detectors {
            detectors,
            no_direct,
        })
    }
}

impl DataCard for Tally {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        let form = Form {
            prefixes: &['*', '+'],
            suffix: Suffix::Required(1..=MAX_NUMBER),
            designator: Allowed::Optional,
        };
        let number = form.check(mnemonic)?.unwrap_or_default();
        let kind = tally_type(number, &TALLY_TYPES)?;

        match (mnemonic.prefix, &mnemonic.designator) {
            (Some('+'), _) if kind != 6 && kind != 8 => {
                return Err(InpError::semantic(f!("+f{number} is only allowed on type 6 and 8 tallies")))
            }
            (Some('+'), Some(_)) if kind == 6 => {
                return Err(InpError::semantic("+f6 tallies take no particle designator"))
            }
            (Some('+'), None) if kind == 6 => (),
            (_, None) => return Err(InpError::semantic(f!("f{number} requires a particle designator"))),
            _ => (),
        }

        let regions = match kind {
            5 => Self::detectors(tokens)?,
            _ => TallyRegions::Bins(TallyBin::parse_list(&tokens.take_rest())?),
        };

        Ok(Self {
            number,
            prefix: mnemonic.prefix,
            designator: mnemonic.designator.clone(),
            regions,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("f")
            .with_prefix(self.prefix)
            .with_suffix(Some(self.number))
            .with_designator(self.designator.clone())
    }

    fn fields(&self) -> Vec<String> {
        match &self.regions {
            TallyRegions::Detectors {
                detectors,
                no_direct,
            } => {
                let mut tokens = Vec::new();
                for d in detectors {
                    tokens.extend(d.position.tokens());
                    tokens.push(d.radius.token());
                }
                if *no_direct {
                    tokens.push("nd".to_string());
                }
                tokens
            }
            TallyRegions::Bins(bins) => bins.iter().map(TallyBin::to_string).collect(),
        }
    }
}

/// `fcn text` tally comment
#[derive(Debug, Clone, PartialEq)]
pub struct TallyComment(pub FreeText);

impl DataCard for TallyComment {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        FreeText::read(mnemonic, tokens, &Form::suffixed(1..=MAX_NUMBER)).map(Self)
    }

    fn mnemonic(&self) -> Mnemonic {
        self.0.mnemonic.clone()
    }

    fn fields(&self) -> Vec<String> {
        self.0.tokens()
    }
}

/// `en`, `tn`, `cn`, and `fun` bin boundaries with trailing `nt` and `c` flags
#[derive(Debug, Clone, PartialEq)]
pub struct TallyBins {
    pub mnemonic: Mnemonic,
    pub values: Vec<f64>,
    /// `nt`, no total bin
    pub no_total: bool,
    /// `c`, cumulative bins
    pub cumulative: bool,
}

impl TallyBins {
    fn check(&self) -> Result<()> {
        let values = &self.values;
        match (self.mnemonic.name.as_str(), self.mnemonic.is_starred()) {
            ("e", _) => {
                values.iter().try_for_each(|e| fields::non_negative(*e, "energy bin").map(drop))?;
                fields::increasing(values, "energy bins")
            }
            ("t", _) => fields::increasing(values, "time bins"),
            ("c", false) => {
                values.iter().try_for_each(|c| fields::in_range(*c, -1.0..=1.0, "cosine bin").map(drop))?;
                fields::increasing(values, "cosine bins")?;
                match values.last() {
                    Some(last) if *last != 1.0 => Err(InpError::semantic("last cosine bin must be 1")),
                    _ => Ok(()),
                }
            }
            ("c", true) => {
                values.iter().try_for_each(|c| fields::in_range(*c, 0.0..=180.0, "angle bin").map(drop))?;
                let reversed = values.iter().rev().copied().collect::<Vec<f64>>();
                fields::increasing(&reversed, "angle bins")
            }
            _ => Ok(()),
        }
    }
}

impl DataCard for TallyBins {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        let prefixes: &'static [char] = match mnemonic.name.as_str() {
            "c" => &['*'],
            _ => &[],
        };
        let form = Form {
            prefixes,
            suffix: Suffix::Required(0..=MAX_NUMBER),
            designator: Allowed::Never,
        };
        form.check(mnemonic)?;

        let (mut no_total, mut cumulative) = (false, false);
        loop {
            match tokens.back() {
                Some("nt") if !no_total => no_total = true,
                Some("c") if !cumulative => cumulative = true,
                _ => break,
            }
            tokens.pop_back()?;
        }

        let values = match mnemonic.name.as_str() {
            "fu" => fields::rest::<f64>(tokens, "user bin")?,
            _ => fields::rest_required::<f64>(tokens, "bin boundary")?,
        };

        let bins = Self {
            mnemonic: mnemonic.clone(),
            values,
            no_total,
            cumulative,
        };
        bins.check()?;
        Ok(bins)
    }

    fn mnemonic(&self) -> Mnemonic {
        self.mnemonic.clone()
    }

    fn fields(&self) -> Vec<String> {
        let mut tokens = fields::tokens(&self.values);
        if self.no_total {
            tokens.push("nt".to_string());
        }
        if self.cumulative {
            tokens.push("c".to_string());
        }
        tokens
    }
}

token_enum! {
    /// Bin types that can be ordered on an `fq` card
    pub enum BinAxis {
        Cells => "f",
        Direct => "d",
        User => "u",
        Segments => "s",
        Multiplier => "m",
        Cosine => "c",
        Energy => "e",
        Time => "t",
    }
}

/// `fqn a1 a2 ...` print hierarchy of the tally bins
#[derive(Debug, Clone, PartialEq)]
pub struct PrintOrder {
    pub number: u32,
    pub axes: Vec<BinAxis>,
}

impl DataCard for PrintOrder {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        let number = MODIFIER_FORM.check(mnemonic)?.unwrap_or_default();
        let axes = fields::rest_required::<BinAxis>(tokens, "bin type")?;
        if let Some(repeated) = axes.iter().duplicates().next() {
            return Err(InpError::semantic(f!("bin type {repeated} given twice")));
        }
        Ok(Self { number, axes })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("fq").with_suffix(Some(self.number))
    }

    fn fields(&self) -> Vec<String> {
        fields::tokens(&self.axes)
    }
}

/// One multiplier bin: constant, material, and reaction list
#[derive(Debug, Clone, PartialEq)]
pub struct MultiplierSet {
    pub constant: f64,
    /// `0` for the cell material, `-1` for attenuators
    pub material: Option<i64>,
    /// Reaction numbers, possibly combined with `:`
    pub reactions: Vec<String>,
}

impl MultiplierSet {
    fn parse(tokens: &[String]) -> Result<Self> {
        let mut tokens = TokenDeque::from(tokens.to_vec());
        let constant = fields::pop::<f64>(&mut tokens, "multiplier constant")?;
        let material = fields::pop_optional::<i64>(&mut tokens, "multiplier material")?;
        let reactions = tokens.take_rest();
        if let Some(bad) = reactions
            .iter()
            .find(|r| !r.chars().all(|c| c.is_ascii_alphanumeric() || "+-:.".contains(c)))
        {
            return Err(InpError::invalid_token("reaction", bad));
        }
        Ok(Self {
            constant,
            material,
            reactions,
        })
    }

    fn tokens(&self) -> Vec<String> {
        let mut tokens = vec![self.constant.token()];
        tokens.extend(self.material.iter().map(i64::to_string));
        tokens.extend(self.reactions.iter().cloned());
        tokens
    }
}

/// `fmn (c m r...) (c m r...)` tally multipliers
#[derive(Debug, Clone, PartialEq)]
pub struct TallyMultiplier {
    pub number: u32,
    /// Written as parenthesised bins rather than one bare set
    pub grouped: bool,
    pub sets: Vec<MultiplierSet>,
}

impl DataCard for TallyMultiplier {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        let form = Form {
            prefixes: &['*'],
            suffix: Suffix::Required(0..=MAX_NUMBER),
            designator: Allowed::Never,
        };
        let number = form.check(mnemonic)?.unwrap_or_default();

        let mut pieces = options::split_pieces(tokens.take_rest());
        let grouped = pieces.front() == Some("(");

        let sets = match grouped {
            false => vec![MultiplierSet::parse(&pieces.take_rest())?],
            true => {
                let mut sets = Vec::new();
                while !pieces.is_empty() {
                    let group = options::take_group(&mut pieces, "fm")?;
                    if group.len() < 3 || group[0] != "(" {
                        return Err(InpError::syntax("multiplier bins must all be parenthesised"));
                    }
                    sets.push(MultiplierSet::parse(&group[1..group.len() - 1])?);
                }
                sets
            }
        };

        Ok(Self {
            number,
            grouped,
            sets,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("fm").with_suffix(Some(self.number))
    }

    fn fields(&self) -> Vec<String> {
        match self.grouped {
            true => self
                .sets
                .iter()
                .map(|s| f!("({})", s.tokens().join(" ")))
                .collect(),
            false => self.sets.iter().flat_map(MultiplierSet::tokens).collect(),
        }
    }
}

token_enum! {
    /// Interpolation of dose function tables
    pub enum Interpolation {
        Log => "log",
        Lin => "lin",
    }
}

/// `den` energies and `dfn` values of a dose function
#[derive(Debug, Clone, PartialEq)]
pub struct DoseFunction {
    pub mnemonic: Mnemonic,
    pub interpolation: Option<Interpolation>,
    pub values: Vec<f64>,
}

impl DataCard for DoseFunction {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        MODIFIER_FORM.check(mnemonic)?;

        let interpolation = match tokens.front().and_then(Interpolation::from_name) {
            Some(i) => {
                tokens.pop_front()?;
                Some(i)
            }
            None => None,
        };

        let values = fields::rest_required::<f64>(tokens, "dose function value")?;
        for v in &values {
            fields::non_negative(*v, "dose function value")?;
        }
        if mnemonic.name == "de" {
            fields::increasing(&values, "dose energies")?;
        }

        Ok(Self {
            mnemonic: mnemonic.clone(),
            interpolation,
            values,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        self.mnemonic.clone()
    }

    fn fields(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self.interpolation.iter().map(ToToken::token).collect();
        tokens.extend(fields::tokens(&self.values));
        tokens
    }
}

/// `emn`, `tmn`, and `cmn` multipliers per energy, time, or cosine bin
#[derive(Debug, Clone, PartialEq)]
pub struct BinMultipliers {
    pub mnemonic: Mnemonic,
    pub values: Vec<f64>,
}

impl DataCard for BinMultipliers {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        MODIFIER_FORM.check(mnemonic)?;
        let values = fields::rest_required::<f64>(tokens, "bin multiplier")?;
        Ok(Self {
            mnemonic: mnemonic.clone(),
            values,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        self.mnemonic.clone()
    }

    fn fields(&self) -> Vec<String> {
        fields::tokens(&self.values)
    }
}

/// `cfn` cell flagging and `sfn` surface flagging
#[derive(Debug, Clone, PartialEq)]
pub struct Flagging {
    pub mnemonic: Mnemonic,
    pub numbers: Vec<u32>,
}

impl DataCard for Flagging {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::suffixed(1..=MAX_NUMBER).check(mnemonic)?;
        let numbers = fields::rest_required::<u32>(tokens, "flagged number")?;
        for n in &numbers {
            fields::in_range(*n, 1..=MAX_NUMBER, "flagged number")?;
        }
        Ok(Self {
            mnemonic: mnemonic.clone(),
            numbers,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        self.mnemonic.clone()
    }

    fn fields(&self) -> Vec<String> {
        fields::tokens(&self.numbers)
    }
}

/// `fsn s1 s2 ... [t] [c]` tally segmenting surfaces
#[derive(Debug, Clone, PartialEq)]
pub struct Segments {
    pub number: u32,
    pub surfaces: Vec<i64>,
    pub total: bool,
    pub cumulative: bool,
}

impl DataCard for Segments {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        let number = Form::suffixed(1..=MAX_NUMBER).check(mnemonic)?.unwrap_or_default();

        let (mut total, mut cumulative) = (false, false);
        loop {
            match tokens.back() {
                Some("t") if !total => total = true,
                Some("c") if !cumulative => cumulative = true,
                _ => break,
            }
            tokens.pop_back()?;
        }

        let surfaces = fields::rest_required::<i64>(tokens, "segmenting surface")?;
        let max = MAX_NUMBER as i64;
        for s in &surfaces {
            if *s == 0 || s.abs() > max {
                return Err(InpError::semantic(f!("segmenting surface {s} out of range")));
            }
        }

        Ok(Self {
            number,
            surfaces,
            total,
            cumulative,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("fs").with_suffix(Some(self.number))
    }

    fn fields(&self) -> Vec<String> {
        let mut tokens = fields::tokens(&self.surfaces);
        if self.total {
            tokens.push("t".to_string());
        }
        if self.cumulative {
            tokens.push("c".to_string());
        }
        tokens
    }
}

/// `sdn d1 d2 ...` segment divisors (areas, volumes, or masses)
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentDivisors {
    pub number: u32,
    pub values: Vec<Entry<f64>>,
}

impl DataCard for SegmentDivisors {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        let number = MODIFIER_FORM.check(mnemonic)?.unwrap_or_default();
        let values = fields::rest_required::<Entry<f64>>(tokens, "segment divisor")?;
        fields::check_entries(&values, |v| fields::non_negative(*v, "segment divisor").map(drop))?;
        Ok(Self { number, values })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("sd").with_suffix(Some(self.number))
    }

    fn fields(&self) -> Vec<String> {
        fields::tokens(&self.values)
    }
}

/// `tfn if id iu is im ic ie it` bins used for the fluctuation chart
#[derive(Debug, Clone, PartialEq)]
pub struct TallyFluctuation {
    pub number: u32,
    pub bins: Vec<Entry<i64>>,
}

impl DataCard for TallyFluctuation {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        let number = Form::suffixed(1..=MAX_NUMBER).check(mnemonic)?.unwrap_or_default();
        let bins = data::bounded::<i64>(tokens, 8, "tf")?;
        fields::check_entries(&bins, |b| fields::in_range(*b, 1..=i64::MAX, "fluctuation bin").map(drop))?;
        Ok(Self { number, bins })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("tf").with_suffix(Some(self.number))
    }

    fn fields(&self) -> Vec<String> {
        fields::tokens(&self.bins)
    }
}

keyword_enum! {
    /// Special treatments of the `ft` card
    pub enum TreatmentKeyword {
        Geb => "geb", Reals;
        Tmc => "tmc", Reals;
        Inc => "inc", Flag;
        Phl => "phl", Reals;
        Cap => "cap", Integers;
        Res => "res", Integers;
        Frv => "frv", Vector;
        Fft => "fft", Texts;
        Com => "com", Flag;
        Scx => "scx", Integer;
        Scd => "scd", Flag;
        Elc => "elc", Integer;
        Ptt => "ptt", Flag;
        Icd => "icd", Flag;
        Tag => "tag", Integer;
        Pds => "pds", Integers;
    }
}

impl Keyword for TreatmentKeyword {
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
            (Self::Geb, OptionValue::Reals(v)) if v.len() != 3 => {
                Err(InpError::syntax(f!("geb needs 3 parameters, found {}", v.len())))
            }
            (Self::Tmc, OptionValue::Reals(v)) if v.len() != 2 => {
                Err(InpError::syntax(f!("tmc needs 2 parameters, found {}", v.len())))
            }
            (Self::Elc, OptionValue::Integer(c)) => fields::in_range(*c, 1..=3, "elc").map(drop),
            (Self::Tag, OptionValue::Integer(c)) => fields::in_range(*c, 1..=3, "tag").map(drop),
            _ => Ok(()),
        }
    }
}

/// `ftn id p1 p2 ... id p1 ...` special tally treatments
#[derive(Debug, Clone, PartialEq)]
pub struct SpecialTreatments {
    pub number: u32,
    pub options: Vec<KeywordOption<TreatmentKeyword>>,
}

impl DataCard for SpecialTreatments {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        let number = Form::suffixed(1..=MAX_NUMBER).check(mnemonic)?.unwrap_or_default();
        let options = options::scan::<TreatmentKeyword>(tokens)?;
        if options.is_empty() {
            return Err(InpError::too_few("special treatment"));
        }
        Ok(Self { number, options })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("ft").with_suffix(Some(self.number))
    }

    /// Treatments are written with their parameters after a blank, not `=`
    fn fields(&self) -> Vec<String> {
        self.options
            .iter()
            .map(|o| match o.value {
                OptionValue::Flag => o.key(),
                _ => f!("{} {}", o.key(), o.value.text()),
            })
            .collect()
    }
}

keyword_enum! {
    /// Options of the `fmesh` card
    pub enum MeshTallyKeyword {
        Geom => "geom", Choice(&["xyz", "rec", "cyl", "rzt"]);
        Origin => "origin", Vector;
        Axs => "axs", Vector;
        Vec => "vec", Vector;
        Imesh => "imesh", Reals;
        Iints => "iints", Integers;
        Jmesh => "jmesh", Reals;
        Jints => "jints", Integers;
        Kmesh => "kmesh", Reals;
        Kints => "kints", Integers;
        Emesh => "emesh", Reals;
        Eints => "eints", Integers;
        Tmesh => "tmesh", Reals;
        Tints => "tints", Integers;
        Factor => "factor", Real;
        Out => "out", Choice(&["col", "cf", "ij", "ik", "jk", "none", "xdmf"]);
        Tr => "tr", Integer;
        Inc => "inc", Reals;
        Type => "type", Choice(&["flux", "source"]);
    }
}

impl Keyword for MeshTallyKeyword {
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
            (Self::Imesh | Self::Jmesh | Self::Kmesh | Self::Emesh | Self::Tmesh, OptionValue::Reals(v)) => {
                let values = v.iter().filter_map(|e| e.value().copied()).collect::<Vec<f64>>();
                fields::increasing(&values, self.as_str())
            }
            (Self::Iints | Self::Jints | Self::Kints | Self::Eints | Self::Tints, OptionValue::Integers(v)) => {
                fields::check_entries(v, |n| fields::in_range(*n, 1..=i64::MAX, self.as_str()).map(drop))
            }
            (Self::Tr, OptionValue::Integer(n)) => fields::in_range(*n, 1..=999, "tr").map(drop),
            _ => Ok(()),
        }
    }
}

/// `[*]fmeshn:<pl> geom= origin= imesh= ...` superimposed mesh tally
#[derive(Debug, Clone, PartialEq)]
pub struct MeshTally {
    pub number: u32,
    pub starred: bool,
    pub designator: Designator,
    pub options: Vec<KeywordOption<MeshTallyKeyword>>,
}

impl DataCard for MeshTally {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        let form = Form {
            prefixes: &['*'],
            suffix: Suffix::Required(1..=MAX_NUMBER),
            designator: Allowed::Required,
        };
        let number = form.check(mnemonic)?.unwrap_or_default();
        tally_type(number, &[4])?;
        let designator = mnemonic.required_designator()?;
        let options = options::scan::<MeshTallyKeyword>(tokens)?;

        for required in [MeshTallyKeyword::Imesh, MeshTallyKeyword::Jmesh, MeshTallyKeyword::Kmesh] {
            if options::find(&options, required).is_none() {
                return Err(InpError::semantic(f!("fmesh{number} requires {required}")));
            }
        }

        Ok(Self {
            number,
            starred: mnemonic.is_starred(),
            designator,
            options,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("fmesh")
            .with_prefix(self.starred.then_some('*'))
            .with_suffix(Some(self.number))
            .with_designator(Some(self.designator.clone()))
    }

    fn fields(&self) -> Vec<String> {
        options::texts(&self.options)
    }
}

/// `notrn`, direct source contributions only
#[derive(Debug, Clone, PartialEq)]
pub struct NoTransport;

impl DataCard for NoTransport {
    fn from_tokens(mnemonic: &Mnemonic, _tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        Ok(Self)
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("notrn")
    }

    fn fields(&self) -> Vec<String> {
        Vec::new()
    }
}

keyword_enum! {
    /// Options of the `pert` card
    pub enum PerturbationKeyword {
        Cell => "cell", Integers;
        Mat => "mat", Integer;
        Rho => "rho", Real;
        Method => "method", Integer;
        Erg => "erg", Reals;
        Rxn => "rxn", Integers;
    }
}

impl Keyword for PerturbationKeyword {
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
            (Self::Method, OptionValue::Integer(m)) => {
                fields::one_of(*m, &[-3, -2, -1, 1, 2, 3], "method").map(drop)
            }
            (Self::Mat, OptionValue::Integer(m)) => {
                fields::in_range(*m, 0..=MAX_NUMBER as i64, "mat").map(drop)
            }
            (Self::Erg, OptionValue::Reals(v)) if v.len() != 2 => {
                Err(InpError::syntax(f!("erg needs 2 bounds, found {}", v.len())))
            }
            _ => Ok(()),
        }
    }
}

/// `pertn:<pl> cell= mat= rho= ...` perturbation
#[derive(Debug, Clone, PartialEq)]
pub struct Perturbation {
    pub number: u32,
    pub designator: Designator,
    pub options: Vec<KeywordOption<PerturbationKeyword>>,
}

impl DataCard for Perturbation {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        let form = Form {
            prefixes: &[],
            suffix: Suffix::Required(1..=MAX_NUMBER),
            designator: Allowed::Required,
        };
        let number = form.check(mnemonic)?.unwrap_or_default();
        let designator = mnemonic.required_designator()?;
        let options = options::scan::<PerturbationKeyword>(tokens)?;

        if options::find(&options, PerturbationKeyword::Cell).is_none() {
            return Err(InpError::semantic(f!("pert{number} requires cell")));
        }
        let mat = options::find(&options, PerturbationKeyword::Mat);
        let rho = options::find(&options, PerturbationKeyword::Rho);
        if mat.is_none() && rho.is_none() {
            return Err(InpError::semantic(f!("pert{number} requires mat or rho")));
        }

        Ok(Self {
            number,
            designator,
            options,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("pert")
            .with_suffix(Some(self.number))
            .with_designator(Some(self.designator.clone()))
    }

    fn fields(&self) -> Vec<String> {
        options::texts(&self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Datum, Variant};
    use rstest::rstest;

    #[rstest]
    #[case("f1:n 1 2 3 t")]
    #[case("*f2:p (1 2) 3")]
    #[case("f4:n (1 2 < 3 < 4) 5")]
    #[case("f4:n ((1 2) < 3)")]
    #[case("f5:n 0 0 0 1 10 0 0 -1")]
    #[case("f5:p 0 0 10 0.5 nd")]
    #[case("+f6 1 2")]
    #[case("+f8:e 1")]
    #[case("fc4 flux in the inner shell")]
    #[case("e0 0.1 1 10")]
    #[case("e4 1 10 20 nt")]
    #[case("t4 10 100 c")]
    #[case("c1 -0.5 0 1")]
    #[case("*c1 90 45 0")]
    #[case("fu4 1 2 3")]
    #[case("fq4 e f")]
    #[case("fm4 -1 1 -4")]
    #[case("fm14 (1 1 -6 -8) (2 3 16:17)")]
    #[case("de4 log 1 2 3")]
    #[case("df4 0.5 1 2")]
    #[case("em4 1 2")]
    #[case("cf4 1 2")]
    #[case("sf1 10")]
    #[case("fs4 -10 20 t c")]
    #[case("sd4 1 j 2.5")]
    #[case("tf4 1 j 2")]
    #[case("ft8 geb 0.001 0.002 0.3 phl 1 2 1 0")]
    #[case("ft4 inc")]
    #[case("fmesh14:n geom=xyz origin=-10 -10 -10 imesh=10 iints=2 jmesh=10 jints=2 kmesh=10 kints=2")]
    #[case("notrn")]
    #[case("pert1:n cell=1 2 rho=-1 method=2")]
    fn canonical(#[case] text: &str) {
        assert_eq!(Datum::parse(text).unwrap().to_text(), text);
    }

    #[rstest]
    #[case("f3:n 1")]
    #[case("f4 1")]
    #[case("+f4:n 1")]
    #[case("+f6:n 1")]
    #[case("f4:n (1 2")]
    #[case("f4:n (1 < )")]
    #[case("f4:n 1 ) 2")]
    #[case("f4:n 0")]
    #[case("f4:n")]
    #[case("f5:n 0 0 0")]
    #[case("e4 10 1")]
    #[case("e4")]
    #[case("c4 -0.5 0.5")]
    #[case("c4 2 1")]
    #[case("*e4 1")]
    #[case("fq4 e e")]
    #[case("fq4 x")]
    #[case("fm4 (1 1 2) 3")]
    #[case("de4 2 1")]
    #[case("fs4 0")]
    #[case("tf4 1 2 3 4 5 6 7 8 9")]
    #[case("ft4 geb 1 2")]
    #[case("ft4")]
    #[case("fmesh4:n imesh=10 jmesh=10")]
    #[case("fmesh12:n imesh=1 jmesh=1 kmesh=1")]
    #[case("pert1:n rho=1")]
    #[case("pert1:n cell=1")]
    #[case("pert1:n cell=1 rho=1 method=4")]
    #[case("notrn 1")]
    fn rejected(#[case] text: &str) {
        assert!(Datum::parse(text).is_err(), "{text}");
    }

    #[test]
    fn tally_fields() {
        let Datum::Tally(tally) = Datum::parse("f24:n,p 1 (2 3) t").unwrap() else {
            panic!("not a tally");
        };
        assert_eq!(tally.kind(), 4);
        assert_eq!(tally.designator.unwrap().to_string(), "n,p");
        match tally.regions {
            TallyRegions::Bins(bins) => {
                assert_eq!(bins[0], TallyBin::Number(1));
                assert_eq!(
                    bins[1],
                    TallyBin::Group(vec![vec![TallyBin::Number(2), TallyBin::Number(3)]])
                );
                assert_eq!(bins[2], TallyBin::Total);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
