//! Physics data cards
//!
//! `mode` lists the transported particles. The `phys:<pl>` card has a
//! different field layout for every particle family, so it resolves its
//! designator first and reads the entries against that layout.

// internal modules
use crate::cards::data::{self, checks, value_list, DataCard, Form, ListRule, Suffix};
use crate::cards::fields::{self, Entry, FromToken, ToToken, MAX_NUMBER};
use crate::cards::options::{self, keyword_enum, token_enum, Allowed, Keyword, KeywordOption, OptionValue, ValueKind};
use crate::cards::Mnemonic;
use crate::error::{InpError, Result};
use crate::particle::{Designator, Particle, ParticleKind};
use crate::tokens::TokenDeque;
use crate::utils::f;

// external crates
use itertools::Itertools;
use log::trace;

/// `mode p1 p2 ...` particles to transport
///
/// ```rust
/// # use inpdeck::cards::{Datum, Variant};
/// # use inpdeck::particle::Particle;
/// let Datum::Mode(mode) = Datum::parse("mode n p").unwrap() else { panic!() };
/// assert_eq!(mode.particles, vec![Particle::Neutron, Particle::Photon]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Mode {
    pub particles: Vec<Particle>,
}

impl DataCard for Mode {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        if tokens.is_empty() {
            return Err(InpError::too_few("particle"));
        }

        let particles = tokens
            .take_rest()
            .iter()
            .map(|t| Particle::try_from(t.as_str()))
            .collect::<Result<Vec<Particle>>>()?;

        if let Some(repeated) = particles.iter().duplicates().next() {
            return Err(InpError::semantic(f!("particle {repeated} given twice")));
        }
        Ok(Self { particles })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("mode")
    }

    fn fields(&self) -> Vec<String> {
        self.particles.iter().map(Particle::to_string).collect()
    }
}

/// Entry names of the `phys` card for each particle family
///
/// Families without a named layout are only checked for their length.
pub fn physics_layout(kind: ParticleKind) -> &'static [&'static str] {
    match kind {
        ParticleKind::Neutron => &[
            "emax", "emcnf", "iunr", "colif", "cutn", "ngam", "i_int_model", "i_els_model",
        ],
        ParticleKind::Photon => &["emcpf", "ides", "nocoh", "ispn", "nodop", "fism"],
        ParticleKind::Proton => &[
            "emax", "ean", "tabl", "istrg", "recl", "i_mcs_model", "i_int_model",
            "i_els_model", "efac", "ckvnum",
        ],
        ParticleKind::Electron | ParticleKind::Other => &[],
    }
}

/// Largest number of `phys` entries for each particle family
pub fn physics_limit(kind: ParticleKind) -> usize {
    match kind {
        ParticleKind::Neutron => 8,
        ParticleKind::Photon => 6,
        ParticleKind::Electron => 18,
        ParticleKind::Proton => 10,
        ParticleKind::Other => 12,
    }
}

/// `phys:<pl> e1 e2 ...` physics options of a single particle
#[derive(Debug, Clone, PartialEq)]
pub struct Physics {
    pub designator: Designator,
    pub kind: ParticleKind,
    pub entries: Vec<Entry<f64>>,
}

impl Physics {
    /// Entry by its name in the layout of the particle family
    pub fn get(&self, name: &str) -> Option<&Entry<f64>> {
        let index = physics_layout(self.kind).iter().position(|n| *n == name)?;
        self.entries.get(index)
    }
}

impl DataCard for Physics {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PARTICLE.check(mnemonic)?;
        let designator = mnemonic.required_designator()?;
        let kind = designator.resolve().ok_or_else(|| {
            InpError::semantic(f!("phys takes a single particle, found \"{designator}\""))
        })?;
        trace!("  phys layout {kind:?}");

        let entries = data::bounded::<f64>(tokens, physics_limit(kind), "phys")?;
        if let Some(Entry::Value(first)) = entries.first() {
            fields::positive(*first, "upper energy")?;
        }

        Ok(Self {
            designator,
            kind,
            entries,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("phys").with_designator(Some(self.designator.clone()))
    }

    fn fields(&self) -> Vec<String> {
        fields::tokens(&self.entries)
    }
}

value_list! {
    /// `tmpn t1 t2 ...` cell temperatures in MeV at time index `n`
    pub Temperatures(f64) = ListRule {
        form: Form {
            prefixes: &[],
            suffix: Suffix::Optional(1..=99),
            designator: Allowed::Never,
        },
        field: "temperature",
        allow_empty: false,
        check: checks::positive,
    };
}

/// `thtme t1 t2 ...` times of the `tmp` cards, in shakes
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureTimes {
    pub times: Vec<f64>,
}

impl DataCard for TemperatureTimes {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        let times = fields::rest_required::<f64>(tokens, "temperature time")?;
        for t in &times {
            fields::non_negative(*t, "temperature time")?;
        }
        fields::increasing(&times, "temperature times")?;
        Ok(Self { times })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("thtme")
    }

    fn fields(&self) -> Vec<String> {
        fields::tokens(&self.times)
    }
}

/// `cut:<pl> t e wc1 wc2 swtm` time, energy, and weight cutoffs
#[derive(Debug, Clone, PartialEq)]
pub struct Cutoffs {
    pub designator: Designator,
    pub entries: Vec<Entry<f64>>,
}

impl DataCard for Cutoffs {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PARTICLE.check(mnemonic)?;
        let designator = mnemonic.required_designator()?;
        let entries = data::bounded::<f64>(tokens, 5, "cut")?;
        if let Some(Entry::Value(energy)) = entries.get(1) {
            fields::non_negative(*energy, "energy cutoff")?;
        }
        Ok(Self {
            designator,
            entries,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("cut").with_designator(Some(self.designator.clone()))
    }

    fn fields(&self) -> Vec<String> {
        fields::tokens(&self.entries)
    }
}

value_list! {
    /// `elpt:<pl> x1 x2 ...` energy cutoff of every cell
    pub EnergyCutoffs(f64) = ListRule {
        form: Form::PARTICLE,
        field: "energy cutoff",
        allow_empty: false,
        check: checks::non_negative,
    };
}

/// `lca lcb lcc lea leb` physics model parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParameters {
    pub mnemonic: Mnemonic,
    pub entries: Vec<Entry<f64>>,
}

impl ModelParameters {
    /// Number of entries each model card takes at most
    pub fn limit(name: &str) -> usize {
        match name {
            "lca" => 13,
            "lcb" => 6,
            "lcc" => 3,
            "lea" => 8,
            "leb" => 4,
            _ => 0,
        }
    }
}

impl DataCard for ModelParameters {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        let limit = Self::limit(&mnemonic.name);
        let entries = data::bounded::<f64>(tokens, limit, &mnemonic.name)?;
        Ok(Self {
            mnemonic: mnemonic.clone(),
            entries,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        self.mnemonic.clone()
    }

    fn fields(&self) -> Vec<String> {
        fields::tokens(&self.entries)
    }
}

keyword_enum! {
    /// Options of the `act` card for delayed particle emission
    pub enum ActivationKeyword {
        Fission => "fission", Texts;
        Nonfiss => "nonfiss", Texts;
        Dn => "dn", Choice(&["model", "library", "both", "prompt"]);
        Dg => "dg", Choice(&["line", "mg", "none"]);
        Thresh => "thresh", Real;
        Dnbias => "dnbias", Integer;
        Nap => "nap", Integer;
        Pecut => "pecut", Real;
        Hlcut => "hlcut", Real;
        Sample => "sample", Choice(&["correlate", "nonfiss_restrict"]);
    }
}

impl Keyword for ActivationKeyword {
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
            (Self::Thresh | Self::Pecut | Self::Hlcut, OptionValue::Real(x)) => {
                fields::non_negative(*x, self.as_str()).map(drop)
            }
            (Self::Dnbias | Self::Nap, OptionValue::Integer(n)) => {
                fields::in_range(*n, 0..=i64::MAX, self.as_str()).map(drop)
            }
            _ => Ok(()),
        }
    }
}

/// `act keyword=value ...` delayed neutron and gamma options
#[derive(Debug, Clone, PartialEq)]
pub struct Activation {
    pub options: Vec<KeywordOption<ActivationKeyword>>,
}

impl DataCard for Activation {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        let options = options::scan::<ActivationKeyword>(tokens)?;
        Ok(Self { options })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("act")
    }

    fn fields(&self) -> Vec<String> {
        options::texts(&self.options)
    }
}

value_list! {
    /// `cosy m1 m2 ...` COSY map number of every cell, `0` for none
    pub CosyMaps(i64) = ListRule {
        form: Form::PLAIN,
        field: "map number",
        allow_empty: false,
        check: checks::unsigned,
    };
}

token_enum! {
    /// Kind of magnetic field on a `bfld` card
    pub enum FieldType {
        Const => "const",
        Quad => "quad",
        Quadff => "quadff",
    }
}

keyword_enum! {
    /// Options of the `bfld` card
    pub enum FieldKeyword {
        Field => "field", Reals;
        Vec => "vec", Vector;
        Axs => "axs", Vector;
        Refpnt => "refpnt", Vector;
        Maxdeflc => "maxdeflc", Real;
        Maxstep => "maxstep", Real;
        Ffedges => "ffedges", Integers;
        Mappars => "mappars", Reals;
    }
}

impl Keyword for FieldKeyword {
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
            (Self::Maxdeflc | Self::Maxstep, OptionValue::Real(x)) => {
                fields::positive(*x, self.as_str()).map(drop)
            }
            (Self::Axs | Self::Vec, OptionValue::Vector(v)) if v.is_zero() => {
                Err(InpError::semantic(f!("{self} must not be a zero vector")))
            }
            _ => Ok(()),
        }
    }
}

/// `bfldn type keyword=value ...` magnetic field definition
///
/// ```rust
/// # use inpdeck::cards::{Datum, Variant};
/// let card = Datum::parse("bfld1 const field=0.5 vec=0 0 1").unwrap();
/// assert_eq!(card.id(), "bfld1");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MagneticField {
    pub number: u32,
    pub field: FieldType,
    pub options: Vec<KeywordOption<FieldKeyword>>,
}

impl DataCard for MagneticField {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        let number = Form::suffixed(1..=MAX_NUMBER).check(mnemonic)?.unwrap_or_default();
        let field = FieldType::from_token(&tokens.pop_front()?, "field type")?;
        let options = options::scan::<FieldKeyword>(tokens)?;
        Ok(Self {
            number,
            field,
            options,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("bfld").with_suffix(Some(self.number))
    }

    fn fields(&self) -> Vec<String> {
        let mut tokens = vec![self.field.token()];
        tokens.extend(options::texts(&self.options));
        tokens
    }
}

value_list! {
    /// `bflcl n1 n2 ...` magnetic field number of every cell, `0` for none
    pub FieldCells(i64) = ListRule {
        form: Form::PLAIN,
        field: "field number",
        allow_empty: false,
        check: checks::unsigned,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Datum, Variant};
    use rstest::rstest;

    #[rstest]
    #[case("mode n")]
    #[case("mode n p e")]
    #[case("phys:n 20 0 0 j j j")]
    #[case("phys:p 100 0 0 0 1")]
    #[case("phys:e 100 j j j j j j j j j j j j j j j j 0")]
    #[case("tmp 2.53e-8 j 1e-7")]
    #[case("tmp2 2.53e-8")]
    #[case("thtme 0 100")]
    #[case("cut:n 1e10 0.001")]
    #[case("cut:p j 0.01 -0.5 -0.25 0")]
    #[case("elpt:n 0 1 j")]
    #[case("lca 2 1 1 23 1 1 0 1 1 0 0 0 1")]
    #[case("lea 1 4 1 0 1 0 0 1")]
    #[case("act fission=n p nonfiss=none dn=model dg=line")]
    #[case("cosy 0 1 2")]
    #[case("bfld1 const field=0.5 vec=0 0 1")]
    #[case("bfld2 quad field=2 axs=0 0 1 refpnt=0 0 0")]
    #[case("bflcl 0 1 2")]
    fn canonical(#[case] text: &str) {
        assert_eq!(Datum::parse(text).unwrap().to_text(), text);
    }

    #[rstest]
    #[case("mode")]
    #[case("mode n n")]
    #[case("mode w")]
    #[case("phys 20")]
    #[case("phys:n,p 20")]
    #[case("phys:n 0")]
    #[case("phys:n 1 2 3 4 5 6 7 8 9")]
    #[case("tmp 0")]
    #[case("tmp100 1")]
    #[case("thtme 10 5")]
    #[case("cut:n 1 2 3 4 5 6")]
    #[case("cut 1")]
    #[case("elpt 1")]
    #[case("lcc 1 2 3 4")]
    #[case("act dn=never")]
    #[case("cosy -1")]
    #[case("bfld1 dipole")]
    #[case("bfld1 const vec=0 0 0")]
    #[case("bfld const")]
    fn rejected(#[case] text: &str) {
        assert!(Datum::parse(text).is_err(), "{text}");
    }

    #[test]
    fn layout_by_particle() {
        let Datum::Physics(phys) = Datum::parse("phys:n 20 0 1").unwrap() else {
            panic!("not a phys card");
        };
        assert_eq!(phys.kind, ParticleKind::Neutron);
        assert_eq!(phys.get("emax"), Some(&Entry::Value(20.0)));
        assert_eq!(phys.get("iunr"), Some(&Entry::Value(1.0)));
        assert_eq!(phys.get("cutn"), None);
        assert_eq!(phys.get("ides"), None);
        assert_eq!(physics_limit(ParticleKind::Electron), 18);
    }
}
