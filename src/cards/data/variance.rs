//! Variance reduction data cards
//!
//! Importances, splitting, exponential transform, weight windows, DXTRAN, and
//! the detector and bremsstrahlung biasing cards.

// internal modules
use crate::cards::cell::check_exponential;
use crate::cards::data::{self, checks, value_list, DataCard, Form, ListRule, Suffix};
use crate::cards::fields::{self, Entry, ToToken, Vector3, MAX_NUMBER};
use crate::cards::options::{self, keyword_enum, Allowed, Keyword, KeywordOption, ValueKind};
use crate::cards::Mnemonic;
use crate::error::{InpError, Result};
use crate::particle::Designator;
use crate::tokens::TokenDeque;
use crate::utils::f;

value_list! {
    /// `imp:<pl> x1 x2 ...` cell importances
    pub Importances(f64) = ListRule {
        form: Form::PARTICLE,
        field: "importance",
        allow_empty: false,
        check: checks::non_negative,
    };
}

value_list! {
    /// `ext:<pl> a1 a2 ...` exponential transform per cell
    pub Exponential(String) = ListRule {
        form: Form::PARTICLE,
        field: "exponential transform",
        allow_empty: false,
        check: |v| check_exponential(v),
    };
}

value_list! {
    /// `fcl:<pl> x1 x2 ...` forced collision control per cell
    pub ForcedCollisions(f64) = ListRule {
        form: Form::PARTICLE,
        field: "forced collision",
        allow_empty: false,
        check: checks::cosine,
    };
}

value_list! {
    /// `wwn<i>:<pl> w1 w2 ...` lower weight window bounds for energy group `i`
    pub WindowLimits(f64) = ListRule {
        form: Form {
            prefixes: &[],
            suffix: Suffix::Required(1..=99),
            designator: Allowed::Required,
        },
        field: "weight window bound",
        allow_empty: false,
        check: |v| match *v >= 0.0 || *v == -1.0 {
            true => Ok(()),
            false => Err(InpError::semantic("weight window bound must be -1 or not negative")),
        },
    };
}

value_list! {
    /// `pd<n> p1 p2 ...` detector contribution probabilities for tally `n`
    pub DetectorContributions(f64) = ListRule {
        form: Form::suffixed(1..=MAX_NUMBER),
        field: "detector contribution",
        allow_empty: false,
        check: checks::non_negative,
    };
}

value_list! {
    /// `dxc<m>:<pl> p1 p2 ...` DXTRAN contribution probabilities
    pub DxtranContributions(f64) = ListRule {
        form: Form {
            prefixes: &[],
            suffix: Suffix::Optional(1..=MAX_NUMBER),
            designator: Allowed::Required,
        },
        field: "dxtran contribution",
        allow_empty: false,
        check: checks::fraction,
    };
}

value_list! {
    /// `pwt w1 w2 ...` photon production weights
    pub PhotonWeights(f64) = ListRule {
        form: Form::PLAIN,
        field: "photon weight",
        allow_empty: false,
        check: checks::any,
    };
}

/// `esplt:<pl>` and `tsplt:<pl>`, pairs of splitting ratio and energy or time
#[derive(Debug, Clone, PartialEq)]
pub struct Splitting {
    /// Time rather than energy splitting
    pub time: bool,
    pub designator: Designator,
    pub pairs: Vec<(f64, f64)>,
}

impl DataCard for Splitting {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PARTICLE.check(mnemonic)?;
        let designator = mnemonic.required_designator()?;

        let pairs = data::pairs::<f64, f64>(tokens, "splitting ratio", "splitting boundary")?;
        if pairs.is_empty() || pairs.len() > 20 {
            return Err(InpError::semantic(f!(
                "{} needs 1 to 20 ratio pairs, found {}",
                mnemonic.name,
                pairs.len()
            )));
        }
        for (ratio, boundary) in &pairs {
            fields::positive(*ratio, "splitting ratio")?;
            fields::non_negative(*boundary, "splitting boundary")?;
        }

        Ok(Self {
            time: mnemonic.name == "tsplt",
            designator,
            pairs,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        let name = match self.time {
            true => "tsplt",
            false => "esplt",
        };
        Mnemonic::new(name).with_designator(Some(self.designator.clone()))
    }

    fn fields(&self) -> Vec<String> {
        data::pair_tokens(&self.pairs)
    }
}

/// `vect vm1 x y z vm2 x y z ...` exponential transform direction vectors
#[derive(Debug, Clone, PartialEq)]
pub struct Vectors {
    pub vectors: Vec<(u32, Vector3)>,
}

impl DataCard for Vectors {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;

        let mut vectors = Vec::new();
        while let Some(label) = tokens.front() {
            let number = label
                .strip_prefix('v')
                .and_then(|n| n.parse::<u32>().ok())
                .ok_or_else(|| InpError::invalid_token("vector label vm", label))?;
            tokens.pop_front()?;
            vectors.push((number, Vector3::pop(tokens, "vector")?));
        }

        if vectors.is_empty() {
            return Err(InpError::too_few("a vector"));
        }
        Ok(Self { vectors })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("vect")
    }

    fn fields(&self) -> Vec<String> {
        self.vectors
            .iter()
            .flat_map(|(n, v)| {
                let mut tokens = vec![f!("v{n}")];
                tokens.extend(v.tokens());
                tokens
            })
            .collect()
    }
}

/// `wwe`, `wwt`, `wwge`, and `wwgt`: energy or time group bounds
#[derive(Debug, Clone, PartialEq)]
pub struct WindowBounds {
    pub mnemonic: Mnemonic,
    pub bounds: Vec<f64>,
}

impl DataCard for WindowBounds {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PARTICLE.check(mnemonic)?;

        let bounds = fields::rest_required::<f64>(tokens, "window bound")?;
        if bounds.len() > 99 {
            return Err(InpError::semantic(f!(
                "{} allows at most 99 bounds, found {}",
                mnemonic.name,
                bounds.len()
            )));
        }
        for bound in &bounds {
            fields::positive(*bound, "window bound")?;
        }
        fields::increasing(&bounds, "window bounds")?;

        Ok(Self {
            mnemonic: mnemonic.clone(),
            bounds,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        self.mnemonic.clone()
    }

    fn fields(&self) -> Vec<String> {
        fields::tokens(&self.bounds)
    }
}

/// `wwp:<pl> wupn wsurvn mxspln mwhere switchn mtime wnrm etsplt wu nmfp`
#[derive(Debug, Clone, PartialEq)]
pub struct WindowParameters {
    pub designator: Designator,
    pub entries: Vec<Entry<f64>>,
}

impl WindowParameters {
    const NAMES: [&'static str; 10] = [
        "wupn", "wsurvn", "mxspln", "mwhere", "switchn", "mtime", "wnrm", "etsplt", "wu",
        "nmfp",
    ];

    /// Entry by its name, `None` when absent or a jump
    pub fn get(&self, name: &str) -> Option<f64> {
        let index = Self::NAMES.iter().position(|n| *n == name)?;
        self.entries.get(index).and_then(|e| e.value().copied())
    }
}

impl DataCard for WindowParameters {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PARTICLE.check(mnemonic)?;
        let designator = mnemonic.required_designator()?;
        let entries = data::bounded::<f64>(tokens, 10, "wwp")?;

        let params = Self {
            designator,
            entries,
        };

        if let Some(wupn) = params.get("wupn") {
            fields::in_range(wupn, 2.0..=f64::MAX, "wupn")?;
        }
        if let Some(wsurvn) = params.get("wsurvn") {
            let upper = params.get("wupn").unwrap_or(5.0);
            if wsurvn <= 1.0 || wsurvn >= upper {
                return Err(InpError::semantic(f!(
                    "wsurvn must lie between 1 and wupn, found {}",
                    wsurvn.token()
                )));
            }
        }
        if let Some(mxspln) = params.get("mxspln") {
            fields::in_range(mxspln, 1.0..=f64::MAX, "mxspln")?;
        }
        if let Some(mwhere) = params.get("mwhere") {
            fields::one_of(mwhere, &[-1.0, 0.0, 1.0], "mwhere")?;
        }
        if let Some(mtime) = params.get("mtime") {
            fields::one_of(mtime, &[0.0, 1.0], "mtime")?;
        }

        Ok(params)
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("wwp").with_designator(Some(self.designator.clone()))
    }

    fn fields(&self) -> Vec<String> {
        fields::tokens(&self.entries)
    }
}

/// `wwg it ic wg j j j j ie` weight window generator
#[derive(Debug, Clone, PartialEq)]
pub struct WindowGenerator {
    pub tally: u32,
    /// Reference cell, `0` for a mesh based generator
    pub cell: i64,
    pub lower: Option<Entry<f64>>,
    /// Unused placeholders and the energy/time flag
    pub trailing: Vec<Entry<i64>>,
}

impl DataCard for WindowGenerator {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;

        let tally = fields::pop::<u32>(tokens, "generator tally")?;
        let tally = fields::in_range(tally, 1..=MAX_NUMBER, "generator tally")?;
        let cell = fields::pop::<i64>(tokens, "reference cell")?;
        checks::number(&cell)?;
        let lower = fields::pop_optional::<Entry<f64>>(tokens, "window lower bound")?;
        if let Some(lower) = &lower {
            lower.check(|v| fields::non_negative(*v, "window lower bound").map(drop))?;
        }
        let trailing = data::bounded::<i64>(tokens, 5, "wwg")?;
        if let Some(Entry::Value(ie)) = trailing.get(4) {
            fields::one_of(*ie, &[0, 1, 2], "wwg energy flag")?;
        }

        Ok(Self {
            tally,
            cell,
            lower,
            trailing,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("wwg")
    }

    fn fields(&self) -> Vec<String> {
        let mut tokens = vec![self.tally.to_string(), self.cell.to_string()];
        tokens.extend(self.lower.iter().map(ToToken::token));
        tokens.extend(fields::tokens(&self.trailing));
        tokens
    }
}

keyword_enum! {
    /// Options of the weight window `mesh` card
    pub enum MeshKeyword {
        Geom => "geom", Choice(&["xyz", "rec", "cyl", "rzt", "sph", "rpt"]);
        Ref => "ref", Vector;
        Origin => "origin", Vector;
        Axs => "axs", Vector;
        Vec => "vec", Vector;
        Imesh => "imesh", Reals;
        Iints => "iints", Integers;
        Jmesh => "jmesh", Reals;
        Jints => "jints", Integers;
        Kmesh => "kmesh", Reals;
        Kints => "kints", Integers;
    }
}

impl Keyword for MeshKeyword {
    fn resolve(name: &str) -> Option<Self> {
        Self::from_name(name)
    }

    fn name(&self) -> &'static str {
        self.as_str()
    }

    fn kind(&self) -> ValueKind {
        self.value_kind()
    }
}

/// `mesh geom=... ref=... imesh=...` superimposed weight window mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub options: Vec<KeywordOption<MeshKeyword>>,
}

impl DataCard for Mesh {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        let options = options::scan::<MeshKeyword>(tokens)?;
        if options::find(&options, MeshKeyword::Ref).is_none() {
            return Err(InpError::semantic("mesh requires a ref point"));
        }
        Ok(Self { options })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("mesh")
    }

    fn fields(&self) -> Vec<String> {
        options::texts(&self.options)
    }
}

/// One DXTRAN sphere: centre with inner and outer radii
#[derive(Debug, Clone, PartialEq)]
pub struct DxtranSphere {
    pub centre: Vector3,
    pub inner: f64,
    pub outer: f64,
}

/// `dxt:<pl> x y z ri ro ... [dwc1 dwc2 dpwt]` DXTRAN spheres
#[derive(Debug, Clone, PartialEq)]
pub struct Dxtran {
    pub designator: Designator,
    pub spheres: Vec<DxtranSphere>,
    /// Weight cutoffs and minimum photon weight
    pub cutoffs: Option<[f64; 3]>,
}

impl DataCard for Dxtran {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PARTICLE.check(mnemonic)?;
        let designator = mnemonic.required_designator()?;

        let cutoffs = match tokens.len() % 5 {
            0 => None,
            3 => {
                // cutoffs are the trailing three, the spheres go back
                let mut all = tokens.take_rest();
                let cutoffs = all.split_off(all.len() - 3);
                *tokens = TokenDeque::from(all);
                Some([
                    fields::parse(&cutoffs[0], "dxtran cutoff")?,
                    fields::parse(&cutoffs[1], "dxtran cutoff")?,
                    fields::parse(&cutoffs[2], "dxtran photon weight")?,
                ])
            }
            _ => {
                return Err(InpError::syntax(f!(
                    "dxt needs groups of 5 values and an optional 3, found {}",
                    tokens.len()
                )))
            }
        };

        let mut spheres = Vec::new();
        while !tokens.is_empty() {
            let centre = Vector3::pop(tokens, "dxtran centre")?;
            let inner = fields::pop::<f64>(tokens, "inner radius")?;
            let outer = fields::pop::<f64>(tokens, "outer radius")?;
            fields::non_negative(inner, "inner radius")?;
            if outer < inner {
                return Err(InpError::semantic(f!(
                    "outer radius {} is inside inner radius {}",
                    outer.token(),
                    inner.token()
                )));
            }
            spheres.push(DxtranSphere {
                centre,
                inner,
                outer,
            });
        }

        if spheres.is_empty() {
            return Err(InpError::too_few("a dxtran sphere"));
        }

        Ok(Self {
            designator,
            spheres,
            cutoffs,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("dxt").with_designator(Some(self.designator.clone()))
    }

    fn fields(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        for sphere in &self.spheres {
            tokens.extend(sphere.centre.tokens());
            tokens.push(sphere.inner.token());
            tokens.push(sphere.outer.token());
        }
        if let Some(cutoffs) = &self.cutoffs {
            tokens.extend(fields::tokens(cutoffs));
        }
        tokens
    }
}

/// `dd[k] k1 m1 k2 m2 ...` detector diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorDiagnostics {
    pub tally: Option<u32>,
    pub pairs: Vec<(f64, f64)>,
}

impl DataCard for DetectorDiagnostics {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        let form = Form {
            prefixes: &[],
            suffix: Suffix::Optional(1..=MAX_NUMBER),
            designator: Allowed::Never,
        };
        let tally = form.check(mnemonic)?;
        let pairs = data::pairs::<f64, f64>(tokens, "diagnostic criterion", "diagnostic limit")?;
        if pairs.is_empty() {
            return Err(InpError::too_few("diagnostic criterion"));
        }
        Ok(Self { tally, pairs })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("dd").with_suffix(self.tally)
    }

    fn fields(&self) -> Vec<String> {
        data::pair_tokens(&self.pairs)
    }
}

/// `bbrem b1 ... b49 m1 m2 ...` bremsstrahlung biasing
#[derive(Debug, Clone, PartialEq)]
pub struct Bremsstrahlung {
    pub bias: Vec<f64>,
    pub materials: Vec<u32>,
}

impl Bremsstrahlung {
    pub const BINS: usize = 49;
}

impl DataCard for Bremsstrahlung {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;

        let bias = tokens
            .take(Self::BINS, "bremsstrahlung bias")?
            .iter()
            .map(|t| fields::parse::<f64>(t, "bremsstrahlung bias"))
            .collect::<Result<Vec<f64>>>()?;
        for b in &bias {
            fields::non_negative(*b, "bremsstrahlung bias")?;
        }

        let materials = fields::rest_required::<u32>(tokens, "biased material")?;
        for m in &materials {
            fields::in_range(*m, 1..=MAX_NUMBER, "biased material")?;
        }

        Ok(Self { bias, materials })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("bbrem")
    }

    fn fields(&self) -> Vec<String> {
        let mut tokens = fields::tokens(&self.bias);
        tokens.extend(fields::tokens(&self.materials));
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Datum, Variant};
    use rstest::rstest;

    #[rstest]
    #[case("imp:n 1 1 j 0")]
    #[case("imp:n,p 1 0")]
    #[case("esplt:n 2 0.1 0.5 0.01")]
    #[case("tsplt:p 2 10")]
    #[case("ext:n 0 0.7v1 s -sx")]
    #[case("vect v1 0 0 1 v2 1 0 0")]
    #[case("fcl:n 1 -0.5 0")]
    #[case("wwe:n 0.1 1 20")]
    #[case("wwge:p 1 10")]
    #[case("wwn1:n 0.5 -1 0")]
    #[case("wwp:n 5 3 5 0 -1")]
    #[case("wwg 14 0 0.5 j j j j 1")]
    #[case("mesh geom=cyl ref=0 0 0 origin=0 0 -10 imesh=5 10 iints=2 3")]
    #[case("pd14 1 0.5 0")]
    #[case("dxt:n 0 0 10 1 2")]
    #[case("dxt:n 0 0 10 1 2 0.1 0.2 0")]
    #[case("dxc1:n 1 0.5")]
    #[case("dd 0.1 1000")]
    #[case("dd5 0.1 -1000")]
    #[case("pwt -1 j 0")]
    fn canonical(#[case] text: &str) {
        assert_eq!(Datum::parse(text).unwrap().to_text(), text);
    }

    #[rstest]
    #[case("imp 1 1")]
    #[case("imp:n -1")]
    #[case("esplt:n 2")]
    #[case("vect 0 0 1")]
    #[case("wwe:n 2 1")]
    #[case("wwn:n 1")]
    #[case("wwn1:n -2")]
    #[case("wwp:n 1")]
    #[case("wwp:n 5 3 5 2")]
    #[case("mesh geom=xyz")]
    #[case("dxt:n 0 0 10 3 2")]
    #[case("dxt:n 0 0 10 1")]
    #[case("bbrem 1 1")]
    fn rejected(#[case] text: &str) {
        assert!(Datum::parse(text).is_err(), "{text}");
    }

    #[test]
    fn bremsstrahlung() {
        let text = f!("bbrem {} 1 2", ["1"; 49].join(" "));
        let card = Datum::parse(&text).unwrap();
        match &card {
            Datum::Bremsstrahlung(b) => {
                assert_eq!(b.bias.len(), 49);
                assert_eq!(b.materials, vec![1, 2]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(card.to_text(), text);
    }

    #[test]
    fn window_parameter_names() {
        match Datum::parse("wwp:n 4 2 j 1").unwrap() {
            Datum::WindowParameters(wwp) => {
                assert_eq!(wwp.get("wupn"), Some(4.0));
                assert_eq!(wwp.get("mxspln"), None);
                assert_eq!(wwp.get("mwhere"), Some(1.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
