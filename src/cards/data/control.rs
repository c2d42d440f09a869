//! Problem termination, output, and run control cards

// internal modules
use crate::cards::data::{self, checks, value_list, DataCard, Form, FreeText, ListRule};
use crate::cards::fields::{self, Entry, ToToken};
use crate::cards::options::{self, keyword_enum, Allowed, Keyword, KeywordOption, OptionValue, ValueKind};
use crate::cards::Mnemonic;
use crate::error::{InpError, Result};
use crate::tokens::TokenDeque;
use crate::utils::f;

/// A history count, which decks often write in scientific notation
fn count(token: &str, field: &str) -> Result<u64> {
    let value = fields::parse::<f64>(token, field)?;
    if value < 0.0 || value.fract() != 0.0 || value > u64::MAX as f64 {
        return Err(InpError::semantic(f!(
            "{field} must be a whole number of histories, found {token}"
        )));
    }
    Ok(value as u64)
}

/// `nps npp [npsmg]` number of histories to run
///
/// ```rust
/// # use inpdeck::cards::{Datum, Variant};
/// let card = Datum::parse("nps 1e6").unwrap();
/// assert_eq!(card.to_text(), "nps 1000000");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Histories {
    pub histories: u64,
    /// Histories taken from a surface source file
    pub source_histories: Option<u64>,
}

impl DataCard for Histories {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        let histories = count(&tokens.pop_front_or(|| InpError::too_few("histories"))?, "histories")?;
        let source_histories = match tokens.is_empty() {
            true => None,
            false => Some(count(&tokens.pop_front()?, "source histories")?),
        };
        Ok(Self {
            histories,
            source_histories,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("nps")
    }

    fn fields(&self) -> Vec<String> {
        let mut tokens = vec![self.histories.token()];
        tokens.extend(self.source_histories.iter().map(ToToken::token));
        tokens
    }
}

/// `ctme tme` computer time cutoff in minutes
#[derive(Debug, Clone, PartialEq)]
pub struct ComputerTime {
    pub minutes: f64,
}

impl DataCard for ComputerTime {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        let minutes = fields::non_negative(fields::pop(tokens, "computer time")?, "computer time")?;
        Ok(Self { minutes })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("ctme")
    }

    fn fields(&self) -> Vec<String> {
        vec![self.minutes.token()]
    }
}

/// `prdmp ndp ndm mct ndmp dmmp` print and dump cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Dumps {
    pub entries: Vec<Entry<i64>>,
}

impl DataCard for Dumps {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        let entries = data::bounded::<i64>(tokens, 5, "prdmp")?;
        if let Some(Entry::Value(mct)) = entries.get(2) {
            fields::one_of(*mct, &[-2, -1, 0, 1, 2], "mctal flag")?;
        }
        Ok(Self { entries })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("prdmp")
    }

    fn fields(&self) -> Vec<String> {
        fields::tokens(&self.entries)
    }
}

/// `lost lost1 lost2` lost particles allowed before termination and printed
#[derive(Debug, Clone, PartialEq)]
pub struct LostParticles {
    pub entries: Vec<Entry<i64>>,
}

impl DataCard for LostParticles {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        let entries = data::bounded::<i64>(tokens, 2, "lost")?;
        fields::check_entries(&entries, |n| fields::in_range(*n, 1..=i64::MAX, "lost particles").map(drop))?;
        Ok(Self { entries })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("lost")
    }

    fn fields(&self) -> Vec<String> {
        fields::tokens(&self.entries)
    }
}

/// `dbcn x1 x2 ...` debug information and developer options
#[derive(Debug, Clone, PartialEq)]
pub struct DebugInfo {
    pub entries: Vec<Entry<i64>>,
}

impl DebugInfo {
    /// Entries past this count are not read by the code
    pub const LIMIT: usize = 100;
}

impl DataCard for DebugInfo {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        let entries = data::bounded::<i64>(tokens, Self::LIMIT, "dbcn")?;
        Ok(Self { entries })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("dbcn")
    }

    fn fields(&self) -> Vec<String> {
        fields::tokens(&self.entries)
    }
}

value_list! {
    /// `print [x1 x2 ...]` output tables, negative to exclude a table
    pub Print(i64) = ListRule {
        form: Form::PLAIN,
        field: "print table",
        allow_empty: true,
        check: |v| fields::in_range(v.abs(), 1..=200, "print table").map(drop),
    };
}

value_list! {
    /// `talnp [n1 n2 ...]` tallies left out of the output, every one when empty
    pub NoTallyPrint(i64) = ListRule {
        form: Form::PLAIN,
        field: "tally number",
        allow_empty: true,
        check: checks::number,
    };
}

keyword_enum! {
    /// Options of the `rand` card
    pub enum RandomKeyword {
        Gen => "gen", Integer;
        Seed => "seed", Integer;
        Stride => "stride", Integer;
        Hist => "hist", Integer;
    }
}

impl Keyword for RandomKeyword {
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
            (Self::Gen, OptionValue::Integer(g)) => fields::in_range(*g, 1..=4, "gen").map(drop),
            (_, OptionValue::Integer(n)) => fields::in_range(*n, 1..=i64::MAX, self.as_str()).map(drop),
            _ => Ok(()),
        }
    }
}

/// `rand gen= seed= stride= hist=` random number generator
#[derive(Debug, Clone, PartialEq)]
pub struct Random {
    pub options: Vec<KeywordOption<RandomKeyword>>,
}

impl DataCard for Random {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        let options = options::scan::<RandomKeyword>(tokens)?;
        Ok(Self { options })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("rand")
    }

    fn fields(&self) -> Vec<String> {
        options::texts(&self.options)
    }
}

keyword_enum! {
    /// Options of the `stop` card
    pub enum StopKeyword {
        Nps => "nps", Real;
        Ctme => "ctme", Real;
        /// `fn=e`, stop once tally `n` reaches relative error `e`
        F => "f", Real;
    }
}

impl Keyword for StopKeyword {
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
            Self::F => Allowed::Required,
            _ => Allowed::Never,
        }
    }

    fn check(&self, option: &KeywordOption<Self>) -> Result<()> {
        match (self, &option.value) {
            (Self::F, OptionValue::Real(e)) => fields::positive(*e, "relative error").map(drop),
            (_, OptionValue::Real(x)) => fields::non_negative(*x, self.as_str()).map(drop),
            _ => Ok(()),
        }
    }
}

/// `stop nps= ctme= fn=` early termination controls
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub options: Vec<KeywordOption<StopKeyword>>,
}

impl DataCard for Stop {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        let options = options::scan::<StopKeyword>(tokens)?;
        if options.is_empty() {
            return Err(InpError::too_few("stop condition"));
        }
        Ok(Self { options })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("stop")
    }

    fn fields(&self) -> Vec<String> {
        options::texts(&self.options)
    }
}

keyword_enum! {
    /// Options of the `ptrac` card
    pub enum PtracKeyword {
        Buffer => "buffer", Integer;
        File => "file", Choice(&["asc", "bin", "aov"]);
        Max => "max", Integer;
        Meph => "meph", Integer;
        Write => "write", Choice(&["pos", "all"]);
        Event => "event", Choices(&["src", "bnk", "sur", "col", "ter", "cap"]);
        Filter => "filter", Texts;
        Type => "type", Texts;
        Nps => "nps", Integers;
        Cell => "cell", Integers;
        Surface => "surface", Integers;
        Tally => "tally", Integers;
        Value => "value", Real;
    }
}

impl Keyword for PtracKeyword {
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
            (Self::Buffer | Self::Meph, OptionValue::Integer(n)) => {
                fields::in_range(*n, 1..=i64::MAX, self.as_str()).map(drop)
            }
            (Self::Nps, OptionValue::Integers(v)) if v.len() > 2 => {
                Err(InpError::too_many("nps", &v.iter().skip(2).map(ToToken::token).collect::<Vec<String>>()))
            }
            _ => Ok(()),
        }
    }
}

/// `ptrac keyword=value ...` particle track output
#[derive(Debug, Clone, PartialEq)]
pub struct Ptrac {
    pub options: Vec<KeywordOption<PtracKeyword>>,
}

impl DataCard for Ptrac {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        let options = options::scan::<PtracKeyword>(tokens)?;
        Ok(Self { options })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("ptrac")
    }

    fn fields(&self) -> Vec<String> {
        options::texts(&self.options)
    }
}

value_list! {
    /// `histp [-lhist] c1 c2 ...` history file, optionally limited to some cells
    pub HistoryFile(i64) = ListRule {
        form: Form::PLAIN,
        field: "history file entry",
        allow_empty: true,
        check: checks::number,
    };
}

/// `mplot ...` plot commands for tallies during the run, kept as written
#[derive(Debug, Clone, PartialEq)]
pub struct Plotting(pub FreeText);

impl DataCard for Plotting {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        FreeText::read(mnemonic, tokens, &Form::PLAIN).map(Self)
    }

    fn mnemonic(&self) -> Mnemonic {
        self.0.mnemonic.clone()
    }

    fn fields(&self) -> Vec<String> {
        self.0.tokens()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Datum, Variant};
    use rstest::rstest;

    #[rstest]
    #[case("nps 1e6", "nps 1000000")]
    #[case("nps 1000 200", "nps 1000 200")]
    #[case("ctme 60", "ctme 60")]
    #[case("prdmp j j 1 j 2", "prdmp j j 1 j 2")]
    #[case("lost 10 j", "lost 10 j")]
    #[case("dbcn 1 j 5", "dbcn 1 j 5")]
    #[case("print", "print")]
    #[case("print -30 -128", "print -30 -128")]
    #[case("talnp 4 14", "talnp 4 14")]
    #[case("rand gen=2 seed=12345 stride=152917", "rand gen=2 seed=12345 stride=152917")]
    #[case("stop nps=1e6 f4=0.01", "stop nps=1e6 f4=0.01")]
    #[case("ptrac file=asc event=src col max=1000 cell=1 2", "ptrac file=asc event=src col max=1000 cell=1 2")]
    #[case("histp -1000 1 2", "histp -1000 1 2")]
    #[case("mplot tal 4 plot", "mplot tal 4 plot")]
    fn canonical(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(Datum::parse(text).unwrap().to_text(), expected);
    }

    #[rstest]
    #[case("nps")]
    #[case("nps 1.5")]
    #[case("nps -10")]
    #[case("nps 1 2 3")]
    #[case("ctme -1")]
    #[case("ctme")]
    #[case("prdmp 1 2 3 4 5 6")]
    #[case("prdmp j j 5")]
    #[case("lost 0")]
    #[case("print 999")]
    #[case("rand gen=5")]
    #[case("rand seed=0")]
    #[case("stop f=0.1")]
    #[case("stop")]
    #[case("stop nps=-1")]
    #[case("ptrac file=txt")]
    #[case("ptrac event=src sky")]
    #[case("ptrac nps=1 2 3")]
    fn rejected(#[case] text: &str) {
        assert!(Datum::parse(text).is_err(), "{text}");
    }

    #[test]
    fn history_counts() {
        let Datum::Histories(nps) = Datum::parse("nps 2.5e3 100").unwrap() else {
            panic!("not an nps card");
        };
        assert_eq!(nps.histories, 2500);
        assert_eq!(nps.source_histories, Some(100));
    }
}
