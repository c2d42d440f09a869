//! Geometry data cards: `vol area u lat fill tr`

// internal modules
use crate::cards::cell::Fill;
use crate::cards::data::{checks, value_list, DataCard, Form, ListRule, Suffix};
use crate::cards::fields::{self, Entry, ToToken};
use crate::cards::options::{self, Allowed};
use crate::cards::transform::Transformation;
use crate::cards::Mnemonic;
use crate::error::{InpError, Result};
use crate::tokens::TokenDeque;

/// `vol [no] x1 x2 ...` cell volumes
///
/// With `no` the code is told not to calculate any volumes itself, and the
/// list may then be empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Volumes {
    pub calculate: bool,
    pub values: Vec<Entry<f64>>,
}

impl DataCard for Volumes {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        Form::PLAIN.check(mnemonic)?;
        let calculate = !tokens.pop_if("no");

        let values: Vec<Entry<f64>> = match calculate {
            true => fields::rest_required(tokens, "cell volume")?,
            false => fields::rest(tokens, "cell volume")?,
        };
        fields::check_entries(&values, checks::non_negative)?;

        Ok(Self { calculate, values })
    }

    fn mnemonic(&self) -> Mnemonic {
        Mnemonic::new("vol")
    }

    fn fields(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        if !self.calculate {
            tokens.push("no".to_string());
        }
        tokens.extend(fields::tokens(&self.values));
        tokens
    }
}

value_list! {
    /// `area x1 x2 ...` surface areas
    pub Areas(f64) = ListRule {
        form: Form::PLAIN,
        field: "surface area",
        allow_empty: false,
        check: checks::non_negative,
    };
}

value_list! {
    /// `u n1 n2 ...` universe of every cell
    pub Universes(i64) = ListRule {
        form: Form::PLAIN,
        field: "universe",
        allow_empty: false,
        check: checks::number,
    };
}

value_list! {
    /// `lat n1 n2 ...` lattice type of every cell, `0` for none
    pub Lattices(i64) = ListRule {
        form: Form::PLAIN,
        field: "lattice type",
        allow_empty: false,
        check: |v| fields::one_of(*v, &[0, 1, 2], "lattice type").map(drop),
    };
}

/// `fill n1 n2 ...` universes filling every cell, with optional transformations
///
/// ```rust
/// # use inpdeck::cards::{Datum, Variant};
/// let card = Datum::parse("fill 0 2 (1) j 3").unwrap();
/// assert_eq!(card.to_text(), "fill 0 2 (1) j 3");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Fills {
    /// Transformations given in degrees
    pub degrees: bool,
    pub entries: Vec<Entry<Fill>>,
}

impl DataCard for Fills {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        let form = Form {
            prefixes: &['*'],
            suffix: Suffix::Never,
            designator: Allowed::Never,
        };
        form.check(mnemonic)?;
        let degrees = mnemonic.is_starred();

        let mut pieces = options::split_pieces(tokens.take_rest());
        if pieces.is_empty() {
            return Err(InpError::too_few("fill universe"));
        }

        let mut entries = Vec::new();
        while !pieces.is_empty() {
            match pieces.pop_if("j") {
                true => entries.push(Entry::Jump),
                false => entries.push(Entry::Value(Fill::take(&mut pieces, degrees)?)),
            }
        }

        Ok(Self { degrees, entries })
    }

    fn mnemonic(&self) -> Mnemonic {
        let prefix = self.degrees.then_some('*');
        Mnemonic::new("fill").with_prefix(prefix)
    }

    fn fields(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| match e {
                Entry::Value(fill) => fill.to_string(),
                Entry::Jump => "j".to_string(),
            })
            .collect()
    }
}

/// `[*]trn o1 o2 o3 xx' yx' ... m` coordinate transformation
#[derive(Debug, Clone, PartialEq)]
pub struct TransformCard {
    pub number: u32,
    pub transformation: Transformation,
}

impl DataCard for TransformCard {
    fn from_tokens(mnemonic: &Mnemonic, tokens: &mut TokenDeque) -> Result<Self> {
        let form = Form {
            prefixes: &['*'],
            suffix: Suffix::Required(1..=999),
            designator: Allowed::Never,
        };
        let number = form.check(mnemonic)?.unwrap_or_default();

        let values = tokens.take_rest();
        let transformation = Transformation::from_tokens(&values, mnemonic.is_starred())?;

        Ok(Self {
            number,
            transformation,
        })
    }

    fn mnemonic(&self) -> Mnemonic {
        let prefix = self.transformation.degrees.then_some('*');
        Mnemonic::new("tr")
            .with_prefix(prefix)
            .with_suffix(Some(self.number))
    }

    fn fields(&self) -> Vec<String> {
        self.transformation.tokens()
    }
}

impl TransformCard {
    /// Displacement as written, for quick inspection
    pub fn displacement(&self) -> Vec<String> {
        self.transformation.displacement.tokens()
    }

    pub fn has_rotation(&self) -> bool {
        self.transformation.rotation.is_some()
    }

    /// Rotation entries written as tokens, empty for a pure translation
    pub fn rotation_tokens(&self) -> Vec<String> {
        self.transformation
            .rotation
            .iter()
            .flatten()
            .map(ToToken::token)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::cards::{Datum, Variant};
    use rstest::rstest;

    #[rstest]
    #[case("vol 1 j 2.5")]
    #[case("vol no")]
    #[case("vol no 1 2")]
    #[case("area 10 20")]
    #[case("u 0 1 -2 j")]
    #[case("lat 0 1 2")]
    #[case("fill 0 2 (0 0 1)")]
    #[case("*fill 1 (0 0 0 0 90 90 90 0 90 90 90 0)")]
    #[case("tr1 0 0 5")]
    #[case("*tr12 1 2 3 0 90 90 90 0 90 90 90 0 1")]
    fn canonical(#[case] text: &str) {
        assert_eq!(Datum::parse(text).unwrap().to_text(), text);
    }

    #[rstest]
    #[case("vol")]
    #[case("vol -1")]
    #[case("lat 3")]
    #[case("tr1000 0 0 0")]
    #[case("tr 0 0 0")]
    #[case("tr1 0 0")]
    #[case("+tr1 0 0 0")]
    #[case("fill")]
    fn rejected(#[case] text: &str) {
        assert!(Datum::parse(text).is_err());
    }

    #[test]
    fn transformation_accessors() {
        match Datum::parse("tr3 1 2 3").unwrap() {
            Datum::Transform(tr) => {
                assert_eq!(tr.number, 3);
                assert_eq!(tr.displacement(), vec!["1", "2", "3"]);
                assert!(!tr.has_rotation());
                assert!(tr.rotation_tokens().is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
