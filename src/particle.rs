//! Particle types and designators
//!
//! Designators qualify a mnemonic or keyword with the particles it applies to,
//! for example `imp:n,p` or `f4:h`. MCNP6 recognises 37 particle symbols, all
//! of which are single characters.

// internal modules
use crate::error::{InpError, Result};

// standard library
use std::fmt;

// external crates
use itertools::Itertools;

/// All particle types known to MCNP6, ordered by their MCNP particle number
///
/// The symbol used on cards is available through [Particle::symbol()] and
/// the MCNP particle number (1-37) through [Particle::id()].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Particle {
    Neutron,
    AntiNeutron,
    Photon,
    Electron,
    Positron,
    NegativeMuon,
    PositiveMuon,
    ElectronNeutrino,
    AntiElectronNeutrino,
    MuonNeutrino,
    AntiMuonNeutrino,
    Proton,
    AntiProton,
    Lambda,
    AntiLambda,
    PositiveSigma,
    AntiPositiveSigma,
    NegativeSigma,
    AntiNegativeSigma,
    Xi,
    AntiXi,
    NegativeXi,
    PositiveXi,
    Omega,
    AntiOmega,
    PositivePion,
    NegativePion,
    NeutralPion,
    PositiveKaon,
    NegativeKaon,
    ShortKaon,
    LongKaon,
    Deuteron,
    Triton,
    Helion,
    Alpha,
    HeavyIon,
}

/// Symbols in MCNP particle number order
const SYMBOLS: [char; 37] = [
    'n', 'q', 'p', 'e', 'f', '|', '!', 'u', '<', 'v', '>', 'h', 'g', 'l', 'b', '+', '_', '-', '~',
    'x', 'c', 'y', 'w', 'o', '@', '/', '*', 'z', 'k', '?', '%', '^', 'd', 't', 's', 'a', '#',
];

const PARTICLES: [Particle; 37] = [
    Particle::Neutron,
    Particle::AntiNeutron,
    Particle::Photon,
    Particle::Electron,
    Particle::Positron,
    Particle::NegativeMuon,
    Particle::PositiveMuon,
    Particle::ElectronNeutrino,
    Particle::AntiElectronNeutrino,
    Particle::MuonNeutrino,
    Particle::AntiMuonNeutrino,
    Particle::Proton,
    Particle::AntiProton,
    Particle::Lambda,
    Particle::AntiLambda,
    Particle::PositiveSigma,
    Particle::AntiPositiveSigma,
    Particle::NegativeSigma,
    Particle::AntiNegativeSigma,
    Particle::Xi,
    Particle::AntiXi,
    Particle::NegativeXi,
    Particle::PositiveXi,
    Particle::Omega,
    Particle::AntiOmega,
    Particle::PositivePion,
    Particle::NegativePion,
    Particle::NeutralPion,
    Particle::PositiveKaon,
    Particle::NegativeKaon,
    Particle::ShortKaon,
    Particle::LongKaon,
    Particle::Deuteron,
    Particle::Triton,
    Particle::Helion,
    Particle::Alpha,
    Particle::HeavyIon,
];

impl Particle {
    /// MCNP particle number, from 1 for neutrons to 37 for heavy ions
    ///
    /// ```rust
    /// # use inpdeck::particle::Particle;
    /// assert_eq!(Particle::Neutron.id(), 1);
    /// assert_eq!(Particle::Photon.id(), 3);
    /// assert_eq!(Particle::HeavyIon.id(), 37);
    /// ```
    pub fn id(&self) -> u8 {
        *self as u8 + 1
    }

    /// Single character used for the particle on cards
    pub fn symbol(&self) -> char {
        SYMBOLS[*self as usize]
    }

    /// Look up a particle from its MCNP particle number
    pub fn from_id(id: u8) -> Option<Self> {
        PARTICLES.get((id as usize).checked_sub(1)?).copied()
    }

    /// Every particle, ordered by particle number
    pub fn all() -> &'static [Particle] {
        &PARTICLES
    }

    /// The coarse family used to select physics card layouts
    pub fn kind(&self) -> ParticleKind {
        match self {
            Self::Neutron => ParticleKind::Neutron,
            Self::Photon => ParticleKind::Photon,
            Self::Electron => ParticleKind::Electron,
            Self::Proton => ParticleKind::Proton,
            _ => ParticleKind::Other,
        }
    }
}

impl TryFrom<char> for Particle {
    type Error = InpError;

    fn try_from(symbol: char) -> Result<Self> {
        SYMBOLS
            .iter()
            .position(|s| *s == symbol)
            .map(|i| PARTICLES[i])
            .ok_or_else(|| InpError::unrecognised("particle designator", &symbol.to_string()))
    }
}

impl TryFrom<&str> for Particle {
    type Error = InpError;

    /// Accepts either the card symbol (`"n"`) or the particle number (`"1"`)
    fn try_from(s: &str) -> Result<Self> {
        if let Ok(id) = s.parse::<u8>() {
            return Self::from_id(id)
                .ok_or_else(|| InpError::semantic(format!("particle number {id} not in 1..=37")));
        }

        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::try_from(c),
            _ => Err(InpError::unrecognised("particle designator", s)),
        }
    }
}

impl fmt::Display for Particle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Resolved particle family for a single-particle designator
///
/// Several cards (most notably `phys`) have a field layout that depends on
/// which particle they describe. Anything that is not a neutron, photon,
/// electron, or proton shares the generic layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticleKind {
    Neutron,
    Photon,
    Electron,
    Proton,
    Other,
}

/// Ordered, de-duplicated set of particles attached to a mnemonic
///
/// ```rust
/// # use inpdeck::particle::{Designator, Particle, ParticleKind};
/// let designator = Designator::parse("n,p,n").unwrap();
/// assert_eq!(designator.particles(), &[Particle::Neutron, Particle::Photon]);
/// assert_eq!(designator.to_string(), "n,p");
/// assert_eq!(designator.resolve(), None);
///
/// let designator = Designator::parse("e").unwrap();
/// assert_eq!(designator.resolve(), Some(ParticleKind::Electron));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Designator {
    particles: Vec<Particle>,
}

impl Designator {
    /// Parse the text following the `:` of a mnemonic
    ///
    /// Entries are comma separated. MCNP also accepts runs of single symbols
    /// without commas, such as `np`, so those are split character by character.
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(InpError::syntax("empty particle designator"));
        }

        let mut particles = Vec::new();
        for entry in text.split(',') {
            if entry.is_empty() {
                return Err(InpError::syntax(format!(
                    "empty entry in particle designator \"{text}\""
                )));
            }
            if entry.parse::<u8>().is_ok() {
                particles.push(Particle::try_from(entry)?);
            } else {
                for symbol in entry.chars() {
                    particles.push(Particle::try_from(symbol)?);
                }
            }
        }

        Ok(Self::from_particles(particles))
    }

    /// Build from a list of particles, dropping repeats but keeping order
    pub fn from_particles(particles: impl IntoIterator<Item = Particle>) -> Self {
        Self {
            particles: particles.into_iter().unique().collect(),
        }
    }

    pub fn single(particle: Particle) -> Self {
        Self {
            particles: vec![particle],
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn contains(&self, particle: Particle) -> bool {
        self.particles.contains(&particle)
    }

    /// The particle family, if and only if exactly one particle is named
    pub fn resolve(&self) -> Option<ParticleKind> {
        match self.particles.as_slice() {
            [particle] => Some(particle.kind()),
            _ => None,
        }
    }
}

impl fmt::Display for Designator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.particles.iter().join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn symbols_match_particle_numbers() {
        for (i, particle) in Particle::all().iter().enumerate() {
            assert_eq!(particle.id() as usize, i + 1);
            assert_eq!(Particle::try_from(particle.symbol()).unwrap(), *particle);
        }
    }

    #[rstest]
    #[case("n", vec![Particle::Neutron])]
    #[case("n,p", vec![Particle::Neutron, Particle::Photon])]
    #[case("np", vec![Particle::Neutron, Particle::Photon])]
    #[case("p,e,p", vec![Particle::Photon, Particle::Electron])]
    #[case("h,#,/", vec![Particle::Proton, Particle::HeavyIon, Particle::PositivePion])]
    #[case("1,3", vec![Particle::Neutron, Particle::Photon])]
    fn designators(#[case] text: &str, #[case] expected: Vec<Particle>) {
        assert_eq!(Designator::parse(text).unwrap().particles(), expected.as_slice());
    }

    #[rstest]
    #[case("")]
    #[case("n,,p")]
    #[case("j")]
    #[case("40")]
    fn bad_designators(#[case] text: &str) {
        assert!(Designator::parse(text).is_err());
    }

    #[test]
    fn kinds() {
        assert_eq!(Particle::Proton.kind(), ParticleKind::Proton);
        assert_eq!(Particle::Alpha.kind(), ParticleKind::Other);
    }
}
