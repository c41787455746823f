//! `CrossLinkSpecies` and `CrossLinkCandidate` (spec §3).
//!
//! The tagged-union-over-linker-geometry idiom follows the teacher's
//! `mzcore::sequence::cross_link::CrossLinkSide` (`Symmetric`/`Left`/`Right`):
//! one enum, exhaustively matched everywhere downstream instead of
//! inheritance-style polymorphism (spec §9).

use serde::{Deserialize, Serialize};

/// An abstract cross-link species: a mass-only hypothesis about how a linker
/// joined one or two peptides, before any concrete anchor site is chosen.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub enum CrossLinkSpecies {
    /// The linker reacted with only one residue; the other end was hydrolyzed or quenched.
    Mono {
        /// Index into the peptide table.
        peptide: usize,
        /// The mono-link mass used for this hypothesis.
        mono_link_mass: f64,
    },
    /// The linker joined two residues within the same peptide.
    Loop {
        /// Index into the peptide table.
        peptide: usize,
    },
    /// The linker joined residues on two different peptides (possibly the same peptide twice).
    Cross {
        /// Index of peptide α into the peptide table.
        alpha: usize,
        /// Index of peptide β into the peptide table.
        beta: usize,
    },
}

impl CrossLinkSpecies {
    /// The total mass of this species given the peptide table and linker mass.
    #[must_use]
    pub fn mass(&self, peptide_mass: impl Fn(usize) -> f64, linker_mass: f64) -> f64 {
        match *self {
            Self::Mono { peptide, mono_link_mass } => peptide_mass(peptide) + mono_link_mass,
            Self::Loop { peptide } => peptide_mass(peptide) + linker_mass,
            Self::Cross { alpha, beta } => peptide_mass(alpha) + peptide_mass(beta) + linker_mass,
        }
    }
}

/// A concrete cross-link candidate: a species plus the chosen anchor sites.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct CrossLinkCandidate {
    /// The underlying species.
    pub species: CrossLinkSpecies,
    /// Anchor position on peptide α (0-based index into its sequence).
    pub site_alpha: usize,
    /// Anchor position on peptide β for `Cross`, or the second site on the
    /// same peptide for `Loop`. Unused (`0`) for `Mono`.
    pub site_beta: usize,
}
