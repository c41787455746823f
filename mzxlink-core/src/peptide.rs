//! The `Peptide` entity (spec §3) and its mass computation.

use serde::{Deserialize, Serialize};

use crate::residue::{Modification, WATER_MASS};

/// Where a peptide substring sits within its parent protein sequence.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum PeptidePosition {
    /// Starts at protein sequence position 0.
    NTerm,
    /// Ends at the protein's C-terminus.
    CTerm,
    /// Neither terminus.
    Internal,
}

impl PeptidePosition {
    /// Whether N-terminal linking is possible at this position.
    #[must_use]
    pub const fn is_n_term(self) -> bool {
        matches!(self, Self::NTerm)
    }

    /// Whether C-terminal linking is possible at this position.
    #[must_use]
    pub const fn is_c_term(self) -> bool {
        matches!(self, Self::CTerm)
    }
}

/// An immutable, already-modified peptide: an ordered residue sequence with a
/// precomputed monoisotopic mass and a position tag.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Peptide {
    /// The residue sequence (single-letter codes, uppercase ASCII), including any
    /// ambiguity-free variant chosen by the digestor.
    pub sequence: String,
    /// Monoisotopic mass: sum of residue masses + water + modification deltas.
    pub mass: f64,
    /// Position of this peptide substring within its parent protein.
    pub position: PeptidePosition,
    /// The modifications applied to produce this exact mass (for annotation only).
    pub modifications: Vec<AppliedModification>,
}

/// A modification placed at a specific 0-based index of a peptide's sequence.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AppliedModification {
    /// 0-based index into [`Peptide::sequence`].
    pub index: usize,
    /// The modification identifier, copied from [`Modification::id`].
    pub id: String,
    /// The mass delta contributed by this modification.
    pub mass_delta: f64,
}

impl Peptide {
    /// Construct a peptide from an unmodified sequence and a list of applied
    /// modifications, computing the resulting monoisotopic mass.
    #[must_use]
    pub fn new(
        sequence: String,
        position: PeptidePosition,
        modifications: Vec<AppliedModification>,
    ) -> Self {
        let residue_sum: f64 = sequence
            .bytes()
            .map(|b| crate::residue::residue_mass(b).unwrap_or(0.0))
            .sum();
        let mod_sum: f64 = modifications.iter().map(|m| m.mass_delta).sum();
        Self {
            sequence,
            mass: residue_sum + WATER_MASS + mod_sum,
            position,
            modifications,
        }
    }

    /// Length in residues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// True if the peptide is empty (never produced by the digestor, but
    /// checked defensively wherever a peptide's length is used as a divisor).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Byte at `index`, panics if out of range (callers only index positions
    /// already validated against `self.len()`).
    #[must_use]
    pub fn residue_at(&self, index: usize) -> u8 {
        self.sequence.as_bytes()[index]
    }

    /// Indices (0-based) of every occurrence of a residue in `anchors`.
    #[must_use]
    pub fn anchor_positions(&self, anchors: &[u8]) -> Vec<usize> {
        self.sequence
            .bytes()
            .enumerate()
            .filter(|(_, b)| anchors.contains(&b.to_ascii_uppercase()))
            .map(|(i, _)| i)
            .collect()
    }

    /// Applies a single modification, returning a new peptide with the
    /// modification recorded and the mass updated.
    #[must_use]
    pub fn with_modification(&self, index: usize, modification: &Modification) -> Self {
        let mut modifications = self.modifications.clone();
        modifications.push(AppliedModification {
            index,
            id: modification.id.clone(),
            mass_delta: modification.mass_delta,
        });
        Self {
            sequence: self.sequence.clone(),
            mass: self.mass + modification.mass_delta,
            position: self.position,
            modifications,
        }
    }
}
