//! The read-only residue table (spec §3: "Residue" entity).
//!
//! Monoisotopic masses are the standard CIAAW values used throughout the
//! proteomics literature (and by the OpenProXL reference implementation this
//! core is modelled on). The table is built once and frozen; nothing in the
//! hot path mutates it (spec §9, "thread-unsafe residue lookup").

use serde::{Deserialize, Serialize};

/// Monoisotopic mass of water, added once per peptide for the terminal -OH/-H.
pub const WATER_MASS: f64 = 18.010_564_68;

/// Monoisotopic mass of a proton, used to convert neutral mass to m/z.
pub const PROTON_MASS: f64 = 1.007_276_47;

/// Mass difference between the monoisotopic peak and its first ¹³C isotope.
pub const ISOTOPE_SPACING: f64 = 1.003_355;

/// Ambiguity codes that make a peptide sequence unusable and are always discarded.
pub const AMBIGUITY_CODES: [u8; 5] = [b'B', b'O', b'U', b'X', b'Z'];

/// True if `code` is one of the ambiguity codes B/O/U/X/Z.
#[must_use]
pub fn is_ambiguity_code(code: u8) -> bool {
    AMBIGUITY_CODES.contains(&code.to_ascii_uppercase())
}

/// The monoisotopic residue mass for one of the twenty standard amino acids.
/// Returns `None` for anything else, including the ambiguity codes.
#[must_use]
pub fn residue_mass(code: u8) -> Option<f64> {
    let mass = match code.to_ascii_uppercase() {
        b'G' => 57.021_464,
        b'A' => 71.037_114,
        b'S' => 87.032_028,
        b'P' => 97.052_764,
        b'V' => 99.068_414,
        b'T' => 101.047_678,
        b'C' => 103.009_185,
        b'L' | b'I' => 113.084_064,
        b'N' => 114.042_927,
        b'D' => 115.026_943,
        b'Q' => 128.058_578,
        b'K' => 128.094_963,
        b'E' => 129.042_593,
        b'M' => 131.040_485,
        b'H' => 137.058_912,
        b'F' => 147.068_414,
        b'R' => 156.101_111,
        b'Y' => 163.063_329,
        b'W' => 186.079_313,
        _ => return None,
    };
    Some(mass)
}

/// A fixed or variable modification: a mass delta applied at residues of a
/// given type (or, for terminal modifications, at a peptide terminus).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Modification {
    /// Short identifier, e.g. `"Carbamidomethyl"`.
    pub id: String,
    /// Monoisotopic mass delta.
    pub mass_delta: f64,
    /// Residue codes this modification may be placed on (uppercase ASCII).
    pub target_residues: Vec<u8>,
    /// Whether this modification is fixed (applied everywhere it fits) or variable.
    pub fixed: bool,
}

impl Modification {
    /// True if this modification can be placed on `residue`.
    #[must_use]
    pub fn applies_to(&self, residue: u8) -> bool {
        self.target_residues.contains(&residue.to_ascii_uppercase())
    }
}
