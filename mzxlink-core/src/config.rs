//! The external configuration record (spec §6) and tolerance policy (spec §4.2).

use serde::{Deserialize, Serialize};

use crate::error::{invalid_input, CoreError};

/// Unit a [`Tolerance`] value is expressed in.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ToleranceUnit {
    /// Parts per million of the compared mass.
    Ppm,
    /// Absolute Dalton offset.
    Da,
}

/// A mass tolerance in either ppm or Da.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Tolerance {
    /// The numeric tolerance value.
    pub value: f64,
    /// The unit `value` is expressed in.
    pub unit: ToleranceUnit,
}

impl Tolerance {
    /// Construct a ppm tolerance.
    #[must_use]
    pub const fn ppm(value: f64) -> Self {
        Self { value, unit: ToleranceUnit::Ppm }
    }

    /// Construct an absolute Dalton tolerance.
    #[must_use]
    pub const fn da(value: f64) -> Self {
        Self { value, unit: ToleranceUnit::Da }
    }

    /// The absolute allowed error in Da for a given `mass` (spec §4.2:
    /// "absolute allowed error = mass × tol × 10⁻⁶ if ppm, else the Dalton value").
    #[must_use]
    pub fn absolute_error(&self, mass: f64) -> f64 {
        match self.unit {
            ToleranceUnit::Ppm => mass * self.value * 1e-6,
            ToleranceUnit::Da => self.value,
        }
    }

    /// The `[min, max]` bounds around `mass` allowed by this tolerance.
    #[must_use]
    pub fn bounds(&self, mass: f64) -> (f64, f64) {
        let err = self.absolute_error(mass);
        (mass - err, mass + err)
    }

    /// Whether `observed` falls within this tolerance of `expected`.
    #[must_use]
    pub fn contains(&self, expected: f64, observed: f64) -> bool {
        (observed - expected).abs() <= self.absolute_error(expected)
    }
}

/// The full external configuration record (spec §6).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// Precursor mass tolerance.
    pub precursor_tol: Tolerance,
    /// Fragment mass tolerance for common ions.
    pub fragment_tol: Tolerance,
    /// Fragment mass tolerance for cross-link ions (often looser than `fragment_tol`).
    pub fragment_tol_xlinks: Tolerance,
    /// Minimum accepted precursor charge.
    pub min_pc: u8,
    /// Maximum accepted precursor charge.
    pub max_pc: u8,
    /// Minimum peptide length kept by the digestor / used to filter spectra.
    pub min_peptide_size: usize,
    /// Anchor residues for cross-link side 1.
    pub anchor_residues_side1: Vec<u8>,
    /// Anchor residues for cross-link side 2.
    pub anchor_residues_side2: Vec<u8>,
    /// Mass added by an intact cross-linker joining two residues.
    pub linker_mass: f64,
    /// Masses added by a linker that reacted with only one residue (hydrolyzed/quenched).
    pub mono_link_masses: Vec<f64>,
    /// Number of top-scoring candidates retained per spectrum.
    pub top_k: usize,
    /// Minimum intensity ratio `min(a, b) / max(a, b)` for two peaks to be considered the same ion.
    pub intensity_cutoff: f64,
    /// Whether the peptide N-terminus may serve as a cross-link anchor.
    pub allow_n_term_linking: bool,
    /// Whether the peptide C-terminus may serve as a cross-link anchor.
    pub allow_c_term_linking: bool,
}

impl Config {
    /// Parse a [`Config`] from a JSON document and validate it in one step
    /// (spec §2, "Configuration loader").
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| invalid_input(format!("malformed configuration: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate internal consistency, returning [`crate::error::ErrorKind::InvalidInput`]
    /// on the first violation found.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.min_pc > self.max_pc {
            return Err(invalid_input(format!(
                "min_pc ({}) is greater than max_pc ({})",
                self.min_pc, self.max_pc
            )));
        }
        if self.top_k == 0 {
            return Err(invalid_input("top_k must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.intensity_cutoff) {
            return Err(invalid_input("intensity_cutoff must be within [0, 1]"));
        }
        if self.anchor_residues_side1.is_empty() || self.anchor_residues_side2.is_empty() {
            return Err(invalid_input("anchor residue sets must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ppm_error_scales_with_mass() {
        let tol = Tolerance::ppm(10.0);
        assert!((tol.absolute_error(1_000_000.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn da_error_is_constant() {
        let tol = Tolerance::da(0.02);
        assert!((tol.absolute_error(5.0) - 0.02).abs() < 1e-12);
        assert!((tol.absolute_error(5_000.0) - 0.02).abs() < 1e-12);
    }

    #[test]
    fn contains_respects_bounds() {
        let tol = Tolerance::ppm(10.0);
        assert!(tol.contains(1083.534, 1083.534_0));
        assert!(!tol.contains(1083.534, 1083.6));
    }

    #[test]
    fn rejects_inverted_charge_range() {
        let mut config = sample_config();
        config.min_pc = 5;
        config.max_pc = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_json_rejects_malformed_documents() {
        assert!(Config::from_json("not json").is_err());
    }

    #[test]
    fn from_json_rejects_invalid_values_after_parsing() {
        let json = serde_json::to_string(&{
            let mut config = sample_config();
            config.top_k = 0;
            config
        })
        .unwrap();
        assert!(Config::from_json(&json).is_err());
    }

    fn sample_config() -> Config {
        Config {
            precursor_tol: Tolerance::ppm(10.0),
            fragment_tol: Tolerance::ppm(20.0),
            fragment_tol_xlinks: Tolerance::ppm(20.0),
            min_pc: 2,
            max_pc: 6,
            min_peptide_size: 4,
            anchor_residues_side1: vec![b'K'],
            anchor_residues_side2: vec![b'K'],
            linker_mass: 138.068_08,
            mono_link_masses: vec![156.078_6],
            top_k: 5,
            intensity_cutoff: 0.1,
            allow_n_term_linking: false,
            allow_c_term_linking: false,
        }
    }
}
