//! Cross-linked peptide identification core.
//!
//! Six components, leaf-first: [`digest`] turns protein sequences into
//! [`peptide::Peptide`]s; [`enumerate`] finds candidate [`species::CrossLinkSpecies`]
//! within precursor tolerance of an observed spectrum; [`candidate`] expands
//! those into concrete [`species::CrossLinkCandidate`]s; [`fragment`] generates
//! their theoretical spectra; [`align`] matches theoretical against observed
//! peaks; [`score`] combines the match statistics into a ranked result.
//! [`pipeline`] wires all six together into a per-spectrum worker pool.

pub mod align;
pub mod candidate;
pub mod config;
pub mod digest;
pub mod enumerate;
pub mod error;
pub mod fragment;
pub mod peptide;
pub mod pipeline;
pub mod residue;
pub mod score;
pub mod species;
pub mod spectrum;

/// Re-exports of the types most callers need, so a collaborator binary can
/// `use mzxlink_core::prelude::*` instead of reaching into each module.
pub mod prelude {
    pub use crate::align::{align_absolute, align_intensity_weighted, align_relative};
    pub use crate::candidate::build_candidates;
    pub use crate::config::{Config, Tolerance, ToleranceUnit};
    pub use crate::digest::{digest_protein, DigestConfig, Enzyme};
    pub use crate::enumerate::{enumerate_species, AnchorConfig};
    pub use crate::error::{CoreError, ErrorKind};
    pub use crate::fragment::{generate_fragments, IonConfig, TheoreticalPeak};
    pub use crate::peptide::{Peptide, PeptidePosition};
    pub use crate::pipeline::{run_pipeline, Diagnostics, SpectrumResult, SpectrumState};
    pub use crate::residue::Modification;
    pub use crate::score::{CandidateScore, RankedCandidate, ScoreWeights};
    pub use crate::species::{CrossLinkCandidate, CrossLinkSpecies};
    pub use crate::spectrum::{ObservedSpectrum, Peak, Precursor};
}
