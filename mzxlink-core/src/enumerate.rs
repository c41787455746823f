//! The Precursor Enumerator (spec §4.2).
//!
//! Grounded on the candidate-mass loops in `OpenProXLUtils.cpp` (the
//! `xlPrecursorMassMatch` loop shape: sorted peptide masses, early exit /
//! skip-forward on the inner `j` loop for CROSS, binary search against the
//! sorted observed precursor list). The α loop is parallelized with `rayon`,
//! each worker building a thread-local `Vec` concatenated once all workers
//! finish (spec §5 and §9).

use rayon::prelude::*;

use crate::config::Tolerance;
use crate::peptide::Peptide;
use crate::species::CrossLinkSpecies;

/// Binary-search membership: true if `[mass - err, mass + err]` overlaps the
/// sorted `observed_masses` list.
fn within_any_observed(mass: f64, observed_masses: &[f64], tol: &Tolerance) -> bool {
    let (lo, hi) = tol.bounds(mass);
    let idx = observed_masses.partition_point(|&m| m < lo);
    observed_masses
        .get(idx)
        .is_some_and(|&m| m <= hi)
}

/// Anchor-residue configuration used by both the enumerator and the candidate builder.
pub struct AnchorConfig<'a> {
    /// Anchor residues for cross-link side 1.
    pub side1: &'a [u8],
    /// Anchor residues for cross-link side 2.
    pub side2: &'a [u8],
    /// Whether the peptide N-terminus counts as an anchor.
    pub allow_n_term: bool,
    /// Whether the peptide C-terminus counts as an anchor.
    pub allow_c_term: bool,
}

fn has_side_anchor(peptide: &Peptide, side: &[u8], cfg: &AnchorConfig<'_>) -> bool {
    !peptide.anchor_positions(side).is_empty()
        || (cfg.allow_n_term && peptide.position.is_n_term())
        || (cfg.allow_c_term && peptide.position.is_c_term())
}

/// Enumerate every [`CrossLinkSpecies`] whose mass lies within `precursor_tol`
/// of at least one of `observed_masses` (which must be sorted ascending).
///
/// `peptides` must be sorted ascending by mass; this is what lets the
/// inter-peptide loop exit early.
#[must_use]
pub fn enumerate_species(
    peptides: &[Peptide],
    observed_masses: &[f64],
    linker_mass: f64,
    mono_link_masses: &[f64],
    anchors: &AnchorConfig<'_>,
    precursor_tol: &Tolerance,
) -> Vec<CrossLinkSpecies> {
    if peptides.is_empty() || observed_masses.is_empty() {
        return Vec::new();
    }
    let min_observed = observed_masses[0];
    let max_observed = observed_masses[observed_masses.len() - 1];

    peptides
        .par_iter()
        .enumerate()
        .flat_map(|(i, alpha)| {
            let mut local = Vec::new();

            for &mono_mass in mono_link_masses {
                let species = CrossLinkSpecies::Mono { peptide: i, mono_link_mass: mono_mass };
                let mass = alpha.mass + mono_mass;
                if within_any_observed(mass, observed_masses, precursor_tol) {
                    local.push(species);
                }
            }

            if has_side_anchor(alpha, anchors.side1, anchors)
                && has_side_anchor(alpha, anchors.side2, anchors)
            {
                let species = CrossLinkSpecies::Loop { peptide: i };
                let mass = alpha.mass + linker_mass;
                if within_any_observed(mass, observed_masses, precursor_tol) {
                    local.push(species);
                }
            }

            let upper = max_observed - linker_mass - alpha.mass + precursor_tol.absolute_error(max_observed);
            let lower = min_observed - linker_mass - alpha.mass - precursor_tol.absolute_error(min_observed);

            for (j, beta) in peptides.iter().enumerate().skip(i) {
                if beta.mass > upper {
                    break;
                }
                if beta.mass < lower {
                    continue;
                }
                let mass = alpha.mass + beta.mass + linker_mass;
                if within_any_observed(mass, observed_masses, precursor_tol) {
                    local.push(CrossLinkSpecies::Cross { alpha: i, beta: j });
                }
            }

            local
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peptide::PeptidePosition;

    fn peptide(sequence: &str, mass: f64) -> Peptide {
        Peptide { sequence: sequence.to_string(), mass, position: PeptidePosition::Internal, modifications: vec![] }
    }

    #[test]
    fn mono_link_within_tolerance_is_retained() {
        let peptides = vec![peptide("PEPTIDEK", 927.4555)];
        let observed = [1083.534];
        let anchors = AnchorConfig { side1: b"K", side2: b"K", allow_n_term: false, allow_c_term: false };
        let tol = Tolerance::ppm(10.0);
        let species = enumerate_species(&peptides, &observed, 138.0680796, &[156.0786], &anchors, &tol);
        assert!(species
            .iter()
            .any(|s| matches!(s, CrossLinkSpecies::Mono { peptide: 0, .. })));
    }

    #[test]
    fn loop_link_requires_both_sides_present() {
        // Only one K: side1 and side2 are both K, so the single K satisfies both
        // sides trivially under this spec (scenario 2 actually uses distinct
        // residue sets, verified here with disjoint sides and a single anchor).
        let peptides = vec![peptide("PEPTIDER", 927.4555)];
        let observed = [927.4555 + 138.0680796];
        let anchors = AnchorConfig { side1: b"K", side2: b"R", allow_n_term: false, allow_c_term: false };
        let tol = Tolerance::ppm(10.0);
        let species = enumerate_species(&peptides, &observed, 138.0680796, &[], &anchors, &tol);
        // Peptide has only R, not K: side1 (K) has no anchor, so no loop-link.
        assert!(!species.iter().any(|s| matches!(s, CrossLinkSpecies::Loop { .. })));
    }

    #[test]
    fn inter_peptide_cross_within_tolerance() {
        let peptides = vec![peptide("KLEEK", 632.3538), peptide("PEPTIDEK", 927.4555)];
        let observed = [1697.8773];
        let anchors = AnchorConfig { side1: b"K", side2: b"K", allow_n_term: false, allow_c_term: false };
        let tol = Tolerance::ppm(10.0);
        let species = enumerate_species(&peptides, &observed, 138.0680796, &[], &anchors, &tol);
        assert!(species
            .iter()
            .any(|s| matches!(s, CrossLinkSpecies::Cross { .. })));
    }

    #[test]
    fn every_emitted_cross_species_is_within_tolerance_of_some_observed_mass() {
        let peptides = vec![
            peptide("KLEEK", 632.3538),
            peptide("PEPTIDEK", 927.4555),
            peptide("SAMPLEK", 750.1),
        ];
        let observed = [1697.8773, 1800.0];
        let anchors = AnchorConfig { side1: b"K", side2: b"K", allow_n_term: false, allow_c_term: false };
        let tol = Tolerance::ppm(10.0);
        let species = enumerate_species(&peptides, &observed, 138.0680796, &[156.0786], &anchors, &tol);

        for s in &species {
            let mass = match s {
                CrossLinkSpecies::Mono { peptide: p, mono_link_mass } => peptides[*p].mass + mono_link_mass,
                CrossLinkSpecies::Loop { peptide: p } => peptides[*p].mass + 138.0680796,
                CrossLinkSpecies::Cross { alpha, beta } => peptides[*alpha].mass + peptides[*beta].mass + 138.0680796,
            };
            assert!(
                observed.iter().any(|&o| tol.contains(mass, o)),
                "species with mass {mass} has no observed match within tolerance"
            );
        }
    }
}
