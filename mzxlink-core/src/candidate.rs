//! The Candidate Builder (spec §4.3): expand an abstract [`CrossLinkSpecies`]
//! into every concrete [`CrossLinkCandidate`] by pairing anchor sites.

use crate::enumerate::AnchorConfig;
use crate::peptide::Peptide;
use crate::species::{CrossLinkCandidate, CrossLinkSpecies};

/// Anchor sites on a peptide eligible for cross-link side 1 or side 2,
/// including a synthetic terminal site when terminal linking is enabled.
///
/// A terminal site is represented with the sentinel index `usize::MAX` so it
/// never collides with a real 0-based residue index; downstream consumers
/// (the fragment generator) special-case it to mean "the peptide terminus".
pub const TERMINAL_SITE: usize = usize::MAX;

fn candidate_sites(peptide: &Peptide, side: &[u8], allow_n_term: bool, allow_c_term: bool) -> Vec<usize> {
    let mut sites = peptide.anchor_positions(side);
    if allow_n_term && peptide.position.is_n_term() {
        sites.push(TERMINAL_SITE);
    }
    if allow_c_term && peptide.position.is_c_term() {
        sites.push(TERMINAL_SITE);
    }
    sites.sort_unstable();
    sites.dedup();
    sites
}

/// Expand one [`CrossLinkSpecies`] into every concrete anchor-site placement.
///
/// For `Mono`, each anchor site on either side yields one candidate. For
/// `Loop`, every distinct pair of sites (one from each side, `site_alpha !=
/// site_beta`) yields one candidate. For `Cross`, every combination of an
/// α-side site and a β-side site yields one candidate.
#[must_use]
pub fn build_candidates(
    species: CrossLinkSpecies,
    peptides: &[Peptide],
    anchors: &AnchorConfig<'_>,
) -> Vec<CrossLinkCandidate> {
    match species {
        CrossLinkSpecies::Mono { peptide, .. } => {
            let p = &peptides[peptide];
            let mut sites = candidate_sites(p, anchors.side1, anchors.allow_n_term, anchors.allow_c_term);
            sites.extend(candidate_sites(p, anchors.side2, anchors.allow_n_term, anchors.allow_c_term));
            sites.sort_unstable();
            sites.dedup();
            sites
                .into_iter()
                .map(|site_alpha| CrossLinkCandidate { species, site_alpha, site_beta: 0 })
                .collect()
        }
        CrossLinkSpecies::Loop { peptide } => {
            let p = &peptides[peptide];
            let side1_sites = candidate_sites(p, anchors.side1, anchors.allow_n_term, anchors.allow_c_term);
            let side2_sites = candidate_sites(p, anchors.side2, anchors.allow_n_term, anchors.allow_c_term);
            let mut out = Vec::new();
            for &a in &side1_sites {
                for &b in &side2_sites {
                    if a >= b {
                        continue;
                    }
                    out.push(CrossLinkCandidate { species, site_alpha: a, site_beta: b });
                }
            }
            out
        }
        CrossLinkSpecies::Cross { alpha, beta } => {
            let alpha_sites =
                candidate_sites(&peptides[alpha], anchors.side1, anchors.allow_n_term, anchors.allow_c_term);
            let beta_sites =
                candidate_sites(&peptides[beta], anchors.side2, anchors.allow_n_term, anchors.allow_c_term);
            let mut out = Vec::new();
            for &a in &alpha_sites {
                for &b in &beta_sites {
                    out.push(CrossLinkCandidate { species, site_alpha: a, site_beta: b });
                }
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peptide::PeptidePosition;

    fn peptide(sequence: &str) -> Peptide {
        Peptide::new(sequence.to_string(), PeptidePosition::Internal, vec![])
    }

    #[test]
    fn mono_yields_one_candidate_per_anchor_site() {
        let peptides = vec![peptide("PEKPTIDEK")];
        let anchors = AnchorConfig { side1: b"K", side2: b"K", allow_n_term: false, allow_c_term: false };
        let species = CrossLinkSpecies::Mono { peptide: 0, mono_link_mass: 156.0786 };
        let candidates = build_candidates(species, &peptides, &anchors);
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn loop_excludes_same_site_pairs() {
        let peptides = vec![peptide("KAEK")];
        let anchors = AnchorConfig { side1: b"K", side2: b"K", allow_n_term: false, allow_c_term: false };
        let species = CrossLinkSpecies::Loop { peptide: 0 };
        let candidates = build_candidates(species, &peptides, &anchors);
        assert!(candidates.iter().all(|c| c.site_alpha != c.site_beta));
        // Two K sites -> 1 ordered pair (site_alpha < site_beta) excluding the diagonal.
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].site_alpha < candidates[0].site_beta);
    }

    #[test]
    fn cross_pairs_every_alpha_site_with_every_beta_site() {
        let peptides = vec![peptide("PEPKTIDEK"), peptide("KLEEK")];
        let anchors = AnchorConfig { side1: b"K", side2: b"K", allow_n_term: false, allow_c_term: false };
        let species = CrossLinkSpecies::Cross { alpha: 0, beta: 1 };
        let candidates = build_candidates(species, &peptides, &anchors);
        // alpha has 2 K sites, beta has 2 K sites -> 4 combinations.
        assert_eq!(candidates.len(), 4);
    }

    #[test]
    fn terminal_linking_adds_sentinel_site() {
        let peptides = vec![Peptide::new("AAAAA".to_string(), PeptidePosition::NTerm, vec![])];
        let anchors = AnchorConfig { side1: b"K", side2: b"K", allow_n_term: true, allow_c_term: false };
        let species = CrossLinkSpecies::Mono { peptide: 0, mono_link_mass: 156.0786 };
        let candidates = build_candidates(species, &peptides, &anchors);
        assert_eq!(candidates, vec![CrossLinkCandidate { species, site_alpha: TERMINAL_SITE, site_beta: 0 }]);
    }
}
