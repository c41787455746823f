//! The Digestor (spec §4.1): protein sequence → modified peptide candidates.
//!
//! Mirrors `OpenProXLUtils::digestDatabase` (`original_source/.../OpenProXLUtils.cpp:1299`):
//! enzymatic digestion, ambiguity-code filtering, anchor-residue filtering,
//! sequence-level deduplication, then Cartesian expansion of fixed/variable
//! modifications.

use std::collections::HashSet;

use itertools::Itertools;

use crate::peptide::{Peptide, PeptidePosition};
use crate::residue::{is_ambiguity_code, Modification};

/// An enzymatic cleavage rule: cleave after `cleave_after` unless the next
/// residue is in `blocked_by`. Trypsin is the built-in default.
#[derive(Clone, Debug)]
pub struct Enzyme {
    /// Residues after which the enzyme cleaves.
    pub cleave_after: Vec<u8>,
    /// Residues that block cleavage when they immediately follow a cleavage site.
    pub blocked_by: Vec<u8>,
    /// Maximum number of internal cleavage sites that may be skipped per peptide.
    pub missed_cleavages: usize,
    /// Minimum peptide length (in residues) to keep.
    pub min_peptide_length: usize,
}

impl Enzyme {
    /// Trypsin: cleaves after K or R, unless followed by P.
    #[must_use]
    pub fn trypsin(missed_cleavages: usize, min_peptide_length: usize) -> Self {
        Self {
            cleave_after: vec![b'K', b'R'],
            blocked_by: vec![b'P'],
            missed_cleavages,
            min_peptide_length,
        }
    }

    fn cleavage_sites(&self, protein: &[u8]) -> Vec<usize> {
        let mut sites = vec![0];
        for i in 0..protein.len().saturating_sub(1) {
            let residue = protein[i].to_ascii_uppercase();
            let next = protein[i + 1].to_ascii_uppercase();
            if self.cleave_after.contains(&residue) && !self.blocked_by.contains(&next) {
                sites.push(i + 1);
            }
        }
        sites.push(protein.len());
        sites.dedup();
        sites
    }

    /// Every substring produced by this enzyme's cleavage rule allowing up to
    /// `missed_cleavages` skipped internal sites, together with its position
    /// tag relative to `protein`.
    fn digest_unmodified<'p>(&self, protein: &'p [u8]) -> Vec<(&'p [u8], usize, PeptidePosition)> {
        let sites = self.cleavage_sites(protein);
        let mut out = Vec::new();
        for start_idx in 0..sites.len() - 1 {
            for end_idx in
                start_idx + 1..=(start_idx + 1 + self.missed_cleavages).min(sites.len() - 1)
            {
                let start = sites[start_idx];
                let end = sites[end_idx];
                if end <= start || end - start < self.min_peptide_length {
                    continue;
                }
                let position = if start == 0 {
                    PeptidePosition::NTerm
                } else if end == protein.len() {
                    PeptidePosition::CTerm
                } else {
                    PeptidePosition::Internal
                };
                out.push((&protein[start..end], start, position));
            }
        }
        out
    }
}

/// Configuration controlling which peptides are kept and how modifications expand.
pub struct DigestConfig<'a> {
    /// The enzyme rule used to cleave proteins.
    pub enzyme: Enzyme,
    /// Anchor residues for cross-link side 1.
    pub anchor_side1: &'a [u8],
    /// Anchor residues for cross-link side 2.
    pub anchor_side2: &'a [u8],
    /// Whether N-terminal linking is allowed (keeps N-terminal peptides with no anchor).
    pub allow_n_term_linking: bool,
    /// Whether C-terminal linking is allowed (keeps C-terminal peptides with no anchor).
    pub allow_c_term_linking: bool,
    /// Fixed modifications, applied to every occurrence of their target residue.
    pub fixed_modifications: &'a [Modification],
    /// Variable modifications, expanded combinatorially up to `max_variable_mods_per_peptide`.
    pub variable_modifications: &'a [Modification],
    /// Cap on how many variable modification instances may be placed on one peptide.
    pub max_variable_mods_per_peptide: usize,
}

/// True if `seq` contains at least one anchor residue of either cross-link
/// side, or its `position` permits terminal linking.
fn has_anchor_or_terminal(
    seq: &[u8],
    position: PeptidePosition,
    cfg: &DigestConfig<'_>,
) -> bool {
    let has_anchor = seq
        .iter()
        .any(|b| cfg.anchor_side1.contains(&b.to_ascii_uppercase()) || cfg.anchor_side2.contains(&b.to_ascii_uppercase()));
    let terminal_ok = (cfg.allow_n_term_linking && position.is_n_term())
        || (cfg.allow_c_term_linking && position.is_c_term());
    has_anchor || terminal_ok
}

/// Every placement of up to `max_count` instances of `modifications` on `sequence`,
/// as a list of (index, modification) assignments. Always includes the empty
/// assignment (no variable modifications applied).
fn variable_modification_placements<'m>(
    sequence: &[u8],
    modifications: &'m [Modification],
    max_count: usize,
) -> Vec<Vec<(usize, &'m Modification)>> {
    let mut sites = Vec::new();
    for (index, &residue) in sequence.iter().enumerate() {
        for modification in modifications {
            if modification.applies_to(residue) {
                sites.push((index, modification));
            }
        }
    }

    let mut placements = vec![Vec::new()];
    for count in 1..=max_count.min(sites.len()) {
        placements.extend(sites.iter().copied().combinations(count));
    }
    placements
}

/// Digest one protein sequence into every retained, fully modified peptide.
#[must_use]
pub fn digest_protein(protein: &str, cfg: &DigestConfig<'_>) -> Vec<Peptide> {
    let protein_bytes = protein.as_bytes();
    let mut seen_unmodified: HashSet<&[u8]> = HashSet::new();
    let mut peptides = Vec::new();

    for (seq, _start, position) in cfg.enzyme.digest_unmodified(protein_bytes) {
        if seq.iter().any(|&b| is_ambiguity_code(b)) {
            continue;
        }
        if !has_anchor_or_terminal(seq, position, cfg) {
            continue;
        }
        if !seen_unmodified.insert(seq) {
            continue;
        }

        let sequence = String::from_utf8_lossy(seq).to_uppercase();

        let fixed_applied: Vec<_> = seq
            .iter()
            .enumerate()
            .flat_map(|(index, &residue)| {
                cfg.fixed_modifications
                    .iter()
                    .filter(move |m| m.applies_to(residue))
                    .map(move |m| crate::peptide::AppliedModification {
                        index,
                        id: m.id.clone(),
                        mass_delta: m.mass_delta,
                    })
            })
            .collect();

        for variable_combo in variable_modification_placements(
            seq,
            cfg.variable_modifications,
            cfg.max_variable_mods_per_peptide,
        ) {
            let mut applied = fixed_applied.clone();
            applied.extend(variable_combo.into_iter().map(|(index, m)| {
                crate::peptide::AppliedModification {
                    index,
                    id: m.id.clone(),
                    mass_delta: m.mass_delta,
                }
            }));
            peptides.push(Peptide::new(sequence.clone(), position, applied));
        }
    }

    peptides
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg<'a>(
        anchor_side1: &'a [u8],
        anchor_side2: &'a [u8],
    ) -> DigestConfig<'a> {
        DigestConfig {
            enzyme: Enzyme::trypsin(1, 3),
            anchor_side1,
            anchor_side2,
            allow_n_term_linking: false,
            allow_c_term_linking: false,
            fixed_modifications: &[],
            variable_modifications: &[],
            max_variable_mods_per_peptide: 0,
        }
    }

    #[test]
    fn trypsin_cleaves_after_k_and_r_not_before_p() {
        let enzyme = Enzyme::trypsin(0, 1);
        let digested = enzyme.digest_unmodified(b"AAKPAARBB");
        let strings: Vec<&str> = digested
            .iter()
            .map(|(s, _, _)| std::str::from_utf8(s).unwrap())
            .collect();
        // KP is not a cleavage site (blocked by P), R is.
        assert!(strings.contains(&"AAKPAAR"));
        assert!(strings.contains(&"BB"));
    }

    #[test]
    fn discards_ambiguity_codes() {
        let cfg = cfg(b"K", b"K");
        let peptides = digest_protein("AAXKAAAAAA", &cfg);
        assert!(peptides.iter().all(|p| !p.sequence.contains('X')));
    }

    #[test]
    fn keeps_only_peptides_with_an_anchor() {
        let cfg = cfg(b"K", b"K");
        // "AAAAAAAAA" has no K/R so trypsin returns it whole, with no anchor -> dropped.
        let peptides = digest_protein("AAAAAAAAA", &cfg);
        assert!(peptides.is_empty());
    }

    #[test]
    fn deduplicates_by_unmodified_sequence_before_expansion() {
        let cfg = cfg(b"K", b"K");
        let peptides = digest_protein("PEPTIDEKPEPTIDEK", &cfg);
        let unique_sequences: HashSet<_> = peptides.iter().map(|p| p.sequence.clone()).collect();
        assert_eq!(peptides.len(), unique_sequences.len());
    }

    #[test]
    fn variable_modifications_expand_combinatorially() {
        let var_mod = Modification {
            id: "Oxidation".to_string(),
            mass_delta: 15.994_915,
            target_residues: vec![b'M'],
            fixed: false,
        };
        let config = DigestConfig {
            enzyme: Enzyme::trypsin(0, 3),
            anchor_side1: b"K",
            anchor_side2: b"K",
            allow_n_term_linking: false,
            allow_c_term_linking: false,
            fixed_modifications: &[],
            variable_modifications: std::slice::from_ref(&var_mod),
            max_variable_mods_per_peptide: 1,
        };
        let peptides = digest_protein("MMKAAAA", &config);
        // Unmodified + one modification on either M = 3 variants.
        let target: Vec<_> = peptides.iter().filter(|p| p.sequence == "MMK").collect();
        assert_eq!(target.len(), 3);
    }
}
