//! The Fragment Spectrum Generator (spec §4.4).
//!
//! Backbone-ion mass formulas follow the teacher's `mzannotate/src/fragment/fragment.rs`
//! cartesian-product shape (ion series × position × charge × loss), generalized
//! from a plain linear peptide to the common/cross-link partition a linked
//! candidate requires.

use serde::{Deserialize, Serialize};

use crate::candidate::TERMINAL_SITE;
use crate::peptide::{Peptide, PeptidePosition};
use crate::residue::{residue_mass, PROTON_MASS, WATER_MASS};
use crate::species::CrossLinkSpecies;

const CO_MASS: f64 = 27.994_915;
const NH3_MASS: f64 = 17.026_549;
const H2O_LOSS: f64 = WATER_MASS;
const IMMONIUM_OFFSET: f64 = 26.003_07;

/// Which chain a generated peak belongs to.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Chain {
    /// Peptide α.
    Alpha,
    /// Peptide β (cross-link partner), absent for MONO/LOOP.
    Beta,
}

/// One theoretical peak, labeled for later match annotation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TheoreticalPeak {
    /// Mass over charge.
    pub mz: f64,
    /// Human-readable ion label, e.g. `"b3++"` or `"y5-H2O"`.
    pub label: String,
    /// Charge state this peak was generated at.
    pub charge: u8,
    /// Which peptide chain this ion belongs to.
    pub chain: Chain,
    /// False for fragments that span the cross-link anchor (spec §4.4).
    pub is_common: bool,
    /// Predicted relative intensity, used by the aligner's intensity-ratio
    /// check (spec §4.5). Backbone ions are strongest; isotopes, neutral
    /// losses, immonium ions and the precursor peak are scaled down from
    /// there, mirroring the per-ion-type relative intensities OpenMS's
    /// theoretical spectrum generator assigns.
    pub intensity: f64,
}

/// Which ion series and auxiliary peaks to emit.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IonConfig {
    /// Emit a-ions.
    pub add_a_ions: bool,
    /// Emit b-ions.
    pub add_b_ions: bool,
    /// Emit c-ions.
    pub add_c_ions: bool,
    /// Emit x-ions.
    pub add_x_ions: bool,
    /// Emit y-ions.
    pub add_y_ions: bool,
    /// Emit z-ions.
    pub add_z_ions: bool,
    /// Emit the +1 ¹³C isotope peak(s) alongside every monoisotopic peak.
    pub add_isotopes: bool,
    /// Maximum number of isotope peaks to add per ion (only used if `add_isotopes`).
    pub max_isotope: u32,
    /// Emit H2O/NH3 neutral-loss variants for S/T/E/D and R/K/N/Q respectively.
    pub add_losses: bool,
    /// Emit the intact precursor peak at each charge up to the precursor charge.
    pub add_precursor_peaks: bool,
    /// Emit immonium ions for abundant residue types present in the chain.
    pub add_abundant_immonium_ions: bool,
    /// Always emit b1/a1/c1 even if the corresponding series flag is unset.
    pub add_first_prefix_ion: bool,
}

impl Default for IonConfig {
    /// The common b/y-only default used by most cross-link search configurations.
    fn default() -> Self {
        Self {
            add_a_ions: false,
            add_b_ions: true,
            add_c_ions: false,
            add_x_ions: false,
            add_y_ions: true,
            add_z_ions: false,
            add_isotopes: true,
            max_isotope: 2,
            add_losses: true,
            add_precursor_peaks: false,
            add_abundant_immonium_ions: false,
            add_first_prefix_ion: false,
        }
    }
}

fn prefix_sum(seq: &[u8], i: usize) -> f64 {
    seq[..i].iter().map(|&b| residue_mass(b).unwrap_or(0.0)).sum()
}

fn suffix_sum(seq: &[u8], i: usize) -> f64 {
    let n = seq.len();
    seq[n - i..].iter().map(|&b| residue_mass(b).unwrap_or(0.0)).sum()
}

/// Resolve a candidate anchor site to a 0-based residue index, mapping the
/// terminal sentinel to the actual terminus of `peptide`.
fn resolve_site(peptide: &Peptide, site: usize) -> usize {
    if site != TERMINAL_SITE {
        return site;
    }
    if peptide.position == PeptidePosition::CTerm {
        peptide.len().saturating_sub(1)
    } else {
        0
    }
}

struct SeriesPoint {
    /// Neutral (singly-protonated) mass of this backbone fragment, before charge scaling.
    mass1: f64,
    /// Number of residues contained in the fragment, from the series' own terminus.
    length: usize,
    /// Ion number shown in the label (e.g. the `3` in `"b3"`); equal to `length`
    /// for every series since each point is indexed from its own terminus.
    label_index: usize,
}

fn ion_point(series: char, seq: &[u8], index: usize) -> SeriesPoint {
    match series {
        'a' => SeriesPoint { mass1: prefix_sum(seq, index) + PROTON_MASS - CO_MASS, length: index, label_index: index },
        'b' => SeriesPoint { mass1: prefix_sum(seq, index) + PROTON_MASS, length: index, label_index: index },
        'c' => SeriesPoint { mass1: prefix_sum(seq, index) + PROTON_MASS + NH3_MASS, length: index, label_index: index },
        'x' => SeriesPoint { mass1: suffix_sum(seq, index) + WATER_MASS + PROTON_MASS + CO_MASS - 2.0 * 1.007_825, length: index, label_index: index },
        'y' => SeriesPoint { mass1: suffix_sum(seq, index) + WATER_MASS + PROTON_MASS, length: index, label_index: index },
        'z' => SeriesPoint { mass1: suffix_sum(seq, index) + WATER_MASS + PROTON_MASS - NH3_MASS + 1.007_825, length: index, label_index: index },
        _ => unreachable!("ion_point only called with recognized series letters"),
    }
}

fn is_n_terminal_series(series: char) -> bool {
    matches!(series, 'a' | 'b' | 'c')
}

/// Relative predicted intensity of a series' base (unlossed, monoisotopic) peak.
/// b/y dominate real fragmentation spectra; a/x and c/z are secondary series.
fn base_intensity(series: char) -> f64 {
    match series {
        'b' | 'y' => 1.0,
        'c' | 'z' => 0.75,
        _ => 0.5,
    }
}

fn has_loss_target(seq: &[u8], n_terminal: bool, index: usize, targets: &[u8]) -> bool {
    let range: &[u8] = if n_terminal { &seq[..index] } else { &seq[seq.len() - index..] };
    range.iter().any(|b| targets.contains(&b.to_ascii_uppercase()))
}

#[allow(clippy::too_many_arguments)]
fn push_ion(
    out: &mut Vec<TheoreticalPeak>,
    series: char,
    seq: &[u8],
    index: usize,
    extra_mass: f64,
    is_common: bool,
    chain: Chain,
    max_charge: u8,
    config: &IonConfig,
) {
    let point = ion_point(series, seq, index);
    let n_terminal = is_n_terminal_series(series);
    let base = base_intensity(series);

    for charge in 1..=max_charge.max(1) {
        let mass_at_charge = point.mass1 + extra_mass;
        let mz = (mass_at_charge + f64::from(charge - 1) * PROTON_MASS) / f64::from(charge);
        let charge_tag = if charge > 1 { format!("{charge}+") } else { String::new() };
        out.push(TheoreticalPeak {
            mz,
            label: format!("{series}{}{charge_tag}", point.label_index),
            charge,
            chain,
            is_common,
            intensity: base,
        });

        if config.add_isotopes {
            for k in 1..=config.max_isotope {
                out.push(TheoreticalPeak {
                    mz: mz + f64::from(k) * crate::residue::ISOTOPE_SPACING / f64::from(charge),
                    label: format!("{series}{}{charge_tag}+{k}i", point.label_index),
                    charge,
                    chain,
                    is_common,
                    intensity: base * 0.5_f64.powi(k as i32),
                });
            }
        }

        if config.add_losses {
            if has_loss_target(seq, n_terminal, point.length, b"STED") {
                out.push(TheoreticalPeak {
                    mz: mz - H2O_LOSS / f64::from(charge),
                    label: format!("{series}{}{charge_tag}-H2O", point.label_index),
                    charge,
                    chain,
                    is_common,
                    intensity: base * 0.1,
                });
            }
            if has_loss_target(seq, n_terminal, point.length, b"RKNQ") {
                out.push(TheoreticalPeak {
                    mz: mz - NH3_MASS / f64::from(charge),
                    label: format!("{series}{}{charge_tag}-NH3", point.label_index),
                    charge,
                    chain,
                    is_common,
                    intensity: base * 0.1,
                });
            }
        }
    }
}

/// Generate the full theoretical peak list for one cross-link candidate.
///
/// `site_alpha`/`site_beta` are the anchor residue indices already resolved by
/// the candidate builder (terminal sentinel still allowed here and resolved
/// internally). `precursor_charge` bounds the charge range used for cross-link
/// ions, per spec §4.4 (`1 ..= precursor_charge - 1`, minimum 2 for CROSS).
#[must_use]
pub fn generate_fragments(
    alpha: &Peptide,
    beta: Option<&Peptide>,
    species: &CrossLinkSpecies,
    site_alpha: usize,
    site_beta: usize,
    linker_mass: f64,
    precursor_charge: u8,
    config: &IonConfig,
) -> Vec<TheoreticalPeak> {
    let mut out = Vec::new();
    let series: Vec<char> = [
        (config.add_a_ions, 'a'),
        (config.add_b_ions, 'b'),
        (config.add_c_ions, 'c'),
        (config.add_x_ions, 'x'),
        (config.add_y_ions, 'y'),
        (config.add_z_ions, 'z'),
    ]
    .into_iter()
    .filter_map(|(on, s)| on.then_some(s))
    .collect();

    let alpha_anchor = resolve_site(alpha, site_alpha);
    // LOOP spans two sites on the same peptide: a fragment is only "common" if
    // it contains neither; it becomes an xlink ion as soon as it spans either.
    let alpha_second_anchor =
        matches!(species, CrossLinkSpecies::Loop { .. }).then(|| resolve_site(alpha, site_beta));
    generate_chain(
        &mut out, alpha, alpha_anchor, alpha_second_anchor, &series, species, linker_mass,
        beta.map(|b| b.mass), precursor_charge, Chain::Alpha, config,
    );

    if let Some(beta) = beta {
        let beta_anchor = resolve_site(beta, site_beta);
        generate_chain(
            &mut out, beta, beta_anchor, None, &series, species, linker_mass,
            Some(alpha.mass), precursor_charge, Chain::Beta, config,
        );
    }

    if config.add_first_prefix_ion {
        for s in ['a', 'b', 'c'] {
            push_ion(&mut out, s, alpha.sequence.as_bytes(), 1, 0.0, true, Chain::Alpha, 1, config);
        }
    }

    if config.add_abundant_immonium_ions {
        push_immonium_ions(&mut out, alpha, Chain::Alpha);
        if let Some(beta) = beta {
            push_immonium_ions(&mut out, beta, Chain::Beta);
        }
    }

    if config.add_precursor_peaks {
        let total_mass = species.mass(
            |_| if matches!(species, CrossLinkSpecies::Cross { .. }) { beta.map_or(alpha.mass, |b| b.mass) } else { alpha.mass },
            linker_mass,
        );
        for charge in 1..=precursor_charge.max(1) {
            out.push(TheoreticalPeak {
                mz: (total_mass + f64::from(charge) * PROTON_MASS) / f64::from(charge),
                label: format!("[M+{charge}H]{charge}+"),
                charge,
                chain: Chain::Alpha,
                is_common: false,
                intensity: 0.05,
            });
        }
    }

    out.sort_by(|a, b| a.mz.partial_cmp(&b.mz).unwrap_or(std::cmp::Ordering::Equal));
    out
}

fn push_immonium_ions(out: &mut Vec<TheoreticalPeak>, peptide: &Peptide, chain: Chain) {
    const ABUNDANT: &[u8] = b"WYFHRKMLIC";
    let mut seen = std::collections::HashSet::new();
    for &residue in peptide.sequence.as_bytes() {
        let residue = residue.to_ascii_uppercase();
        if ABUNDANT.contains(&residue) && seen.insert(residue) {
            if let Some(mass) = residue_mass(residue) {
                out.push(TheoreticalPeak {
                    mz: mass - IMMONIUM_OFFSET + PROTON_MASS,
                    label: format!("imm-{}", residue as char),
                    charge: 1,
                    chain,
                    is_common: true,
                    intensity: 0.2,
                });
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn generate_chain(
    out: &mut Vec<TheoreticalPeak>,
    peptide: &Peptide,
    anchor: usize,
    second_anchor: Option<usize>,
    series: &[char],
    species: &CrossLinkSpecies,
    linker_mass: f64,
    partner_mass: Option<f64>,
    precursor_charge: u8,
    chain: Chain,
    config: &IonConfig,
) {
    let seq = peptide.sequence.as_bytes();
    let n = seq.len();
    if n == 0 {
        return;
    }

    let xlink_extra = match species {
        CrossLinkSpecies::Mono { mono_link_mass, .. } => *mono_link_mass,
        CrossLinkSpecies::Loop { .. } => linker_mass,
        CrossLinkSpecies::Cross { .. } => linker_mass + partner_mass.unwrap_or(0.0),
    };
    let xlink_min_charge: u8 = match species {
        CrossLinkSpecies::Cross { .. } => 2,
        _ => 1,
    };
    let xlink_max_charge = precursor_charge.saturating_sub(1).max(xlink_min_charge);

    for &s in series {
        let n_terminal = is_n_terminal_series(s);
        for index in 1..n {
            let spans = |site: usize| if n_terminal { index > site } else { n - index <= site };
            let spans_anchor = spans(anchor) || second_anchor.is_some_and(spans);
            if spans_anchor {
                for charge in xlink_min_charge..=xlink_max_charge {
                    push_ion(out, s, seq, index, xlink_extra, false, chain, charge, config);
                }
            } else {
                push_ion(out, s, seq, index, 0.0, true, chain, 1, config);
            }
        }
    }
}
