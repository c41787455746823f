//! The per-spectrum state machine and worker pool (spec §5, "State machine
//! per observed spectrum").
//!
//! Follows the teacher's `rayon` `par_iter` usage across spectra (e.g.
//! `examples/multi-annotator/src/main.rs`): each observed spectrum is an
//! independent unit of work, processed to completion by one worker with no
//! cross-spectrum locking on the hot path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::align::{align_absolute, align_relative};
use crate::candidate::build_candidates;
use crate::config::{Config, ToleranceUnit};
use crate::enumerate::{enumerate_species, AnchorConfig};
use crate::error::CoreError;
use crate::fragment::{generate_fragments, IonConfig, TheoreticalPeak};
use crate::peptide::Peptide;
use crate::score::{
    autocorrelation_sum, composite_score, cross_correlation, intensity_sum, match_odds, pre_score, rank_top_k,
    tally_matches, weighted_tic, CandidateScore, RankedCandidate, ScoreWeights,
};
use crate::species::CrossLinkCandidate;
use crate::spectrum::ObservedSpectrum;

/// The state an observed spectrum has reached in the pipeline. Monotonic: no
/// back-edges.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum SpectrumState {
    /// Not yet examined.
    Unprocessed,
    /// Dropped by the pre-filter (too few peaks, or precursor charge out of range)
    /// or a fatal sort-precondition violation.
    Filtered,
    /// Candidate species/candidates were generated (possibly zero).
    Enumerated,
    /// Every candidate was scored.
    Scored,
    /// The top-k ranked list was produced (possibly empty).
    Ranked,
}

/// Outcome for one observed spectrum.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SpectrumResult {
    /// The spectrum's native id, copied through for correlating results back to input.
    pub native_id: String,
    /// Final state reached.
    pub state: SpectrumState,
    /// Ranked candidates, highest score first. Empty if none survived or the
    /// spectrum was filtered/errored.
    pub ranked: Vec<RankedCandidate>,
    /// Human-readable diagnostic, set when `state` is `Filtered` due to an error
    /// rather than a plain pre-filter drop.
    pub error: Option<String>,
    /// Number of scored candidates (for this spectrum) whose `match_odds`
    /// computation hit the `CumBinom` clamp.
    pub numeric_limit_events: usize,
}

/// Run-wide diagnostics, mirroring OpenProXL's protein/peptide/spectrum
/// progress counters (spec §3 "Pipeline diagnostics").
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct Diagnostics {
    /// Spectra dropped by the pre-filter.
    pub filtered: usize,
    /// Spectra with at least one enumerated species.
    pub enumerated: usize,
    /// Spectra that produced a non-empty ranked list.
    pub ranked: usize,
    /// Spectra skipped due to a fatal per-spectrum error (e.g. unsorted peaks).
    pub errored: usize,
    /// Count of `NumericLimit` (CumBinom clamp) events observed across all candidates.
    pub numeric_limit_events: usize,
}

fn tolerance_for(config: &Config, is_xlink: bool) -> crate::config::Tolerance {
    if is_xlink {
        config.fragment_tol_xlinks
    } else {
        config.fragment_tol
    }
}

fn align_by_tolerance(
    theoretical: &[TheoreticalPeak],
    observed: &crate::spectrum::ObservedSpectrum,
    tol: &crate::config::Tolerance,
    intensity_cutoff: f64,
) -> Result<Vec<(usize, usize)>, CoreError> {
    match tol.unit {
        ToleranceUnit::Da => align_absolute(theoretical, &observed.peaks, tol.value, intensity_cutoff),
        ToleranceUnit::Ppm => align_relative(theoretical, &observed.peaks, tol.value, intensity_cutoff),
    }
}

fn score_candidate(
    candidate: &CrossLinkCandidate,
    alpha: &Peptide,
    beta: Option<&Peptide>,
    spectrum: &ObservedSpectrum,
    config: &Config,
    min_digest_length: usize,
    max_digest_length: usize,
    autocorr: f64,
) -> Result<CandidateScore, CoreError> {
    let ion_config = IonConfig::default();
    let theoretical = generate_fragments(
        alpha,
        beta,
        &candidate.species,
        candidate.site_alpha,
        candidate.site_beta,
        config.linker_mass,
        spectrum.precursor.charge,
        &ion_config,
    );

    let (common, xlink): (Vec<(usize, &TheoreticalPeak)>, Vec<(usize, &TheoreticalPeak)>) =
        theoretical.iter().enumerate().partition(|(_, p)| p.is_common);

    let common_peaks: Vec<TheoreticalPeak> = common.iter().map(|(_, p)| (*p).clone()).collect();
    let xlink_peaks: Vec<TheoreticalPeak> = xlink.iter().map(|(_, p)| (*p).clone()).collect();

    let common_tol = tolerance_for(config, false);
    let xlink_tol = tolerance_for(config, true);

    let common_matches = align_by_tolerance(&common_peaks, spectrum, &common_tol, config.intensity_cutoff)?;
    let xlink_matches = align_by_tolerance(&xlink_peaks, spectrum, &xlink_tol, config.intensity_cutoff)?;

    let mut matched_original_indices: Vec<usize> = common_matches.iter().map(|&(t, _)| common[t].0).collect();
    matched_original_indices.extend(xlink_matches.iter().map(|&(t, _)| xlink[t].0));

    let (alpha_counts, beta_counts) = tally_matches(&theoretical, &matched_original_indices);

    let pre = if beta.is_some() {
        pre_score(&alpha_counts, Some(&beta_counts))
    } else {
        pre_score(&alpha_counts, None)
    };

    let charges = if beta.is_some() { Some(u32::from(spectrum.precursor.charge.saturating_sub(1).max(1))) } else { None };
    let mz_range = |peaks: &[TheoreticalPeak]| -> f64 {
        let min = peaks.iter().map(|p| p.mz).fold(f64::INFINITY, f64::min);
        let max = peaks.iter().map(|p| p.mz).fold(f64::NEG_INFINITY, f64::max);
        (max - min).max(0.0)
    };
    let mean_xlink_mz = if xlink_peaks.is_empty() {
        0.0
    } else {
        xlink_peaks.iter().map(|p| p.mz).sum::<f64>() / xlink_peaks.len() as f64
    };
    let tol_th = xlink_tol.absolute_error(mean_xlink_mz);
    let (match_odds_score, numeric_limit_hit) = if xlink_peaks.is_empty() {
        (0.0, false)
    } else {
        match_odds(xlink_peaks.len(), alpha_counts.matched_xlink + beta_counts.matched_xlink, tol_th, mz_range(&xlink_peaks), charges)
    };

    let total_intensity = spectrum.total_ion_current();
    let matched_observed: Vec<usize> = common_matches.iter().map(|&(_, o)| o).chain(xlink_matches.iter().map(|&(_, o)| o)).collect();
    let matched_intensity_sum = intensity_sum(&spectrum.peaks, &matched_observed);

    let alpha_matched_intensity: f64 = common_matches
        .iter()
        .filter(|&&(t, _)| matches!(common[t].1.chain, crate::fragment::Chain::Alpha))
        .chain(xlink_matches.iter().filter(|&&(t, _)| matches!(xlink[t].1.chain, crate::fragment::Chain::Alpha)))
        .map(|&(_, o)| spectrum.peaks.get(o).map_or(0.0, |p| p.intensity))
        .sum();
    let beta_matched_intensity: f64 = common_matches
        .iter()
        .filter(|&&(t, _)| matches!(common[t].1.chain, crate::fragment::Chain::Beta))
        .chain(xlink_matches.iter().filter(|&&(t, _)| matches!(xlink[t].1.chain, crate::fragment::Chain::Beta)))
        .map(|&(_, o)| spectrum.peaks.get(o).map_or(0.0, |p| p.intensity))
        .sum();

    let chain_lengths = match beta {
        Some(beta_peptide) => vec![alpha.len(), beta_peptide.len()],
        None => vec![alpha.len(), (max_digest_length + min_digest_length).saturating_sub(alpha.len())],
    };
    let matched_intensities = match beta {
        Some(_) => vec![alpha_matched_intensity, beta_matched_intensity],
        None => vec![alpha_matched_intensity, 0.0],
    };
    let wtic = weighted_tic(&chain_lengths, &matched_intensities, total_intensity, min_digest_length, max_digest_length);

    let bin_width = common_tol.absolute_error(spectrum.precursor.neutral_mass).max(1e-6);
    let common_mz: Vec<f64> = common_peaks.iter().map(|p| p.mz).collect();
    let xlink_mz: Vec<f64> = xlink_peaks.iter().map(|p| p.mz).collect();
    let xcorr_common = cross_correlation(&spectrum.peaks, &common_mz, bin_width, autocorr);
    let xcorr_xlink = cross_correlation(&spectrum.peaks, &xlink_mz, bin_width, autocorr);

    let weights = ScoreWeights::default();
    let composite = composite_score(xcorr_xlink, xcorr_common, match_odds_score, wtic, matched_intensity_sum, &weights);

    Ok(CandidateScore {
        pre_score: pre,
        match_odds: match_odds_score,
        weighted_tic: wtic,
        intensity_sum: matched_intensity_sum,
        xcorr_common,
        xcorr_xlink,
        composite,
        numeric_limit_hit,
    })
}

fn process_spectrum(
    spectrum: &ObservedSpectrum,
    peptides: &[Peptide],
    config: &Config,
    min_digest_length: usize,
    max_digest_length: usize,
) -> SpectrumResult {
    if spectrum.peaks.len() < 2 * config.min_peptide_size
        || spectrum.precursor.charge < config.min_pc
        || spectrum.precursor.charge > config.max_pc
    {
        return SpectrumResult {
            native_id: spectrum.native_id.clone(),
            state: SpectrumState::Filtered,
            ranked: Vec::new(),
            error: None,
            numeric_limit_events: 0,
        };
    }

    if let Err(err) = spectrum.check_sorted() {
        return SpectrumResult {
            native_id: spectrum.native_id.clone(),
            state: SpectrumState::Filtered,
            ranked: Vec::new(),
            error: Some(err.to_string()),
            numeric_limit_events: 0,
        };
    }

    let anchors = AnchorConfig {
        side1: &config.anchor_residues_side1,
        side2: &config.anchor_residues_side2,
        allow_n_term: config.allow_n_term_linking,
        allow_c_term: config.allow_c_term_linking,
    };
    let species = enumerate_species(
        peptides,
        &[spectrum.precursor.neutral_mass],
        config.linker_mass,
        &config.mono_link_masses,
        &anchors,
        &config.precursor_tol,
    );

    if species.is_empty() {
        return SpectrumResult {
            native_id: spectrum.native_id.clone(),
            state: SpectrumState::Enumerated,
            ranked: Vec::new(),
            error: None,
            numeric_limit_events: 0,
        };
    }

    let candidates: Vec<CrossLinkCandidate> =
        species.into_iter().flat_map(|s| build_candidates(s, peptides, &anchors)).collect();

    if candidates.is_empty() {
        return SpectrumResult {
            native_id: spectrum.native_id.clone(),
            state: SpectrumState::Enumerated,
            ranked: Vec::new(),
            error: None,
            numeric_limit_events: 0,
        };
    }

    let bin_width = config.fragment_tol.absolute_error(spectrum.precursor.neutral_mass).max(1e-6);
    let autocorr = autocorrelation_sum(&spectrum.peaks, bin_width);

    let mut scores = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        let alpha_idx = match candidate.species {
            crate::species::CrossLinkSpecies::Mono { peptide, .. } | crate::species::CrossLinkSpecies::Loop { peptide } => peptide,
            crate::species::CrossLinkSpecies::Cross { alpha, .. } => alpha,
        };
        let beta_idx = match candidate.species {
            crate::species::CrossLinkSpecies::Cross { beta, .. } => Some(beta),
            _ => None,
        };
        let alpha = &peptides[alpha_idx];
        let beta = beta_idx.map(|i| &peptides[i]);

        match score_candidate(candidate, alpha, beta, spectrum, config, min_digest_length, max_digest_length, autocorr) {
            Ok(score) => scores.push(score),
            Err(_) => continue,
        }
    }

    let numeric_limit_events = scores.iter().filter(|s| s.numeric_limit_hit).count();
    let ranked = rank_top_k(&scores, config.top_k);
    let state = if ranked.is_empty() { SpectrumState::Scored } else { SpectrumState::Ranked };
    SpectrumResult { native_id: spectrum.native_id.clone(), state, ranked, error: None, numeric_limit_events }
}

/// Run the full pipeline over every observed spectrum, in parallel, checking
/// `cancel` between spectra (spec §5 "Cancellation").
#[must_use]
pub fn run_pipeline(
    peptides: &[Peptide],
    spectra: &[ObservedSpectrum],
    config: &Config,
    cancel: &Arc<AtomicBool>,
) -> (Vec<SpectrumResult>, Diagnostics) {
    let min_digest_length = peptides.iter().map(Peptide::len).min().unwrap_or(0);
    let max_digest_length = peptides.iter().map(Peptide::len).max().unwrap_or(0);

    let results: Vec<SpectrumResult> = spectra
        .par_iter()
        .map_init(
            || (),
            |(), spectrum| {
                if cancel.load(Ordering::Relaxed) {
                    return SpectrumResult {
                        native_id: spectrum.native_id.clone(),
                        state: SpectrumState::Unprocessed,
                        ranked: Vec::new(),
                        error: None,
                        numeric_limit_events: 0,
                    };
                }
                process_spectrum(spectrum, peptides, config, min_digest_length, max_digest_length)
            },
        )
        .collect();

    let mut diagnostics = Diagnostics::default();
    for result in &results {
        match result.state {
            SpectrumState::Filtered if result.error.is_some() => diagnostics.errored += 1,
            SpectrumState::Filtered => diagnostics.filtered += 1,
            SpectrumState::Enumerated | SpectrumState::Scored => diagnostics.enumerated += 1,
            SpectrumState::Ranked => diagnostics.ranked += 1,
            SpectrumState::Unprocessed => {}
        }
        diagnostics.numeric_limit_events += result.numeric_limit_events;
    }

    (results, diagnostics)
}
