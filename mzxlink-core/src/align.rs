//! The Peak Aligner (spec §4.5).
//!
//! The banded dynamic-programming alignment follows `OpenProXLUtils::getSpectrumAlignment`
//! (`original_source/.../OpenProXLUtils.cpp:1045` ff.) in spirit: full edit-distance-style
//! DP here rather than a hand-tightened band, since the matrices involved (theoretical
//! peaks per candidate × observed peaks per spectrum) are small enough that the band
//! optimization in the original is a performance detail, not a semantic one.

use crate::error::{invalid_input, CoreError};
use crate::fragment::TheoreticalPeak;
use crate::spectrum::Peak;

fn intensity_compatible(a: f64, b: f64, cutoff: f64) -> bool {
    if a <= 0.0 || b <= 0.0 {
        return cutoff <= 0.0;
    }
    (a.min(b) / a.max(b)) >= cutoff
}

fn charge_compatible(a: Option<u8>, b: Option<u8>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => x == y,
        _ => true,
    }
}

fn is_sorted_by_mz(peaks: &[Peak]) -> bool {
    peaks.windows(2).all(|w| w[0].mz <= w[1].mz)
}

fn is_sorted_theoretical(peaks: &[TheoreticalPeak]) -> bool {
    peaks.windows(2).all(|w| w[0].mz <= w[1].mz)
}

/// Banded dynamic-programming alignment in absolute Da tolerance.
///
/// Cell `(i, j)` holds the minimum cumulative cost of aligning the first `i`
/// theoretical peaks to the first `j` observed peaks; `tol` is both the match
/// window and the per-skip gap cost. Returns ascending `(theoretical_index,
/// observed_index)` pairs.
pub fn align_absolute(
    theoretical: &[TheoreticalPeak],
    observed: &[Peak],
    tol: f64,
    intensity_cutoff: f64,
) -> Result<Vec<(usize, usize)>, CoreError> {
    if !is_sorted_theoretical(theoretical) || !is_sorted_by_mz(observed) {
        return Err(invalid_input("aligner input is not sorted by m/z"));
    }
    let n = theoretical.len();
    let m = observed.len();
    if n == 0 || m == 0 {
        return Ok(Vec::new());
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Step {
        Match,
        SkipTheo,
        SkipObs,
        Start,
    }

    let mut cost = vec![vec![0.0_f64; m + 1]; n + 1];
    let mut back = vec![vec![Step::Start; m + 1]; n + 1];
    for i in 1..=n {
        cost[i][0] = cost[i - 1][0] + tol;
        back[i][0] = Step::SkipTheo;
    }
    for j in 1..=m {
        cost[0][j] = cost[0][j - 1] + tol;
        back[0][j] = Step::SkipObs;
    }

    for i in 1..=n {
        let t = &theoretical[i - 1];
        for j in 1..=m {
            let o = &observed[j - 1];
            let can_match = (t.mz - o.mz).abs() < tol
                && charge_compatible(Some(t.charge), o.charge)
                && intensity_compatible(t.intensity, o.intensity, intensity_cutoff);

            let skip_theo = cost[i - 1][j] + tol;
            let skip_obs = cost[i][j - 1] + tol;
            let mut best = skip_theo;
            let mut step = Step::SkipTheo;
            if skip_obs < best {
                best = skip_obs;
                step = Step::SkipObs;
            }
            if can_match {
                let match_cost = cost[i - 1][j - 1];
                if match_cost <= best {
                    best = match_cost;
                    step = Step::Match;
                }
            }
            cost[i][j] = best;
            back[i][j] = step;
        }
    }

    let mut pairs = Vec::new();
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        match back[i][j] {
            Step::Match => {
                pairs.push((i - 1, j - 1));
                i -= 1;
                j -= 1;
            }
            Step::SkipTheo => i -= 1,
            Step::SkipObs => j -= 1,
            Step::Start => break,
        }
    }
    pairs.reverse();
    Ok(pairs)
}

/// Nearest-neighbor alignment in relative (ppm) tolerance: for each
/// theoretical peak, binary-search the nearest observed peak and accept it if
/// within `theo_mz × tol_ppm × 10⁻⁶` and intensity-compatible. On an
/// intensity-ratio failure, back up the theoretical index by one so the
/// observed peak can instead be claimed by its predecessor.
pub fn align_relative(
    theoretical: &[TheoreticalPeak],
    observed: &[Peak],
    tol_ppm: f64,
    intensity_cutoff: f64,
) -> Result<Vec<(usize, usize)>, CoreError> {
    if !is_sorted_theoretical(theoretical) || !is_sorted_by_mz(observed) {
        return Err(invalid_input("aligner input is not sorted by m/z"));
    }

    let mut pairs = Vec::new();
    let mut t = 0;
    while t < theoretical.len() {
        let theo = &theoretical[t];
        let window = theo.mz * tol_ppm * 1e-6;
        let idx = observed.partition_point(|p| p.mz < theo.mz);
        let candidate = [idx.checked_sub(1), Some(idx)]
            .into_iter()
            .flatten()
            .filter(|&i| i < observed.len())
            .min_by(|&a, &b| {
                (observed[a].mz - theo.mz)
                    .abs()
                    .partial_cmp(&(observed[b].mz - theo.mz).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

        if let Some(obs_idx) = candidate {
            let obs = &observed[obs_idx];
            let within_window = (obs.mz - theo.mz).abs() <= window;
            let within_intensity = intensity_compatible(theo.intensity, obs.intensity, intensity_cutoff)
                && charge_compatible(Some(theo.charge), obs.charge);

            if within_window && within_intensity {
                pairs.push((t, obs_idx));
            } else if within_window && !within_intensity && t > 0 {
                // Backup: let the previous theoretical peak have another go at
                // this observed peak before giving up on it entirely.
                t -= 1;
                continue;
            }
        }
        t += 1;
    }
    Ok(pairs)
}

/// Intensity-weighted greedy alignment used to prepare the cross-correlation
/// score: each observed peak can be consumed by at most one theoretical peak.
/// Among in-window candidates the most intense observed peak is tried first;
/// ties are broken by theoretical m/z order (ascending), matching the order
/// `generate_fragments` already sorts its output in.
pub fn align_intensity_weighted(
    theoretical: &[TheoreticalPeak],
    observed: &[Peak],
    tol: f64,
    intensity_cutoff: f64,
) -> Result<Vec<(usize, usize)>, CoreError> {
    if !is_sorted_theoretical(theoretical) || !is_sorted_by_mz(observed) {
        return Err(invalid_input("aligner input is not sorted by m/z"));
    }

    let mut consumed = vec![false; observed.len()];
    let mut pairs = Vec::new();
    for (t_idx, theo) in theoretical.iter().enumerate() {
        let lo = observed.partition_point(|p| p.mz < theo.mz - tol);
        let hi = observed.partition_point(|p| p.mz < theo.mz + tol);
        let best = (lo..hi)
            .filter(|&i| !consumed[i])
            .filter(|&i| charge_compatible(Some(theo.charge), observed[i].charge))
            .max_by(|&a, &b| {
                observed[a]
                    .intensity
                    .partial_cmp(&observed[b].intensity)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        if let Some(obs_idx) = best {
            if intensity_compatible(theo.intensity, observed[obs_idx].intensity, intensity_cutoff) {
                consumed[obs_idx] = true;
                pairs.push((t_idx, obs_idx));
            }
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::Chain;

    fn theo_i(mz: f64, intensity: f64) -> TheoreticalPeak {
        TheoreticalPeak { mz, label: String::new(), charge: 1, chain: Chain::Alpha, is_common: true, intensity }
    }

    fn theo(mz: f64) -> TheoreticalPeak {
        theo_i(mz, 1.0)
    }

    fn obs(mz: f64, intensity: f64) -> Peak {
        Peak { mz, intensity, charge: None }
    }

    #[test]
    fn absolute_alignment_matches_close_peaks_and_skips_far_ones() {
        let theoretical = vec![theo(100.00), theo(200.00), theo(300.00)];
        let observed = vec![obs(100.005, 1.0), obs(250.00, 1.0), obs(300.004, 1.0)];
        let pairs = align_absolute(&theoretical, &observed, 0.01, 0.0).unwrap();
        assert!(pairs.contains(&(0, 0)));
        assert!(pairs.contains(&(2, 2)));
        assert!(!pairs.iter().any(|&(t, _)| t == 1));
    }

    #[test]
    fn absolute_alignment_rejects_unsorted_input() {
        let theoretical = vec![theo(200.0), theo(100.0)];
        let observed = vec![obs(100.0, 1.0)];
        assert!(align_absolute(&theoretical, &observed, 0.01, 0.0).is_err());
    }

    #[test]
    fn relative_alignment_finds_nearest_within_ppm_window() {
        let theoretical = vec![theo(1000.0)];
        let observed = vec![obs(1000.0005, 1.0)];
        let pairs = align_relative(&theoretical, &observed, 10.0, 0.0).unwrap();
        assert_eq!(pairs, vec![(0, 0)]);
    }

    #[test]
    fn intensity_weighted_alignment_consumes_observed_peaks_once() {
        let theoretical = vec![theo(100.0), theo(100.001)];
        let observed = vec![obs(100.0005, 10.0)];
        let pairs = align_intensity_weighted(&theoretical, &observed, 0.01, 0.0).unwrap();
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn absolute_alignment_on_identical_spectra_is_the_diagonal() {
        let theoretical = vec![theo(100.0), theo(200.0), theo(300.0)];
        let observed = vec![obs(100.0, 1.0), obs(200.0, 1.0), obs(300.0, 1.0)];
        let pairs = align_absolute(&theoretical, &observed, 0.01, 0.0).unwrap();
        assert_eq!(pairs, vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn absolute_alignment_rejects_a_match_with_incompatible_intensity() {
        let theoretical = vec![theo_i(100.0, 1.0)];
        let observed = vec![obs(100.001, 100.0)];
        let pairs = align_absolute(&theoretical, &observed, 0.01, 0.5).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn absolute_alignment_accepts_a_match_with_compatible_intensity() {
        let theoretical = vec![theo_i(100.0, 10.0)];
        let observed = vec![obs(100.001, 9.0)];
        let pairs = align_absolute(&theoretical, &observed, 0.01, 0.5).unwrap();
        assert_eq!(pairs, vec![(0, 0)]);
    }

    #[test]
    fn relative_alignment_rejects_a_match_with_incompatible_intensity() {
        let theoretical = vec![theo_i(1000.0, 1.0)];
        let observed = vec![obs(1000.0003, 50.0)];
        let pairs = align_relative(&theoretical, &observed, 10.0, 0.5).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn relative_alignment_accepts_a_match_with_compatible_intensity() {
        let theoretical = vec![theo_i(1000.0, 40.0)];
        let observed = vec![obs(1000.0003, 50.0)];
        let pairs = align_relative(&theoretical, &observed, 10.0, 0.5).unwrap();
        assert_eq!(pairs, vec![(0, 0)]);
    }

    #[test]
    fn intensity_weighted_alignment_rejects_a_candidate_with_incompatible_intensity() {
        let theoretical = vec![theo_i(100.0, 1.0)];
        let observed = vec![obs(100.001, 100.0)];
        let pairs = align_intensity_weighted(&theoretical, &observed, 0.01, 0.5).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn generator_output_aligned_against_itself_matches_every_peak() {
        // Every theoretical peak, re-observed at the same m/z, must align back to itself.
        let theoretical = vec![theo(120.0), theo(245.5), theo(400.25)];
        let observed: Vec<Peak> = theoretical.iter().map(|t| obs(t.mz, 1.0)).collect();
        let pairs = align_absolute(&theoretical, &observed, 0.001, 0.0).unwrap();
        assert_eq!(pairs.len(), theoretical.len());
        for (t, o) in &pairs {
            assert_eq!(t, o);
        }
    }
}
