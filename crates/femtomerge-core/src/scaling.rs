use std::collections::BTreeMap;

use tracing::debug;

use crate::consts::{MAX_SCALE_CYCLES, MIN_SCALABLE_PARTIALITY, SCALE_CONVERGENCE};
use crate::crystal::{Crystal, CrystalStatus};
use crate::error::{MergeError, Result};
use crate::hkl::Hkl;
use crate::reflist::ReflList;
use crate::stats::mean_stddev;

/// Options for one scaling pass.
#[derive(Clone, Copy, Debug)]
pub struct ScaleOptions {
    /// Hold every OSF at its current value (1.0 after loading) and only
    /// merge.
    pub no_scale: bool,
    /// Merged reflections with fewer contributing observations are dropped.
    pub min_measurements: u32,
}

impl Default for ScaleOptions {
    fn default() -> Self {
        Self {
            no_scale: false,
            min_measurements: 2,
        }
    }
}

/// Result of a scaling pass: the merged list plus bookkeeping for the
/// iteration report.
#[derive(Debug)]
pub struct ScaleOutcome {
    pub merged: ReflList,
    pub n_observations: usize,
    pub n_crystals_used: usize,
    pub converged: bool,
    pub cycles: usize,
    /// Observations skipped in the log-space solve for non-positive
    /// intensity.
    pub n_nonpositive: usize,
}

/// Decide which reflections of one list can be scaled: the reflection must
/// still be predicted (redundancy > 0), must not be vanishingly partial, and
/// must appear in the reference when one is given. Returns the accepted
/// count.
pub fn select_scalable(list: &mut ReflList, reference: Option<&ReflList>) -> usize {
    let mut n_acc = 0;
    for (&idx, refl) in list.iter_mut() {
        let mut sc = true;

        // Not found during the last partiality update.
        if refl.redundancy == 0 {
            sc = false;
        }

        // Hardly-there reflections cannot be scaled up meaningfully.
        if refl.partiality < MIN_SCALABLE_PARTIALITY {
            sc = false;
        }

        if let Some(reference) = reference {
            if reference.find(idx).is_none() {
                sc = false;
            }
        }

        refl.scalable = sc;
        if sc {
            n_acc += 1;
        }
    }
    n_acc
}

#[derive(Clone, Copy)]
struct Obs {
    crystal: usize,
    intensity: f64,
    sigma: f64,
    partiality: f64,
}

/// Solve for per-crystal scale factors and merged full intensities.
///
/// Alternating weighted least squares in log-OSF space: with full
/// intensities fixed, each crystal's log OSF is the weighted mean of
/// log I - log p - log F over its scalable observations; with OSFs fixed,
/// each full intensity is the weighted mean of I / (OSF * p). Repeats until
/// the largest log-OSF change drops below 1e-5 or the cycle cap is reached.
///
/// A crystal whose subproblem has no usable observations is flagged
/// `SolverFailed` and excluded from this pass. No scalable observations at
/// all is a `ScalingFailed` error.
///
/// Accumulation is sequential and in index order, so the outcome depends
/// only on the multiset of crystals.
pub fn scale(
    crystals: &mut [Crystal],
    reference: Option<&ReflList>,
    opts: &ScaleOptions,
) -> Result<ScaleOutcome> {
    // Observations grouped by asymmetric index, in key order.
    let mut obs_by_index: BTreeMap<Hkl, Vec<Obs>> = BTreeMap::new();
    let mut n_observations = 0;
    let mut used = vec![false; crystals.len()];

    for (ci, crystal) in crystals.iter().enumerate() {
        if crystal.is_flagged() {
            continue;
        }
        for (&idx, refl) in &crystal.reflections {
            if !refl.scalable || refl.partiality <= 0.0 {
                continue;
            }
            obs_by_index.entry(idx).or_default().push(Obs {
                crystal: ci,
                intensity: refl.intensity,
                sigma: refl.sigma,
                partiality: refl.partiality,
            });
            n_observations += 1;
            used[ci] = true;
        }
    }

    if n_observations == 0 {
        return Err(MergeError::ScalingFailed(
            "no scalable observations".to_string(),
        ));
    }

    // A crystal contributing nothing has an ill-conditioned subproblem:
    // flag it and leave it out of this pass.
    for (ci, crystal) in crystals.iter_mut().enumerate() {
        if !crystal.is_flagged() && !used[ci] {
            crystal.status = CrystalStatus::SolverFailed;
        }
    }
    let n_crystals_used = used.iter().filter(|u| **u).count();

    let mut osf: Vec<f64> = crystals.iter().map(|c| c.osf).collect();
    let mut active: Vec<bool> = crystals.iter().map(|c| !c.is_flagged()).collect();
    let mut full: BTreeMap<Hkl, f64> = BTreeMap::new();
    let mut n_nonpositive = 0;

    // Initial full estimates: reference intensities when given, otherwise a
    // weighted merge under the current OSFs.
    if let Some(reference) = reference {
        for (&idx, _) in &obs_by_index {
            if let Some(r) = reference.find(idx) {
                full.insert(idx, r.intensity);
            }
        }
    } else {
        merge_full(&obs_by_index, &osf, &active, &mut full);
    }

    let mut converged = opts.no_scale;
    let mut cycles = 0;

    if !opts.no_scale {
        for cycle in 0..MAX_SCALE_CYCLES {
            cycles = cycle + 1;

            // Per-crystal weighted means in log space, full held fixed.
            let mut num = vec![0.0; crystals.len()];
            let mut den = vec![0.0; crystals.len()];
            for (idx, obs) in &obs_by_index {
                let f = match full.get(idx) {
                    Some(&f) if f > 0.0 => f,
                    _ => continue,
                };
                for o in obs {
                    if !active[o.crystal] {
                        continue;
                    }
                    if o.intensity <= 0.0 {
                        n_nonpositive += 1;
                        continue;
                    }
                    let w = if o.sigma > 0.0 {
                        (o.intensity / o.sigma).powi(2)
                    } else {
                        1.0
                    };
                    num[o.crystal] += w * (o.intensity.ln() - o.partiality.ln() - f.ln());
                    den[o.crystal] += w;
                }
            }

            let mut max_change: f64 = 0.0;
            for ci in 0..crystals.len() {
                if crystals[ci].is_flagged() {
                    continue;
                }
                if den[ci] > 0.0 {
                    let new_log = num[ci] / den[ci];
                    max_change = max_change.max((new_log - osf[ci].ln()).abs());
                    osf[ci] = new_log.exp();
                } else if used[ci] {
                    crystals[ci].status = CrystalStatus::SolverFailed;
                    active[ci] = false;
                    used[ci] = false;
                }
            }

            // Re-estimate the full intensities, OSFs held fixed.
            if reference.is_none() {
                merge_full(&obs_by_index, &osf, &active, &mut full);
            }

            if max_change < SCALE_CONVERGENCE {
                converged = true;
                break;
            }
        }
    }

    for (crystal, new_osf) in crystals.iter_mut().zip(&osf) {
        if !crystal.is_flagged() {
            crystal.osf = *new_osf;
        }
    }

    // Final merged list with redundancy and pooled sigma from the spread of
    // the contributing observations.
    let mut merged = ReflList::new();
    for (&idx, obs) in &obs_by_index {
        let values: Vec<f64> = obs
            .iter()
            .filter(|o| !crystals[o.crystal].is_flagged())
            .map(|o| o.intensity / (osf[o.crystal] * o.partiality))
            .collect();
        let n = values.len() as u32;
        if n < opts.min_measurements.max(1) {
            continue;
        }

        let (weighted, wsum) = obs
            .iter()
            .filter(|o| !crystals[o.crystal].is_flagged())
            .fold((0.0, 0.0), |(acc, wacc), o| {
                let x = o.intensity / (osf[o.crystal] * o.partiality);
                let w = weight_of(o, osf[o.crystal]);
                (acc + w * x, wacc + w)
            });

        let entry = merged.add(idx);
        entry.intensity = weighted / wsum;
        entry.redundancy = n;
        entry.sigma = if n >= 2 {
            let (_, sd) = mean_stddev(&values);
            sd / (n as f64).sqrt()
        } else {
            let o = obs
                .iter()
                .find(|o| !crystals[o.crystal].is_flagged())
                .copied();
            o.map(|o| o.sigma / (osf[o.crystal] * o.partiality))
                .unwrap_or(0.0)
        };
    }

    if merged.is_empty() {
        return Err(MergeError::ScalingFailed(
            "no merged reflections survived the redundancy cut".to_string(),
        ));
    }

    debug!(
        cycles,
        converged, n_observations, n_crystals_used, "scaling pass finished"
    );

    Ok(ScaleOutcome {
        merged,
        n_observations,
        n_crystals_used,
        converged,
        cycles,
        n_nonpositive,
    })
}

fn weight_of(o: &Obs, osf: f64) -> f64 {
    if o.sigma > 0.0 {
        let scaled_sigma = o.sigma / (osf * o.partiality);
        1.0 / (scaled_sigma * scaled_sigma)
    } else {
        1.0
    }
}

fn merge_full(
    obs_by_index: &BTreeMap<Hkl, Vec<Obs>>,
    osf: &[f64],
    active: &[bool],
    full: &mut BTreeMap<Hkl, f64>,
) {
    full.clear();
    for (&idx, obs) in obs_by_index {
        let mut num = 0.0;
        let mut den = 0.0;
        for o in obs {
            if !active[o.crystal] {
                continue;
            }
            let x = o.intensity / (osf[o.crystal] * o.partiality);
            let w = weight_of(o, osf[o.crystal]);
            num += w * x;
            den += w;
        }
        if den > 0.0 {
            full.insert(idx, num / den);
        }
    }
}
