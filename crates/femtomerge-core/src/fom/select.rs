use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cell::UnitCell;
use crate::error::{MergeError, Result};
use crate::reflist::ReflList;
use crate::symmetry::SymOpList;

/// Pair-selection policy applied before accumulating a figure of merit.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FomSelection {
    /// Reject pairs where either intensity is below this many sigmas.
    pub sigma_cutoff: f64,
    /// Drop pairs with a negative intensity on either side.
    pub ignore_negs: bool,
    /// Clamp negative intensities to zero instead of dropping the pair.
    pub zero_negs: bool,
    /// Minimum redundancy required on both sides.
    pub mul_cutoff: u32,
    /// Resolution bounds on d* in m^-1, if any.
    pub dstar_min: Option<f64>,
    pub dstar_max: Option<f64>,
    /// Anomalous mode: require complete Bijvoet pairs in both lists and
    /// exclude centric reflections.
    pub anomalous: bool,
}

impl Default for FomSelection {
    fn default() -> Self {
        Self {
            sigma_cutoff: f64::NEG_INFINITY,
            ignore_negs: false,
            zero_negs: false,
            mul_cutoff: 0,
            dstar_min: None,
            dstar_max: None,
            anomalous: false,
        }
    }
}

/// How many pairs each rejection rule removed.
#[derive(Clone, Copy, Debug, Default)]
pub struct SelectionCounts {
    pub n_common: usize,
    pub n_rejected_snr: usize,
    pub n_negative: usize,
    pub n_multiplicity: usize,
    pub n_resolution: usize,
    pub n_bijvoet_incomplete: usize,
    pub n_centric: usize,
}

/// Apply the selection policy to two lists, producing the accepted sublists
/// used for figure-of-merit accumulation.
pub fn select_pairs(
    list1: &ReflList,
    list2: &ReflList,
    cell: &UnitCell,
    sym: Option<&SymOpList>,
    opts: &FomSelection,
) -> Result<(ReflList, ReflList, SelectionCounts)> {
    let mut counts = SelectionCounts::default();
    let mut acc1 = ReflList::new();
    let mut acc2 = ReflList::new();

    for (&idx, refl1) in list1 {
        let refl2 = match list2.find(idx) {
            Some(r) => r,
            None => continue,
        };

        let mut val1 = refl1.intensity;
        let mut val2 = refl2.intensity;

        if val1 < opts.sigma_cutoff * refl1.sigma || val2 < opts.sigma_cutoff * refl2.sigma {
            counts.n_rejected_snr += 1;
            continue;
        }

        if opts.ignore_negs && (val1 < 0.0 || val2 < 0.0) {
            counts.n_negative += 1;
            continue;
        }

        if refl1.redundancy < opts.mul_cutoff || refl2.redundancy < opts.mul_cutoff {
            counts.n_multiplicity += 1;
            continue;
        }

        if opts.zero_negs && (val1 < 0.0 || val2 < 0.0) {
            val1 = val1.max(0.0);
            val2 = val2.max(0.0);
            counts.n_negative += 1;
        }

        let d = cell.resolution(idx);
        if opts.dstar_min.is_some_and(|lo| d < lo) || opts.dstar_max.is_some_and(|hi| d > hi) {
            counts.n_resolution += 1;
            continue;
        }

        let e1 = acc1.add(idx);
        *e1 = refl1.clone();
        e1.intensity = val1;
        let e2 = acc2.add(idx);
        *e2 = refl2.clone();
        e2.intensity = val2;
        counts.n_common += 1;
    }

    // Anomalous metrics need complete Bijvoet pairs that survived the tests
    // above, and centric reflections carry no anomalous signal.
    if opts.anomalous {
        let sym = sym.ok_or_else(|| {
            MergeError::Input("anomalous selection requires a point group".to_string())
        })?;

        let pre1 = acc1;
        let pre2 = acc2;
        acc1 = ReflList::new();
        acc2 = ReflList::new();
        counts.n_common = 0;

        for (&idx, refl1) in &pre1 {
            if sym.is_centric(idx) {
                counts.n_centric += 1;
                continue;
            }

            let mate = idx.negate();
            let in1 = sym.orbit(mate).into_iter().any(|e| pre1.contains(e));
            let in2 = sym.orbit(mate).into_iter().any(|e| pre2.contains(e));
            if !in1 || !in2 {
                counts.n_bijvoet_incomplete += 1;
                continue;
            }

            *acc1.add(idx) = refl1.clone();
            if let Some(refl2) = pre2.find(idx) {
                *acc2.add(idx) = refl2.clone();
            }
            counts.n_common += 1;
        }
    }

    if counts.n_rejected_snr > 0 {
        info!(
            n = counts.n_rejected_snr,
            cutoff = opts.sigma_cutoff,
            "pairs discarded below the I/sigma cutoff"
        );
    }
    if counts.n_negative > 0 {
        info!(n = counts.n_negative, "pairs with negative intensities");
    }
    if counts.n_multiplicity > 0 {
        info!(
            n = counts.n_multiplicity,
            "pairs rejected for too few measurements"
        );
    }
    if counts.n_resolution > 0 {
        info!(
            n = counts.n_resolution,
            "pairs rejected outside the resolution bounds"
        );
    }
    if counts.n_bijvoet_incomplete > 0 {
        info!(
            n = counts.n_bijvoet_incomplete,
            "pairs rejected for missing Bijvoet partners"
        );
    }
    if counts.n_centric > 0 {
        info!(n = counts.n_centric, "centric reflections excluded");
    }

    Ok((acc1, acc2, counts))
}
