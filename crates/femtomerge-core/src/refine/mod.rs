pub mod lm;

use nalgebra::{SVector, UnitQuaternion, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{MIN_FULL_REDUNDANCY, REFINABLE_SNR};
use crate::crystal::{Crystal, CrystalStatus};
use crate::hkl::Hkl;
use crate::partiality::{PartialityModel, UpdateStats};
use crate::reflist::ReflList;

use lm::{optimize, LmConfig};

/// Knobs for per-crystal post-refinement.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RefineOptions {
    /// Crystals with fewer refinable reflections are flagged `NoRefinement`.
    pub min_refinable: usize,
    /// Flag a crystal `Lost` when more than this fraction of its previously
    /// scalable reflections drop out of prediction.
    pub lost_fraction: f64,
    pub max_iterations: usize,
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            min_refinable: 10,
            lost_fraction: 0.5,
            max_iterations: 30,
        }
    }
}

/// Aggregate outcome of one parallel refinement pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct RefineStats {
    pub n_refined: usize,
    pub n_no_refinement: usize,
    pub n_solver_failed: usize,
    pub n_lost: usize,
    pub n_gained: usize,
    pub n_dropped: usize,
}

impl RefineStats {
    pub fn n_flagged(&self) -> usize {
        self.n_no_refinement + self.n_solver_failed + self.n_lost
    }

    fn absorb(mut self, other: RefineStats) -> RefineStats {
        self.n_refined += other.n_refined;
        self.n_no_refinement += other.n_no_refinement;
        self.n_solver_failed += other.n_solver_failed;
        self.n_lost += other.n_lost;
        self.n_gained += other.n_gained;
        self.n_dropped += other.n_dropped;
        self
    }
}

/// Decide which reflections of a crystal may guide refinement: scalable,
/// I >= 3 sigma, and backed by a merged estimate of redundancy >= 2 (any
/// redundancy when an external reference list is in use). Returns the
/// accepted count.
pub fn select_refinable(crystal: &mut Crystal, full: &ReflList, have_reference: bool) -> usize {
    let mut n_acc = 0;
    for (&idx, refl) in crystal.reflections.iter_mut() {
        if refl.intensity < REFINABLE_SNR * refl.sigma || !refl.scalable {
            refl.refinable = false;
            continue;
        }
        refl.refinable = match full.find(idx) {
            Some(f) => f.redundancy >= MIN_FULL_REDUNDANCY || have_reference,
            None => false,
        };
        if refl.refinable {
            n_acc += 1;
        }
    }
    n_acc
}

struct Guide {
    idx: Hkl,
    intensity: f64,
    weight: f64,
    full: f64,
}

/// Refine one crystal's orientation, cell strain, profile radius and
/// divergence against the current merged estimate. The merged list is read
/// only; all mutation is confined to this crystal. Returns the partiality
/// bookkeeping of the post-fit refresh.
pub fn refine_crystal(
    crystal: &mut Crystal,
    full: &ReflList,
    model: &dyn PartialityModel,
    opts: &RefineOptions,
) -> UpdateStats {
    crystal.status = CrystalStatus::Ok;

    if !model.supports_refinement() {
        return UpdateStats::default();
    }

    let guides: Vec<Guide> = crystal
        .reflections
        .iter()
        .filter(|(_, r)| r.refinable)
        .filter_map(|(&idx, r)| {
            full.find(idx).map(|f| Guide {
                idx,
                intensity: r.intensity / crystal.osf,
                weight: if r.sigma > 0.0 {
                    1.0 / (r.sigma * r.sigma)
                } else {
                    1.0
                },
                full: f.intensity,
            })
        })
        .collect();

    if guides.len() < opts.min_refinable {
        crystal.status = CrystalStatus::NoRefinement;
        return UpdateStats::default();
    }

    let n_scalable_before = crystal
        .reflections
        .iter()
        .filter(|(_, r)| r.scalable)
        .count();

    // A probe crystal carrying only the geometry; reflection prediction does
    // not look at the list itself.
    let base = Crystal {
        reflections: ReflList::new(),
        ..crystal.clone()
    };

    // Parameters: small rotation (3), isotropic strain, log profile-radius
    // scale, divergence offset.
    let residuals = |p: &SVector<f64, 6>| -> Vec<f64> {
        let probe = apply_params(&base, p);
        guides
            .iter()
            .map(|g| {
                let est = model.evaluate(&probe, g.idx);
                g.weight.sqrt() * (g.intensity - est.partiality * g.full)
            })
            .collect()
    };

    // A residual already at rounding level has nothing left to refine.
    let signal: f64 = guides
        .iter()
        .map(|g| g.weight * g.intensity * g.intensity)
        .sum();
    let start = SVector::<f64, 6>::zeros();
    let chi2_start: f64 = residuals(&start).iter().map(|r| r * r).sum();
    if chi2_start <= 1e-12 * signal {
        return model.update_partialities(crystal);
    }

    let config = LmConfig {
        max_iterations: opts.max_iterations,
        ..LmConfig::default()
    };
    let result = optimize(start, residuals, &config);

    if !result.improved && !result.converged {
        crystal.status = CrystalStatus::SolverFailed;
        return UpdateStats::default();
    }

    let refined = apply_params(&base, &result.params);
    crystal.cell = refined.cell;
    crystal.profile_radius = refined.profile_radius;
    crystal.beam.divergence = refined.beam.divergence;

    let stats = model.update_partialities(crystal);
    debug!(
        iterations = result.iterations,
        chi2 = result.chi2,
        gained = stats.n_gained,
        lost = stats.n_lost,
        "crystal refined"
    );

    if n_scalable_before > 0
        && (stats.n_lost as f64) > opts.lost_fraction * n_scalable_before as f64
    {
        crystal.status = CrystalStatus::Lost;
    }
    stats
}

fn apply_params(base: &Crystal, p: &SVector<f64, 6>) -> Crystal {
    let rotation = UnitQuaternion::from_scaled_axis(Vector3::new(p[0], p[1], p[2]));
    let mut out = base.clone();
    out.cell = base.cell.rotated(&rotation).strained(p[3]);
    out.profile_radius = base.profile_radius * p[4].exp();
    out.beam.divergence = (base.beam.divergence + p[5]).max(0.0);
    out
}

/// Refine every crystal in parallel against a read-only merged list.
///
/// With the unity model this is a no-op, matching the model's contract that
/// merging degenerates to Monte-Carlo averaging.
pub fn refine_all(
    crystals: &mut [Crystal],
    full: &ReflList,
    model: &dyn PartialityModel,
    opts: &RefineOptions,
) -> RefineStats {
    if !model.supports_refinement() {
        return RefineStats::default();
    }

    crystals
        .par_iter_mut()
        .map(|crystal| {
            let update = refine_crystal(crystal, full, model, opts);
            let mut stats = RefineStats {
                n_gained: update.n_gained,
                n_dropped: update.n_lost,
                ..RefineStats::default()
            };
            match crystal.status {
                CrystalStatus::Ok => stats.n_refined += 1,
                CrystalStatus::NoRefinement => stats.n_no_refinement += 1,
                CrystalStatus::SolverFailed => stats.n_solver_failed += 1,
                CrystalStatus::Lost => stats.n_lost += 1,
            }
            stats
        })
        .reduce(RefineStats::default, RefineStats::absorb)
}
