use serde::{Deserialize, Serialize};

use crate::cell::UnitCell;
use crate::crystal::Crystal;
use crate::reflist::{ReflList, Reflection};
use crate::symmetry::SymOpList;

/// Beam polarisation state used for the intensity correction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Polarisation {
    Off,
    Unpolarised,
    /// Linear polarisation in the horizontal (x) plane; `fraction` is the
    /// horizontally-polarised fraction, 1.0 for an undulator beam.
    Horizontal { fraction: f64 },
}

impl Default for Polarisation {
    fn default() -> Self {
        Polarisation::Horizontal { fraction: 1.0 }
    }
}

/// Divide every intensity (and sigma) by the polarisation factor implied by
/// the beam geometry. Applied exactly once, before the first scaling pass.
pub fn polarisation_correction(crystal: &mut Crystal, mode: Polarisation) {
    let fraction = match mode {
        Polarisation::Off => return,
        Polarisation::Unpolarised => 0.5,
        Polarisation::Horizontal { fraction } => fraction,
    };

    let lambda = crystal.beam.wavelength;
    let cell = crystal.cell;
    for (&idx, refl) in crystal.reflections.iter_mut() {
        let q = cell.scattering_vector(idx);
        let dstar = q.norm();
        if dstar == 0.0 {
            continue;
        }
        let sin_theta = (dstar * lambda / 2.0).min(1.0);
        let cos_theta = (1.0 - sin_theta * sin_theta).sqrt();
        let sin_two_theta = 2.0 * sin_theta * cos_theta;
        let s2 = sin_two_theta * sin_two_theta;

        // Azimuth of the reflection about the beam axis.
        let (cos2_phi, sin2_phi) = if q.x == 0.0 && q.y == 0.0 {
            (1.0, 0.0)
        } else {
            let r2 = q.x * q.x + q.y * q.y;
            (q.x * q.x / r2, q.y * q.y / r2)
        };

        let pol = fraction * (1.0 - s2 * cos2_phi) + (1.0 - fraction) * (1.0 - s2 * sin2_phi);
        if pol > 0.0 {
            refl.intensity /= pol;
            refl.sigma /= pol;
        }
    }
}

/// Fold a reflection list to the asymmetric unit of a point group.
///
/// Equivalent observations collapse to one entry at the canonical index with
/// their redundancy-weighted mean intensity and propagated sigma. Folding an
/// already-asymmetric list leaves it unchanged.
pub fn fold_to_asymmetric(list: &ReflList, sym: &SymOpList) -> ReflList {
    let mut out = ReflList::new();
    for (&idx, refl) in list {
        let asym = sym.asymmetric(idx);
        let count = refl.redundancy.max(1);
        let w = count as f64;

        let entry = out.add(asym);
        if entry.redundancy == 0 {
            *entry = Reflection {
                redundancy: count,
                ..refl.clone()
            };
        } else {
            let w0 = entry.redundancy as f64;
            let total = w0 + w;
            entry.intensity = (entry.intensity * w0 + refl.intensity * w) / total;
            entry.sigma = ((entry.sigma * w0).powi(2) + (refl.sigma * w).powi(2)).sqrt() / total;
            entry.redundancy += count;
        }
    }
    out
}

/// Fold a crystal's reflection list in place.
pub fn fold_crystal_to_asymmetric(crystal: &mut Crystal, sym: &SymOpList) {
    crystal.reflections = fold_to_asymmetric(&crystal.reflections, sym);
}

/// Resolution limits (d* min, d* max) spanned by a list, in m^-1.
pub fn resolution_limits(list: &ReflList, cell: &UnitCell) -> Option<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for (&idx, _) in list {
        let d = cell.resolution(idx);
        lo = lo.min(d);
        hi = hi.max(d);
    }
    (hi >= lo).then_some((lo, hi))
}
