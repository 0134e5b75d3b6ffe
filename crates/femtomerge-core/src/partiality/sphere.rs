use nalgebra::Vector3;

use crate::consts::MIN_EWALD_WIDTH;
use crate::crystal::Crystal;
use crate::hkl::Hkl;

use super::{refresh_with, PartialityEstimate, PartialityModel, UpdateStats};

/// Spherical partiality model.
///
/// Each reciprocal-lattice point is a uniform ball of radius R (the
/// crystal's profile radius). The Ewald construction for a beam with finite
/// bandwidth and divergence is a spherical shell [k - dk, k + dk] with
/// k = 1/lambda; the partiality is the volume fraction of the ball lying
/// inside the shell, evaluated in closed form from the spherical-cap
/// volume.
pub struct SphereModel;

/// Volume fraction of a unit-radius ball below a plane at signed distance
/// `d` (in units of the radius) from its centre.
fn cap_fraction(d: f64, radius: f64) -> f64 {
    let x = ((d + radius) / (2.0 * radius)).clamp(0.0, 1.0);
    x * x * (3.0 - 2.0 * x)
}

impl SphereModel {
    /// Half-width of the Ewald shell for this reflection, in m^-1.
    fn shell_half_width(crystal: &Crystal, dstar: f64) -> f64 {
        let k = crystal.beam.k();
        k * crystal.beam.bandwidth / 2.0
            + k * crystal.beam.divergence / 2.0
            + crystal.mosaicity * dstar / 2.0
    }
}

impl PartialityModel for SphereModel {
    fn evaluate(&self, crystal: &Crystal, idx: Hkl) -> PartialityEstimate {
        let q = crystal.cell.scattering_vector(idx);
        let k = crystal.beam.k();

        // Distance from the Ewald sphere centre at (0, 0, -k); the beam runs
        // along +z.
        let dist = (q + Vector3::new(0.0, 0.0, k)).norm();
        let excitation = dist - k;

        let dk = Self::shell_half_width(crystal, q.norm());
        let r = crystal.profile_radius;

        let partiality = if r > 0.0 {
            cap_fraction(dk - excitation, r) - cap_fraction(-dk - excitation, r)
        } else {
            0.0
        };

        let lorentz = 1.0 / (2.0 * dk).max(MIN_EWALD_WIDTH);

        PartialityEstimate {
            partiality,
            lorentz,
            excitation_error: excitation,
        }
    }

    fn update_partialities(&self, crystal: &mut Crystal) -> UpdateStats {
        refresh_with(self, crystal)
    }
}
