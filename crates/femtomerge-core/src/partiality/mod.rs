mod sphere;

pub use sphere::SphereModel;

use serde::{Deserialize, Serialize};

use crate::crystal::Crystal;
use crate::hkl::Hkl;

/// Partiality model selector, as it appears in configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    /// p = 1 everywhere: merging reduces to Monte-Carlo averaging and
    /// post-refinement is skipped.
    Unity,
    #[default]
    Sphere,
}

impl ModelKind {
    pub fn instantiate(&self) -> Box<dyn PartialityModel> {
        match self {
            ModelKind::Unity => Box::new(UnityModel),
            ModelKind::Sphere => Box::new(SphereModel),
        }
    }
}

/// Prediction for a single reflection under the current crystal parameters.
#[derive(Clone, Copy, Debug)]
pub struct PartialityEstimate {
    /// Captured fraction of the full intensity, in [0, 1].
    pub partiality: f64,
    /// Lorentz factor, always positive.
    pub lorentz: f64,
    /// Signed distance of the reciprocal-lattice point from the nominal
    /// Ewald sphere, in m^-1.
    pub excitation_error: f64,
}

/// Bookkeeping from one partiality refresh over a crystal's list.
#[derive(Clone, Copy, Debug, Default)]
pub struct UpdateStats {
    /// Reflections now predicted that were not before.
    pub n_gained: usize,
    /// Reflections no longer predicted.
    pub n_lost: usize,
    /// Mean |delta p| over reflections predicted in both states.
    pub mean_p_change: f64,
}

/// A partiality model: a pure prediction per reflection, plus a refresh of a
/// whole crystal's list after its geometric parameters changed.
pub trait PartialityModel: Send + Sync {
    fn evaluate(&self, crystal: &Crystal, idx: Hkl) -> PartialityEstimate;

    /// Refresh every reflection of the crystal. Reflections that drop out of
    /// the predicted set have their redundancy zeroed so that scalable
    /// selection skips them; ones that come back are restored with
    /// redundancy 1.
    fn update_partialities(&self, crystal: &mut Crystal) -> UpdateStats;

    /// Whether post-refinement against this model is meaningful.
    fn supports_refinement(&self) -> bool {
        true
    }
}

/// The p = 1 model.
pub struct UnityModel;

impl PartialityModel for UnityModel {
    fn evaluate(&self, _crystal: &Crystal, _idx: Hkl) -> PartialityEstimate {
        PartialityEstimate {
            partiality: 1.0,
            lorentz: 1.0,
            excitation_error: 0.0,
        }
    }

    fn update_partialities(&self, _crystal: &mut Crystal) -> UpdateStats {
        UpdateStats::default()
    }

    fn supports_refinement(&self) -> bool {
        false
    }
}

/// Shared refresh used by geometric models: evaluate each reflection and
/// tally gained/lost/changed.
pub(crate) fn refresh_with(model: &dyn PartialityModel, crystal: &mut Crystal) -> UpdateStats {
    let snapshot: Vec<(Hkl, f64, u32)> = crystal
        .reflections
        .iter()
        .map(|(&idx, r)| (idx, r.partiality, r.redundancy))
        .collect();

    let mut stats = UpdateStats::default();
    let mut change_sum = 0.0;
    let mut change_n = 0usize;

    for (idx, old_p, old_red) in snapshot {
        let est = model.evaluate(crystal, idx);
        let was_predicted = old_p > 0.0 && old_red > 0;
        let now_predicted = est.partiality > 0.0;

        let refl = match crystal.reflections.find_mut(idx) {
            Some(r) => r,
            None => continue,
        };
        refl.partiality = est.partiality;
        refl.lorentz = est.lorentz;

        match (was_predicted, now_predicted) {
            (false, true) => {
                stats.n_gained += 1;
                if refl.redundancy == 0 {
                    refl.redundancy = 1;
                }
            }
            (true, false) => {
                stats.n_lost += 1;
                refl.redundancy = 0;
            }
            (true, true) => {
                change_sum += (est.partiality - old_p).abs();
                change_n += 1;
            }
            (false, false) => {}
        }
    }

    if change_n > 0 {
        stats.mean_p_change = change_sum / change_n as f64;
    }
    stats
}
