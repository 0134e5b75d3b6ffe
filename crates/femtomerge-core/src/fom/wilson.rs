use tracing::info;

use crate::cell::UnitCell;
use crate::error::{MergeError, Result};
use crate::reflist::ReflList;
use crate::stats::fit_linear;

/// Outcome of a Wilson fit: list 2 was multiplied by G * exp(2 B d*^2).
#[derive(Clone, Copy, Debug)]
pub struct WilsonScale {
    pub g: f64,
    /// Relative B factor in m^2.
    pub b: f64,
    pub n_pairs: usize,
}

/// Put two reflection lists on a common scale before comparison: fit
/// log(I1/I2) = log G + 2 B d*^2 over common reflections with positive
/// intensities, then apply the correction to every entry of list 2 (sigma
/// included).
///
/// Fewer than two usable pairs, or a degenerate fit, is a `ScalingFailed`
/// error and list 2 is left untouched.
pub fn wilson_scale(list1: &ReflList, list2: &mut ReflList, cell: &UnitCell) -> Result<WilsonScale> {
    let mut x = Vec::new();
    let mut y = Vec::new();

    for (&idx, refl1) in list1 {
        let refl2 = match list2.find(idx) {
            Some(r) => r,
            None => continue,
        };
        let i1 = refl1.intensity;
        let i2 = refl2.intensity;
        if i1 <= 0.0 || i2 <= 0.0 || !i1.is_finite() || !i2.is_finite() {
            continue;
        }
        let res = cell.resolution(idx);
        x.push(res * res);
        y.push((i1 / i2).ln());
    }

    if x.len() < 2 {
        return Err(MergeError::ScalingFailed(format!(
            "{} usable reflection pairs for Wilson scaling",
            x.len()
        )));
    }

    let (c0, c1) = fit_linear(&x, &y).ok_or_else(|| {
        MergeError::ScalingFailed("Wilson fit is degenerate".to_string())
    })?;

    let g = c0.exp();
    let b = c1 / 2.0;
    info!(
        scale = g,
        b_factor_a2 = b * 1e20,
        n_pairs = x.len(),
        "Wilson scaling applied to second list"
    );

    for (&idx, refl2) in list2.iter_mut() {
        let res = cell.resolution(idx);
        let corr = g * (2.0 * b * res * res).exp();
        refl2.intensity *= corr;
        refl2.sigma *= corr;
    }

    Ok(WilsonScale {
        g,
        b,
        n_pairs: x.len(),
    })
}
