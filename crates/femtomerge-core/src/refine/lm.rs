//! Damped least-squares (Levenberg-Marquardt) over a fixed-size parameter
//! vector, with a numeric Jacobian. The normal equations are built as
//! J^T J + lambda * diag(J^T J) and solved per step; steps are accepted only
//! when they decrease the summed squared residual.

use nalgebra::{Const, DimMin, SMatrix, SVector};

#[derive(Clone, Copy, Debug)]
pub struct LmConfig {
    pub max_iterations: usize,
    pub initial_lambda: f64,
    pub lambda_up: f64,
    pub lambda_down: f64,
    /// Accepted-step norm below which the fit counts as converged.
    pub step_tolerance: f64,
    /// Relative finite-difference step for the Jacobian.
    pub fd_step: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            step_tolerance: 1e-7,
            fd_step: 1e-5,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct LmResult<const N: usize> {
    pub params: SVector<f64, N>,
    pub chi2: f64,
    pub converged: bool,
    pub iterations: usize,
    /// Whether the final residual is lower than the starting one.
    pub improved: bool,
}

fn chi2(residuals: &[f64]) -> f64 {
    residuals.iter().map(|r| r * r).sum()
}

/// Minimise the squared norm of `residuals(params)` starting from
/// `initial`. The residual closure must return the same-length vector for
/// every parameter value.
pub fn optimize<const N: usize>(
    initial: SVector<f64, N>,
    residuals: impl Fn(&SVector<f64, N>) -> Vec<f64>,
    config: &LmConfig,
) -> LmResult<N>
where
    Const<N>: DimMin<Const<N>, Output = Const<N>>,
{
    let mut params = initial;
    let mut current = residuals(&params);
    let initial_chi2 = chi2(&current);
    let mut best_chi2 = initial_chi2;

    // Already a perfect fit.
    if initial_chi2 == 0.0 {
        return LmResult {
            params,
            chi2: 0.0,
            converged: true,
            iterations: 0,
            improved: false,
        };
    }

    let mut lambda = config.initial_lambda;
    let mut converged = false;
    let mut iterations = 0;

    for iter in 0..config.max_iterations {
        iterations = iter + 1;

        // Numeric Jacobian, one forward difference per parameter.
        let m = current.len();
        let mut jt_j = SMatrix::<f64, N, N>::zeros();
        let mut jt_r = SVector::<f64, N>::zeros();
        let mut jacobian = vec![[0.0; N]; m];
        for p in 0..N {
            let h = config.fd_step * (1.0 + params[p].abs());
            let mut shifted = params;
            shifted[p] += h;
            let probe = residuals(&shifted);
            for (row, (r1, r0)) in probe.iter().zip(current.iter()).enumerate() {
                jacobian[row][p] = (r1 - r0) / h;
            }
        }
        for (row, r) in jacobian.iter().zip(current.iter()) {
            for i in 0..N {
                jt_r[i] += row[i] * r;
                for j in 0..N {
                    jt_j[(i, j)] += row[i] * row[j];
                }
            }
        }

        let mut damped = jt_j;
        for i in 0..N {
            damped[(i, i)] *= 1.0 + lambda;
            if damped[(i, i)] == 0.0 {
                damped[(i, i)] = lambda;
            }
        }

        let delta = match damped.lu().solve(&(-jt_r)) {
            Some(d) => d,
            None => break,
        };

        let trial = params + delta;
        let trial_res = residuals(&trial);
        let trial_chi2 = chi2(&trial_res);

        if trial_chi2 < best_chi2 {
            params = trial;
            current = trial_res;
            let rel_drop = (best_chi2 - trial_chi2) / best_chi2.max(1e-30);
            best_chi2 = trial_chi2;
            lambda *= config.lambda_down;

            if delta.norm() < config.step_tolerance || rel_drop < 1e-9 {
                converged = true;
                break;
            }
        } else {
            // No improvement possible beyond noise: the fit has stalled at
            // its minimum.
            if (trial_chi2 - best_chi2) / best_chi2 < 1e-9 {
                converged = true;
                break;
            }
            lambda *= config.lambda_up;
            if lambda > 1e10 {
                break;
            }
        }
    }

    LmResult {
        params,
        chi2: best_chi2,
        converged,
        iterations,
        improved: best_chi2 < initial_chi2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::SVector;

    #[test]
    fn fits_a_parabola_vertex() {
        // Residuals of y = (x - a)^2 sampled at x in 0..5 against a = 2.
        let data: Vec<(f64, f64)> = (0..6).map(|x| (x as f64, (x as f64 - 2.0).powi(2))).collect();
        let result = optimize(
            SVector::<f64, 1>::new(0.5),
            |p| data.iter().map(|(x, y)| (x - p[0]).powi(2) - y).collect(),
            &LmConfig::default(),
        );
        assert!(result.improved);
        assert!((result.params[0] - 2.0).abs() < 1e-4);
    }
}
