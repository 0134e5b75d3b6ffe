use nalgebra::{Matrix3, UnitQuaternion, Vector3};

use crate::error::{MergeError, Result};
use crate::hkl::Hkl;

/// Fraction of |a||b||c| below which the cell volume counts as degenerate.
const DEGENERACY_TOLERANCE: f64 = 1e-6;

/// A unit cell, stored as real-space axis vectors in the lab frame.
///
/// For an indexed crystal the orientation lives in the axes themselves, so
/// rotating the cell rotates the crystal. Lengths are in metres; the
/// reciprocal axes carry m^-1 without a 2*pi factor. Immutable after
/// construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitCell {
    axes: Matrix3<f64>,
}

impl UnitCell {
    /// Build a cell from the six scalar parameters, lengths in metres and
    /// angles in degrees, in the conventional orientation (a along x, b in
    /// the xy plane).
    pub fn from_parameters(
        a: f64,
        b: f64,
        c: f64,
        alpha: f64,
        beta: f64,
        gamma: f64,
    ) -> Result<Self> {
        if a <= 0.0 || b <= 0.0 || c <= 0.0 {
            return Err(MergeError::DegenerateCell(format!(
                "non-positive axis length ({a}, {b}, {c})"
            )));
        }
        let (alpha, beta, gamma) = (alpha.to_radians(), beta.to_radians(), gamma.to_radians());

        let ax = Vector3::new(a, 0.0, 0.0);
        let bx = Vector3::new(b * gamma.cos(), b * gamma.sin(), 0.0);
        let cx = c * beta.cos();
        let cy = c * (alpha.cos() - beta.cos() * gamma.cos()) / gamma.sin();
        let cz2 = c * c - cx * cx - cy * cy;
        if cz2 <= 0.0 {
            return Err(MergeError::DegenerateCell(format!(
                "inconsistent cell angles ({:.2}, {:.2}, {:.2}) deg",
                alpha.to_degrees(),
                beta.to_degrees(),
                gamma.to_degrees()
            )));
        }
        let cv = Vector3::new(cx, cy, cz2.sqrt());

        Self::from_axes(ax, bx, cv)
    }

    /// Build a cell from three explicit axis vectors (metres, lab frame).
    pub fn from_axes(a: Vector3<f64>, b: Vector3<f64>, c: Vector3<f64>) -> Result<Self> {
        let axes = Matrix3::from_columns(&[a, b, c]);
        let det = axes.determinant();
        let scale = a.norm() * b.norm() * c.norm();
        if !(det > 0.0) || det < DEGENERACY_TOLERANCE * scale {
            return Err(MergeError::DegenerateCell(format!(
                "axis vectors are degenerate or left-handed (determinant {det:e})"
            )));
        }
        Ok(Self { axes })
    }

    pub fn a(&self) -> Vector3<f64> {
        self.axes.column(0).into()
    }

    pub fn b(&self) -> Vector3<f64> {
        self.axes.column(1).into()
    }

    pub fn c(&self) -> Vector3<f64> {
        self.axes.column(2).into()
    }

    /// Cell volume in m^3.
    pub fn volume(&self) -> f64 {
        self.axes.determinant()
    }

    /// The six scalar parameters (a, b, c in metres; alpha, beta, gamma in
    /// degrees).
    pub fn parameters(&self) -> (f64, f64, f64, f64, f64, f64) {
        let (a, b, c) = (self.a(), self.b(), self.c());
        let alpha = b.angle(&c).to_degrees();
        let beta = a.angle(&c).to_degrees();
        let gamma = a.angle(&b).to_degrees();
        (a.norm(), b.norm(), c.norm(), alpha, beta, gamma)
    }

    /// Reciprocal axes a*, b*, c* as matrix columns, in m^-1.
    pub fn reciprocal(&self) -> Matrix3<f64> {
        // Columns satisfy a_i* . a_j = delta_ij; the determinant was checked
        // at construction so the inverse exists.
        self.axes
            .try_inverse()
            .map(|inv| inv.transpose())
            .unwrap_or_else(Matrix3::zeros)
    }

    /// Position of a reciprocal-lattice point in the lab frame, m^-1.
    pub fn scattering_vector(&self, idx: Hkl) -> Vector3<f64> {
        let r = self.reciprocal();
        let (astar, bstar, cstar): (Vector3<f64>, Vector3<f64>, Vector3<f64>) =
            (r.column(0).into(), r.column(1).into(), r.column(2).into());
        astar * idx.h as f64 + bstar * idx.k as f64 + cstar * idx.l as f64
    }

    /// Resolution d* = |h a* + k b* + l c*| in m^-1.
    pub fn resolution(&self, idx: Hkl) -> f64 {
        self.scattering_vector(idx).norm()
    }

    /// A new cell with all axes rotated by a unit quaternion.
    pub fn rotated(&self, q: &UnitQuaternion<f64>) -> Self {
        let r = q.to_rotation_matrix().into_inner();
        Self {
            axes: r * self.axes,
        }
    }

    /// A new cell with all axes scaled by (1 + strain).
    pub fn strained(&self, strain: f64) -> Self {
        Self {
            axes: self.axes * (1.0 + strain),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cubic_resolution() {
        let cell = UnitCell::from_parameters(1e-9, 1e-9, 1e-9, 90.0, 90.0, 90.0).unwrap();
        // d* of (1,0,0) in a 1 nm cubic cell is 1 nm^-1.
        let d = cell.resolution(Hkl::new(1, 0, 0));
        assert!((d - 1e9).abs() < 1.0);
    }

    #[test]
    fn left_handed_axes_rejected() {
        let r = UnitCell::from_axes(
            Vector3::new(0.0, 1e-9, 0.0),
            Vector3::new(1e-9, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 1e-9),
        );
        assert!(matches!(r, Err(MergeError::DegenerateCell(_))));
    }
}
