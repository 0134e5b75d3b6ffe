use crate::error::{MergeError, Result};

/// An ordered partition of a resolution range into shells of equal
/// reciprocal volume: each shell spans the same amount of d*^3.
#[derive(Clone, Debug)]
pub struct ResolutionShells {
    rmins: Vec<f64>,
    rmaxs: Vec<f64>,
}

impl ResolutionShells {
    /// Partition [dstar_min, dstar_max] (m^-1) into `n` equal-volume shells.
    pub fn equal_volume(dstar_min: f64, dstar_max: f64, n: usize) -> Result<Self> {
        if n == 0 || !(dstar_max > dstar_min) || dstar_min < 0.0 {
            return Err(MergeError::Input(format!(
                "invalid resolution shells: [{dstar_min}, {dstar_max}] x {n}"
            )));
        }

        let total_vol = dstar_max.powi(3) - dstar_min.powi(3);
        let vol_per_shell = total_vol / n as f64;

        let mut rmins = Vec::with_capacity(n);
        let mut rmaxs = Vec::with_capacity(n);
        rmins.push(dstar_min);
        for i in 1..n {
            let r = (vol_per_shell + rmins[i - 1].powi(3)).cbrt();
            rmaxs.push(r);
            rmins.push(r);
        }
        rmaxs.push(dstar_max);

        Ok(Self { rmins, rmaxs })
    }

    pub fn count(&self) -> usize {
        self.rmins.len()
    }

    pub fn min_of(&self, i: usize) -> f64 {
        self.rmins[i]
    }

    pub fn max_of(&self, i: usize) -> f64 {
        self.rmaxs[i]
    }

    /// Nominal d* of a shell (the midpoint).
    pub fn label(&self, i: usize) -> f64 {
        self.rmins[i] + (self.rmaxs[i] - self.rmins[i]) / 2.0
    }

    /// Shell index of a d* value. Shells are half-open (lo, hi], so a value
    /// on a boundary lands in the lower-index shell; the first shell is
    /// closed at its lower edge. Out-of-range values return None.
    pub fn bin_of(&self, dstar: f64) -> Option<usize> {
        if dstar == self.rmins[0] {
            return Some(0);
        }
        for i in 0..self.count() {
            if dstar > self.rmins[i] && dstar <= self.rmaxs[i] {
                return Some(i);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_bin_low() {
        let s = ResolutionShells::equal_volume(0.0, 2.0, 2).unwrap();
        let edge = s.max_of(0);
        assert_eq!(s.bin_of(edge), Some(0));
        assert_eq!(s.bin_of(0.0), Some(0));
        assert_eq!(s.bin_of(2.0), Some(1));
        assert_eq!(s.bin_of(2.1), None);
    }

    #[test]
    fn equal_volume_spacing() {
        // Ten shells over [0.1, 1.0] nm^-1; the first boundary sits at the
        // cube root of dmin^3 + (dmax^3 - dmin^3)/10.
        let s = ResolutionShells::equal_volume(0.1e9, 1.0e9, 10).unwrap();
        let expected = (0.1f64.powi(3) + (1.0f64.powi(3) - 0.1f64.powi(3)) / 10.0).cbrt() * 1e9;
        assert!((s.max_of(0) - expected).abs() < 1.0);
    }
}
