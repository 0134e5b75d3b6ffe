use std::fmt;

use serde::{Deserialize, Serialize};

/// A Miller index triple labelling one reciprocal-lattice point.
///
/// Ordering is lexicographic on (h, k, l), which fixes the iteration order of
/// every reflection list keyed by `Hkl`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hkl {
    pub h: i32,
    pub k: i32,
    pub l: i32,
}

impl Hkl {
    pub fn new(h: i32, k: i32, l: i32) -> Self {
        Self { h, k, l }
    }

    /// The Friedel mate (-h, -k, -l).
    pub fn negate(&self) -> Self {
        Self {
            h: -self.h,
            k: -self.k,
            l: -self.l,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.h == 0 && self.k == 0 && self.l == 0
    }
}

impl fmt::Display for Hkl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.h, self.k, self.l)
    }
}

impl From<(i32, i32, i32)> for Hkl {
    fn from((h, k, l): (i32, i32, i32)) -> Self {
        Self { h, k, l }
    }
}
