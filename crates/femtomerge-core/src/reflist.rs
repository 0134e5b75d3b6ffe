use std::collections::btree_map::{self, BTreeMap};

use serde::{Deserialize, Serialize};

use crate::hkl::Hkl;

/// One stored reflection. Created by the loader or by scaling, mutated by
/// scaling, post-refinement and flag selection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Reflection {
    /// Measured (or merged) intensity.
    pub intensity: f64,
    /// Standard deviation of the intensity.
    pub sigma: f64,
    /// Fraction of the full intensity recorded this shot, in [0, 1].
    pub partiality: f64,
    /// Number of contributing observations.
    pub redundancy: u32,
    pub scalable: bool,
    pub refinable: bool,
    /// Observed detector position (fast-scan, slow-scan), if known.
    pub fs: f64,
    pub ss: f64,
    pub lorentz: f64,
}

impl Default for Reflection {
    fn default() -> Self {
        Self {
            intensity: 0.0,
            sigma: 0.0,
            partiality: 1.0,
            redundancy: 0,
            scalable: false,
            refinable: false,
            fs: 0.0,
            ss: 0.0,
            lorentz: 1.0,
        }
    }
}

/// An ordered reflection container keyed by Miller index.
///
/// Backed by a `BTreeMap`, so lookups are O(log n), keys are unique and
/// iteration always runs in (h, k, l) order. `add` creates an entry if the
/// key is absent and returns the existing one otherwise; observations that
/// should accumulate are combined by the folding stage, never by the map.
/// `find` is exact: callers fold to the asymmetric unit first if that is
/// what they mean.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReflList {
    entries: BTreeMap<Hkl, Reflection>,
}

impl ReflList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert-or-get: a mutable handle to the reflection at `idx`.
    pub fn add(&mut self, idx: Hkl) -> &mut Reflection {
        self.entries.entry(idx).or_default()
    }

    pub fn find(&self, idx: Hkl) -> Option<&Reflection> {
        self.entries.get(&idx)
    }

    pub fn find_mut(&mut self, idx: Hkl) -> Option<&mut Reflection> {
        self.entries.get_mut(&idx)
    }

    pub fn contains(&self, idx: Hkl) -> bool {
        self.entries.contains_key(&idx)
    }

    pub fn remove(&mut self, idx: Hkl) -> Option<Reflection> {
        self.entries.remove(&idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Hkl, Reflection> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, Hkl, Reflection> {
        self.entries.iter_mut()
    }

    /// Drop every entry for which the predicate returns false.
    pub fn retain(&mut self, f: impl FnMut(&Hkl, &mut Reflection) -> bool) {
        self.entries.retain(f);
    }
}

impl<'a> IntoIterator for &'a ReflList {
    type Item = (&'a Hkl, &'a Reflection);
    type IntoIter = btree_map::Iter<'a, Hkl, Reflection>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<(Hkl, Reflection)> for ReflList {
    fn from_iter<T: IntoIterator<Item = (Hkl, Reflection)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
