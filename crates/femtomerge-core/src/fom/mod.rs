mod select;
mod shells;
mod wilson;

pub use select::{select_pairs, FomSelection, SelectionCounts};
pub use shells::ResolutionShells;
pub use wilson::{wilson_scale, WilsonScale};

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cell::UnitCell;
use crate::error::{MergeError, Result};
use crate::hkl::Hkl;
use crate::reflist::ReflList;
use crate::stats::{pearson, variance_about};
use crate::symmetry::SymOpList;

/// Crystallographic quality metrics over a pair of reflection lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FomKind {
    R1I,
    R1F,
    R2,
    Rsplit,
    CC,
    CCstar,
    CCano,
    CRDano,
    Rano,
    RanoOverRsplit,
    D1Sig,
    D2Sig,
}

impl FomKind {
    /// Whether this metric compares Bijvoet pairs and therefore needs a
    /// point group and centric exclusion.
    pub fn is_anomalous(&self) -> bool {
        matches!(
            self,
            FomKind::CCano | FomKind::CRDano | FomKind::Rano | FomKind::RanoOverRsplit
        )
    }
}

impl FromStr for FomKind {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "r1i" => Ok(FomKind::R1I),
            "r1f" => Ok(FomKind::R1F),
            "r2" => Ok(FomKind::R2),
            "rsplit" => Ok(FomKind::Rsplit),
            "cc" => Ok(FomKind::CC),
            "ccstar" | "cc*" => Ok(FomKind::CCstar),
            "ccano" => Ok(FomKind::CCano),
            "crdano" => Ok(FomKind::CRDano),
            "rano" => Ok(FomKind::Rano),
            "rano/rsplit" => Ok(FomKind::RanoOverRsplit),
            "d1sig" => Ok(FomKind::D1Sig),
            "d2sig" => Ok(FomKind::D2Sig),
            other => Err(MergeError::UnknownFigureOfMerit(other.to_string())),
        }
    }
}

/// Per-shell accumulators for one figure-of-merit computation. Ratio-style
/// metrics accumulate numerator/denominator sums; correlation-style metrics
/// pool the paired values; the sigma-criterion metrics count hits.
#[derive(Clone, Debug)]
pub struct FomContext {
    kind: FomKind,
    counts: Vec<usize>,
    num: Vec<f64>,
    den: Vec<f64>,
    num2: Vec<f64>,
    den2: Vec<f64>,
    vec1: Vec<Vec<f64>>,
    vec2: Vec<Vec<f64>>,
    n_within: Vec<usize>,
}

impl FomContext {
    fn new(kind: FomKind, nshells: usize) -> Self {
        Self {
            kind,
            counts: vec![0; nshells],
            num: vec![0.0; nshells],
            den: vec![0.0; nshells],
            num2: vec![0.0; nshells],
            den2: vec![0.0; nshells],
            vec1: vec![Vec::new(); nshells],
            vec2: vec![Vec::new(); nshells],
            n_within: vec![0; nshells],
        }
    }

    pub fn kind(&self) -> FomKind {
        self.kind
    }

    pub fn count_in_shell(&self, i: usize) -> usize {
        self.counts[i]
    }

    pub fn total_pairs(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Shell numerator/denominator pair for the ratio-style metrics; used by
    /// tests to confirm that shell sums match the overall accumulation.
    pub fn shell_sums(&self, i: usize) -> (f64, f64) {
        (self.num[i], self.den[i])
    }

    #[allow(clippy::too_many_arguments)]
    fn add(
        &mut self,
        bin: usize,
        i1: f64,
        i2: f64,
        i1bij: f64,
        i2bij: f64,
        sig1: f64,
        sig2: f64,
    ) {
        self.counts[bin] += 1;

        match self.kind {
            FomKind::R1I => {
                self.num[bin] += (i1 - i2).abs();
                self.den[bin] += i1;
            }
            FomKind::R1F => {
                // Negative intensities were weeded out during selection.
                let f1 = i1.sqrt();
                let f2 = i2.sqrt();
                self.num[bin] += (f1 - f2).abs();
                self.den[bin] += f1;
            }
            FomKind::R2 => {
                self.num[bin] += (i1 - i2).powi(2);
                self.den[bin] += i1 * i1;
            }
            FomKind::Rsplit => {
                self.num[bin] += (i1 - i2).abs();
                self.den[bin] += i1 + i2;
            }
            FomKind::CC | FomKind::CCstar => {
                self.vec1[bin].push(i1);
                self.vec2[bin].push(i2);
            }
            FomKind::CCano | FomKind::CRDano => {
                self.vec1[bin].push(i1 - i1bij);
                self.vec2[bin].push(i2 - i2bij);
            }
            FomKind::Rano | FomKind::RanoOverRsplit => {
                if self.kind == FomKind::RanoOverRsplit {
                    self.num2[bin] += (i1 - i2).abs();
                    self.den2[bin] += i1 + i2;
                }
                let im = (i1 + i2) / 2.0;
                let imbij = (i1bij + i2bij) / 2.0;
                self.num[bin] += (im - imbij).abs();
                self.den[bin] += im + imbij;
            }
            FomKind::D1Sig => {
                if (i1 - i2).abs() < (sig1 * sig1 + sig2 * sig2).sqrt() {
                    self.n_within[bin] += 1;
                }
            }
            FomKind::D2Sig => {
                if (i1 - i2).abs() < 2.0 * (sig1 * sig1 + sig2 * sig2).sqrt() {
                    self.n_within[bin] += 1;
                }
            }
        }
    }

    /// The metric evaluated over a single shell.
    pub fn shell_value(&self, i: usize) -> f64 {
        match self.kind {
            FomKind::R1I | FomKind::R1F => self.num[i] / self.den[i],
            FomKind::R2 => (self.num[i] / self.den[i]).sqrt(),
            FomKind::Rsplit => 2.0 * (self.num[i] / self.den[i]) / 2.0f64.sqrt(),
            FomKind::CC | FomKind::CCano => pearson(&self.vec1[i], &self.vec2[i]),
            FomKind::CCstar => {
                let cc = pearson(&self.vec1[i], &self.vec2[i]);
                ((2.0 * cc) / (1.0 + cc)).sqrt()
            }
            FomKind::Rano => 2.0 * self.num[i] / self.den[i],
            FomKind::RanoOverRsplit => {
                (2.0 * self.num[i] / self.den[i])
                    / (2.0 * (self.num2[i] / self.den2[i]) / 2.0f64.sqrt())
            }
            FomKind::CRDano => crdano(&self.vec1[i], &self.vec2[i]),
            FomKind::D1Sig | FomKind::D2Sig => self.n_within[i] as f64 / self.counts[i] as f64,
        }
    }

    /// The metric over the whole range: numerators, denominators or pooled
    /// vectors are accumulated across shells first, then the final ratio or
    /// root is taken once.
    pub fn overall(&self) -> f64 {
        match self.kind {
            FomKind::R1I | FomKind::R1F | FomKind::R2 | FomKind::Rsplit | FomKind::Rano => {
                let num: f64 = self.num.iter().sum();
                let den: f64 = self.den.iter().sum();
                match self.kind {
                    FomKind::R2 => (num / den).sqrt(),
                    FomKind::Rsplit => 2.0 * (num / den) / 2.0f64.sqrt(),
                    FomKind::Rano => 2.0 * (num / den),
                    _ => num / den,
                }
            }
            FomKind::RanoOverRsplit => {
                let num: f64 = self.num.iter().sum();
                let den: f64 = self.den.iter().sum();
                let num2: f64 = self.num2.iter().sum();
                let den2: f64 = self.den2.iter().sum();
                (2.0 * (num / den)) / (2.0 * (num2 / den2) / 2.0f64.sqrt())
            }
            FomKind::CC | FomKind::CCstar | FomKind::CCano | FomKind::CRDano => {
                let all1: Vec<f64> = self.vec1.iter().flatten().copied().collect();
                let all2: Vec<f64> = self.vec2.iter().flatten().copied().collect();
                match self.kind {
                    FomKind::CRDano => crdano(&all1, &all2),
                    FomKind::CCstar => {
                        let cc = pearson(&all1, &all2);
                        ((2.0 * cc) / (1.0 + cc)).sqrt()
                    }
                    _ => pearson(&all1, &all2),
                }
            }
            FomKind::D1Sig | FomKind::D2Sig => {
                let num: usize = self.n_within.iter().sum();
                let den: usize = self.counts.iter().sum();
                num as f64 / den as f64
            }
        }
    }
}

/// RMS anomalous-signal-to-noise: the variance of the Bijvoet differences
/// along the diagonal over the variance perpendicular to it, both about
/// zero.
fn crdano(v1: &[f64], v2: &[f64]) -> f64 {
    let along: Vec<f64> = v1
        .iter()
        .zip(v2.iter())
        .map(|(a, b)| (a + b) / 2.0f64.sqrt())
        .collect();
    let perpend: Vec<f64> = v1
        .iter()
        .zip(v2.iter())
        .map(|(a, b)| (a - b) / 2.0f64.sqrt())
        .collect();
    (variance_about(&along, 0.0) / variance_about(&perpend, 0.0)).sqrt()
}

/// Find an index equivalent to `idx` under the point group that is present
/// in the list (the asymmetric domain may put the Bijvoet partner anywhere
/// in the orbit).
fn find_equiv_in_list(list: &ReflList, idx: Hkl, sym: &SymOpList) -> Option<Hkl> {
    sym.orbit(idx).into_iter().find(|&e| list.contains(e))
}

/// Compute one figure of merit over two lists sharing an asymmetric domain.
///
/// `list2` is Wilson-scaled onto `list1` first unless `no_scale` is set.
/// Pairs are binned by d* of the first list's index; pairs outside the
/// shells are counted and reported. Anomalous kinds need `sym` to locate
/// Bijvoet partners, and each Bijvoet quartet contributes exactly once.
pub fn calculate(
    list1: &ReflList,
    list2: &mut ReflList,
    cell: &UnitCell,
    shells: &ResolutionShells,
    kind: FomKind,
    no_scale: bool,
    sym: Option<&SymOpList>,
) -> Result<FomContext> {
    let anom_sym = if kind.is_anomalous() {
        Some(sym.ok_or_else(|| {
            MergeError::Input(format!("{kind:?} requires a point group for Bijvoet pairing"))
        })?)
    } else {
        None
    };

    if !no_scale {
        wilson_scale(list1, list2, cell)?;
    }

    let mut fctx = FomContext::new(kind, shells.count());
    let mut visited: HashSet<Hkl> = HashSet::new();
    let mut n_out = 0;

    for (&idx, refl1) in list1 {
        let refl2 = match list2.find(idx) {
            Some(r) => r,
            None => continue,
        };

        let bin = match shells.bin_of(cell.resolution(idx)) {
            Some(b) => b,
            None => {
                n_out += 1;
                continue;
            }
        };

        let i1 = refl1.intensity;
        let i2 = refl2.intensity;
        let sig1 = refl1.sigma;
        let sig2 = refl2.sigma;

        let (i1bij, i2bij) = if let Some(sym) = anom_sym {
            let mate1 = find_equiv_in_list(list1, idx.negate(), sym);
            let mate2 = find_equiv_in_list(list2, idx.negate(), sym);
            let (mate1, mate2) = match (mate1, mate2) {
                (Some(a), Some(b)) => (a, b),
                // Selection guarantees complete pairs; tolerate strays.
                _ => continue,
            };

            // Count each pair once, whether visited as "normal" or mate.
            if visited.contains(&idx) {
                continue;
            }
            visited.insert(idx);
            visited.insert(mate1);

            let b1 = list1.find(mate1).map(|r| r.intensity).unwrap_or(i1);
            let b2 = list2.find(mate2).map(|r| r.intensity).unwrap_or(i2);
            (b1, b2)
        } else {
            (f64::INFINITY, f64::INFINITY)
        };

        fctx.add(bin, i1, i2, i1bij, i2bij, sig1, sig2);
    }

    if n_out > 0 {
        warn!(n_out, "reflection pairs outside the resolution shells");
    }

    Ok(fctx)
}
