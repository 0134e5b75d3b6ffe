#![allow(dead_code)]

use femtomerge_core::cell::UnitCell;
use femtomerge_core::crystal::{BeamParams, Crystal};
use femtomerge_core::hkl::Hkl;
use femtomerge_core::reflist::ReflList;

/// A cubic cell with the given edge in nanometres, axes along the lab frame.
pub fn cubic_cell(edge_nm: f64) -> UnitCell {
    let a = edge_nm * 1e-9;
    UnitCell::from_parameters(a, a, a, 90.0, 90.0, 90.0).expect("valid cubic cell")
}

/// Typical FEL beam: 0.1 nm wavelength, small divergence and bandwidth.
pub fn beam() -> BeamParams {
    BeamParams {
        wavelength: 1e-10,
        divergence: 1e-4,
        bandwidth: 1e-3,
    }
}

/// A reflection list from (h, k, l, intensity, sigma) tuples, each entry a
/// single scalable observation at full partiality.
pub fn refl_list(entries: &[(i32, i32, i32, f64, f64)]) -> ReflList {
    let mut list = ReflList::new();
    for &(h, k, l, intensity, sigma) in entries {
        let refl = list.add(Hkl::new(h, k, l));
        refl.intensity = intensity;
        refl.sigma = sigma;
        refl.partiality = 1.0;
        refl.redundancy = 1;
        refl.scalable = true;
    }
    list
}

/// A crystal over the given reflections with unit OSF.
pub fn crystal_with(cell: UnitCell, entries: &[(i32, i32, i32, f64, f64)]) -> Crystal {
    Crystal::new(cell, refl_list(entries), beam())
}

/// Deterministic synthetic "truth" intensities: `n` reflections along
/// distinct axes of a 10 nm cell, strong enough to pass any I/sigma cut.
pub fn truth_entries(n: usize) -> Vec<(i32, i32, i32, f64, f64)> {
    let mut out = Vec::with_capacity(n);
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    for i in 0..n {
        // xorshift keeps the fixture reproducible without a rand dependency.
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let intensity = 100.0 + (state % 10_000) as f64 / 10.0;
        let h = (i % 9) as i32 + 1;
        let k = (i / 9 % 9) as i32;
        let l = (i / 81) as i32;
        out.push((h, k, l, intensity, intensity.sqrt()));
    }
    out
}

/// Assert two reflection lists carry identical keys and bit-identical
/// intensities.
pub fn assert_lists_identical(a: &ReflList, b: &ReflList) {
    assert_eq!(a.len(), b.len());
    for ((ia, ra), (ib, rb)) in a.iter().zip(b.iter()) {
        assert_eq!(ia, ib);
        assert_eq!(ra.intensity.to_bits(), rb.intensity.to_bits());
        assert_eq!(ra.redundancy, rb.redundancy);
    }
}
