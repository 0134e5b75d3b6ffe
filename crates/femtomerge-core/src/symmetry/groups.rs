//! Generator tables for the crystallographic point groups.
//!
//! Operators are integer matrices acting on a Miller column vector (h,k,l).
//! Monoclinic groups use unique axis b; trigonal and hexagonal groups are
//! expressed on hexagonal axes, so their matrices mix h and k.

use nalgebra::Matrix3;

use super::SymOp;

fn inv() -> SymOp {
    Matrix3::new(-1, 0, 0, 0, -1, 0, 0, 0, -1)
}

fn twofold_a() -> SymOp {
    Matrix3::new(1, 0, 0, 0, -1, 0, 0, 0, -1)
}

fn twofold_b() -> SymOp {
    Matrix3::new(-1, 0, 0, 0, 1, 0, 0, 0, -1)
}

fn twofold_c() -> SymOp {
    Matrix3::new(-1, 0, 0, 0, -1, 0, 0, 0, 1)
}

fn mirror_a() -> SymOp {
    Matrix3::new(-1, 0, 0, 0, 1, 0, 0, 0, 1)
}

fn mirror_b() -> SymOp {
    Matrix3::new(1, 0, 0, 0, -1, 0, 0, 0, 1)
}

fn mirror_c() -> SymOp {
    Matrix3::new(1, 0, 0, 0, 1, 0, 0, 0, -1)
}

/// 4+ about c: (h,k,l) -> (-k,h,l).
fn fourfold_c() -> SymOp {
    Matrix3::new(0, -1, 0, 1, 0, 0, 0, 0, 1)
}

/// Rotoinversion -4 about c: (h,k,l) -> (k,-h,-l).
fn rotoinv_four_c() -> SymOp {
    Matrix3::new(0, 1, 0, -1, 0, 0, 0, 0, -1)
}

/// 3+ about c, hexagonal axes: (h,k,l) -> (-h-k,h,l).
fn threefold_hex() -> SymOp {
    Matrix3::new(-1, -1, 0, 1, 0, 0, 0, 0, 1)
}

/// 6+ about c, hexagonal axes: (h,k,l) -> (-k,h+k,l).
fn sixfold_hex() -> SymOp {
    Matrix3::new(0, -1, 0, 1, 1, 0, 0, 0, 1)
}

/// 2-fold along a, hexagonal axes: (h,k,l) -> (h,-h-k,-l).
fn twofold_hex_a() -> SymOp {
    Matrix3::new(1, 0, 0, -1, -1, 0, 0, 0, -1)
}

/// Mirror exchanging a and b, hexagonal axes: (h,k,l) -> (k,h,l).
fn mirror_hex() -> SymOp {
    Matrix3::new(0, 1, 0, 1, 0, 0, 0, 0, 1)
}

/// Body-diagonal 3-fold, cubic: (h,k,l) -> (k,l,h).
fn threefold_cubic() -> SymOp {
    Matrix3::new(0, 1, 0, 0, 0, 1, 1, 0, 0)
}

/// Generator set for a point group name, or None if the name is unknown.
pub(super) fn generators(name: &str) -> Option<Vec<SymOp>> {
    let gens = match name {
        "1" => vec![],
        "-1" => vec![inv()],

        "2" => vec![twofold_b()],
        "m" => vec![mirror_b()],
        "2/m" => vec![twofold_b(), inv()],

        "222" => vec![twofold_c(), twofold_a()],
        "mm2" => vec![twofold_c(), mirror_a()],
        "mmm" => vec![twofold_c(), twofold_a(), inv()],

        "4" => vec![fourfold_c()],
        "-4" => vec![rotoinv_four_c()],
        "4/m" => vec![fourfold_c(), inv()],
        "422" => vec![fourfold_c(), twofold_a()],
        "4mm" => vec![fourfold_c(), mirror_a()],
        "-42m" => vec![rotoinv_four_c(), twofold_a()],
        "4/mmm" => vec![fourfold_c(), twofold_a(), inv()],

        "3" => vec![threefold_hex()],
        "-3" => vec![threefold_hex(), inv()],
        "32" => vec![threefold_hex(), twofold_hex_a()],
        "3m" => vec![threefold_hex(), mirror_hex()],
        "-3m" => vec![threefold_hex(), twofold_hex_a(), inv()],

        "6" => vec![sixfold_hex()],
        "-6" => vec![threefold_hex(), mirror_c()],
        "6/m" => vec![sixfold_hex(), inv()],
        "622" => vec![sixfold_hex(), twofold_hex_a()],
        "6mm" => vec![sixfold_hex(), mirror_hex()],
        "-62m" => vec![threefold_hex(), mirror_c(), twofold_hex_a()],
        "6/mmm" => vec![sixfold_hex(), twofold_hex_a(), inv()],

        "23" => vec![twofold_c(), twofold_a(), threefold_cubic()],
        "m-3" => vec![twofold_c(), twofold_a(), threefold_cubic(), inv()],
        "432" => vec![fourfold_c(), threefold_cubic()],
        "-43m" => vec![rotoinv_four_c(), threefold_cubic()],
        "m-3m" => vec![fourfold_c(), threefold_cubic(), inv()],

        _ => return None,
    };
    Some(gens)
}
