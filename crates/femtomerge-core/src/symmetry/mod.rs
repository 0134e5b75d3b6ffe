mod groups;

use nalgebra::{Matrix3, Vector3};

use crate::consts::MAX_GROUP_ORDER;
use crate::error::{MergeError, Result};
use crate::hkl::Hkl;

/// One point-group operation acting on Miller indices.
pub type SymOp = Matrix3<i32>;

/// A crystallographic point group: a named, ordered list of integer 3x3
/// operator matrices, closed under composition and containing the identity.
#[derive(Clone, Debug)]
pub struct SymOpList {
    name: String,
    ops: Vec<SymOp>,
}

pub fn apply_op(op: &SymOp, idx: Hkl) -> Hkl {
    let v = op * Vector3::new(idx.h, idx.k, idx.l);
    Hkl::new(v.x, v.y, v.z)
}

impl SymOpList {
    /// Look up a point group by its canonical name (e.g. "1", "mmm", "6/mmm").
    ///
    /// Monoclinic groups use unique axis b; trigonal and hexagonal groups are
    /// on hexagonal axes.
    pub fn from_name(name: &str) -> Result<Self> {
        let generators = groups::generators(name)
            .ok_or_else(|| MergeError::UnknownPointGroup(name.to_string()))?;
        let ops = close_under_composition(&generators)?;
        Ok(Self {
            name: name.to_string(),
            ops,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of operations in the group (not the orbit size of any index).
    pub fn order(&self) -> usize {
        self.ops.len()
    }

    pub fn ops(&self) -> &[SymOp] {
        &self.ops
    }

    /// The orbit of an index, deduplicated: operations that stabilise the
    /// index contribute one entry. Order is deterministic (first appearance
    /// under the stored operation order).
    pub fn orbit(&self, idx: Hkl) -> Vec<Hkl> {
        let mut out: Vec<Hkl> = Vec::with_capacity(self.ops.len());
        for op in &self.ops {
            let e = apply_op(op, idx);
            if !out.contains(&e) {
                out.push(e);
            }
        }
        out
    }

    /// Orbit size of an index; smaller than `order()` at special positions.
    pub fn num_equivs(&self, idx: Hkl) -> usize {
        self.orbit(idx).len()
    }

    /// The i-th member of the deduplicated orbit.
    pub fn get_equiv(&self, idx: Hkl, i: usize) -> Option<Hkl> {
        self.orbit(idx).into_iter().nth(i)
    }

    /// A reflection is centric when a proper rotation of the group maps it to
    /// its Friedel mate (-h,-k,-l). Improper operations relate Bijvoet mates
    /// without restricting the phase, so they do not count here.
    pub fn is_centric(&self, idx: Hkl) -> bool {
        let neg = idx.negate();
        self.ops
            .iter()
            .filter(|op| det3(op) > 0)
            .any(|op| apply_op(op, idx) == neg)
    }

    /// Canonical representative of an orbit: the lexicographically greatest
    /// member, comparing h, then k, then l. Stable across runs.
    pub fn asymmetric(&self, idx: Hkl) -> Hkl {
        self.orbit(idx)
            .into_iter()
            .max()
            .unwrap_or(idx)
    }
}

fn det3(m: &SymOp) -> i32 {
    m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
        - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
        + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])
}

/// Expand a generator set to the full group by repeated composition.
fn close_under_composition(generators: &[SymOp]) -> Result<Vec<SymOp>> {
    let mut ops: Vec<SymOp> = vec![Matrix3::identity()];
    for g in generators {
        if !ops.contains(g) {
            ops.push(*g);
        }
    }

    loop {
        let mut grew = false;
        let snapshot = ops.clone();
        for a in &snapshot {
            for b in &snapshot {
                let c = a * b;
                if !ops.contains(&c) {
                    ops.push(c);
                    grew = true;
                }
            }
        }
        if ops.len() > MAX_GROUP_ORDER {
            return Err(MergeError::UnknownPointGroup(format!(
                "generator set does not close within order {MAX_GROUP_ORDER}"
            )));
        }
        if !grew {
            break;
        }
    }
    Ok(ops)
}
