use serde::{Deserialize, Serialize};

use crate::cell::UnitCell;
use crate::error::Result;
use crate::reflist::ReflList;

/// Beam parameters for one exposure.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BeamParams {
    /// Wavelength in metres.
    pub wavelength: f64,
    /// Full-angle beam divergence in radians.
    pub divergence: f64,
    /// Fractional bandwidth (delta-lambda / lambda).
    pub bandwidth: f64,
}

impl BeamParams {
    /// Ewald sphere radius k = 1/lambda, in m^-1.
    pub fn k(&self) -> f64 {
        1.0 / self.wavelength
    }
}

/// Outcome of the most recent refinement attempt on a crystal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrystalStatus {
    Ok,
    /// Too few refinable reflections to attempt refinement.
    NoRefinement,
    /// The solver failed to improve the residual.
    SolverFailed,
    /// Refinement lost too many previously scalable reflections.
    Lost,
}

impl CrystalStatus {
    /// Status character used in the per-crystal parameter dump.
    pub fn flag_char(&self) -> char {
        match self {
            CrystalStatus::Ok => '-',
            _ => 'N',
        }
    }
}

/// A single successfully-indexed snapshot: its reflection list, oriented
/// cell, scale factor and shot parameters.
#[derive(Clone, Debug)]
pub struct Crystal {
    pub cell: UnitCell,
    pub reflections: ReflList,
    /// Overall scale factor, always positive.
    pub osf: f64,
    /// Reciprocal-space profile radius in m^-1.
    pub profile_radius: f64,
    /// Mosaic spread in radians.
    pub mosaicity: f64,
    pub beam: BeamParams,
    pub status: CrystalStatus,
    pub id: Option<String>,
}

impl Crystal {
    pub fn new(cell: UnitCell, reflections: ReflList, beam: BeamParams) -> Self {
        Self {
            cell,
            reflections,
            osf: 1.0,
            profile_radius: 2e7,
            mosaicity: 0.0,
            beam,
            status: CrystalStatus::Ok,
            id: None,
        }
    }

    pub fn is_flagged(&self) -> bool {
        self.status != CrystalStatus::Ok
    }
}

/// The loader-facing interface: a stream of indexed crystals.
///
/// `next_crystal` returns `Ok(None)` at end of stream. A record that fails to
/// parse is an `Err` for that crystal only; callers may skip it and continue.
pub trait CrystalSource {
    fn next_crystal(&mut self) -> Result<Option<Crystal>>;
}

/// An in-memory crystal source, used by tests and by callers that have
/// already materialised the dataset.
pub struct VecSource {
    crystals: std::vec::IntoIter<Crystal>,
}

impl VecSource {
    pub fn new(crystals: Vec<Crystal>) -> Self {
        Self {
            crystals: crystals.into_iter(),
        }
    }
}

impl CrystalSource for VecSource {
    fn next_crystal(&mut self) -> Result<Option<Crystal>> {
        Ok(self.crystals.next())
    }
}
