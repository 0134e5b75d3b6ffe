use serde::{Deserialize, Serialize};

use crate::correct::Polarisation;
use crate::partiality::ModelKind;
use crate::refine::RefineOptions;

/// All merge-driver options.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Outer scale + refine cycles.
    pub iterations: usize,
    /// Hold every OSF at 1.0 (disables the scale-factor solve).
    pub no_scale: bool,
    /// Partiality model; `Unity` also disables post-refinement.
    pub model: ModelKind,
    /// Merged reflections below this redundancy are dropped.
    pub min_measurements: u32,
    pub polarisation: Polarisation,
    /// Point group used for asymmetric folding.
    pub symmetry: String,
    /// Worker threads for post-refinement; 0 uses the global pool.
    pub threads: usize,
    #[serde(default)]
    pub refine: RefineOptions,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            no_scale: false,
            model: ModelKind::default(),
            min_measurements: 2,
            polarisation: Polarisation::default(),
            symmetry: "1".to_string(),
            threads: 0,
            refine: RefineOptions::default(),
        }
    }
}
