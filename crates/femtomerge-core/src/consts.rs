/// Reflections with a predicted partiality below this are not scalable.
pub const MIN_SCALABLE_PARTIALITY: f64 = 0.05;

/// Scaling has converged when the largest change in log OSF drops below this.
pub const SCALE_CONVERGENCE: f64 = 1e-5;

/// Cap on the alternating least-squares passes inside one scaling run.
pub const MAX_SCALE_CYCLES: usize = 100;

/// I/sigma(I) cutoff for a reflection to guide post-refinement.
pub const REFINABLE_SNR: f64 = 3.0;

/// Minimum redundancy of the merged estimate backing a refinable reflection
/// (waived when an external reference list is supplied).
pub const MIN_FULL_REDUNDANCY: u32 = 2;

/// Floor on the Lorentz denominator for a monochromatic, zero-divergence beam.
pub const MIN_EWALD_WIDTH: f64 = 1.0;

/// Largest admissible point-group order.
pub const MAX_GROUP_ORDER: usize = 48;
