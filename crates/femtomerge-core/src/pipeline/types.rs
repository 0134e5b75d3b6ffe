use crate::crystal::Crystal;
use crate::reflist::ReflList;

/// Merge pipeline stage, used for progress reporting.
#[derive(Clone, Copy, Debug)]
pub enum MergeStage {
    Loading,
    Correcting,
    InitialScaling,
    Refining,
    Scaling,
}

impl std::fmt::Display for MergeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "Loading crystals"),
            Self::Correcting => write!(f, "Applying corrections"),
            Self::InitialScaling => write!(f, "Initial scaling"),
            Self::Refining => write!(f, "Refining crystals"),
            Self::Scaling => write!(f, "Scaling"),
        }
    }
}

/// Summary of one outer iteration of the merge loop.
#[derive(Clone, Copy, Debug)]
pub struct IterationReport {
    /// 0 for the initial scaling pass.
    pub iteration: usize,
    /// Crystals contributing to the merged list this iteration.
    pub n_active_crystals: usize,
    /// Scalable observations feeding the scaler.
    pub n_observations: usize,
    /// Whether the scaling solve met its convergence criterion.
    pub converged: bool,
    pub n_no_refinement: usize,
    pub n_solver_failed: usize,
    pub n_lost: usize,
    /// R-factor of the merged list against the reference, when one was
    /// supplied.
    pub r_reference: Option<f64>,
}

/// Thread-safe progress reporting for the merge driver. All methods have
/// default no-op implementations.
pub trait MergeReporter: Send + Sync {
    /// A new stage has started; `total_items` is its work-item count when
    /// known (e.g. crystals to refine).
    fn begin_stage(&self, _stage: MergeStage, _total_items: Option<usize>) {}

    /// One outer iteration (including iteration 0) has finished.
    fn iteration(&self, _report: &IterationReport) {}

    fn finish_stage(&self) {}
}

/// No-op reporter used when `run_merge` delegates.
pub(super) struct NoOpReporter;
impl MergeReporter for NoOpReporter {}

/// Everything the merge loop produced.
#[derive(Debug)]
pub struct MergeOutput {
    /// The merged asymmetric reflection list from the last completed pass.
    pub merged: ReflList,
    /// All loaded crystals with their final parameters and status flags.
    pub crystals: Vec<Crystal>,
    pub reports: Vec<IterationReport>,
    /// True when a cancellation request stopped the loop early.
    pub cancelled: bool,
}
