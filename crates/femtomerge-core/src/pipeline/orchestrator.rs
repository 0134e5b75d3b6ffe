use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::correct::{fold_crystal_to_asymmetric, fold_to_asymmetric, polarisation_correction};
use crate::crystal::{Crystal, CrystalSource, CrystalStatus};
use crate::error::{MergeError, Result};
use crate::reflist::ReflList;
use crate::refine::{refine_all, select_refinable};
use crate::scaling::{scale, select_scalable, ScaleOptions, ScaleOutcome};
use crate::symmetry::SymOpList;

use super::config::MergeConfig;
use super::types::{IterationReport, MergeOutput, MergeReporter, MergeStage, NoOpReporter};

/// Run the full merge loop with a progress reporter and an optional
/// cancellation flag.
///
/// The flag is checked once per outer iteration; a cancelled run returns
/// cleanly with the previous iteration's merged list intact.
pub fn run_merge_reported(
    source: &mut dyn CrystalSource,
    reference: Option<&ReflList>,
    config: &MergeConfig,
    reporter: &dyn MergeReporter,
    cancel: Option<&AtomicBool>,
) -> Result<MergeOutput> {
    let sym = SymOpList::from_name(&config.symmetry)?;
    let model = config.model.instantiate();
    let scale_opts = ScaleOptions {
        no_scale: config.no_scale,
        min_measurements: config.min_measurements,
    };

    // Load the crystal stream. A bad record is fatal for that crystal only.
    reporter.begin_stage(MergeStage::Loading, None);
    let mut crystals: Vec<Crystal> = Vec::new();
    let mut n_input_errors = 0;
    loop {
        match source.next_crystal() {
            Ok(Some(mut crystal)) => {
                if let Err(e) = validate_crystal(&crystal) {
                    warn!(error = %e, "skipping crystal");
                    n_input_errors += 1;
                    continue;
                }
                crystal.osf = 1.0;
                crystal.status = CrystalStatus::Ok;
                crystals.push(crystal);
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "skipping unreadable crystal record");
                n_input_errors += 1;
            }
        }
    }
    reporter.finish_stage();

    if crystals.is_empty() {
        return Err(MergeError::EmptyDataset);
    }
    info!(
        n_crystals = crystals.len(),
        n_input_errors, "crystal stream loaded"
    );

    // Corrections: polarisation once, then fold every list to the
    // asymmetric unit of the merging symmetry.
    reporter.begin_stage(MergeStage::Correcting, Some(crystals.len()));
    for crystal in &mut crystals {
        polarisation_correction(crystal, config.polarisation);
        fold_crystal_to_asymmetric(crystal, &sym);
    }
    let reference = reference.map(|list| fold_to_asymmetric(list, &sym));
    reporter.finish_stage();

    // Initial partialities and scalable flags.
    let mut n_obs = 0;
    for crystal in &mut crystals {
        model.update_partialities(crystal);
        n_obs += select_scalable(&mut crystal.reflections, reference.as_ref());
    }
    info!(n_obs, "scalable observations before initial scaling");

    reporter.begin_stage(MergeStage::InitialScaling, None);
    if config.no_scale {
        info!("scale factors fixed at 1");
    }
    let mut outcome = scale(&mut crystals, reference.as_ref(), &scale_opts)?;
    reporter.finish_stage();

    let mut reports = Vec::with_capacity(config.iterations + 1);
    let report = make_report(0, &outcome, 0, 0, 0, reference.as_ref());
    reporter.iteration(&report);
    reports.push(report);

    let pool = build_pool(config.threads)?;
    let mut cancelled = false;

    for iteration in 1..=config.iterations {
        if let Some(cancel) = cancel {
            if cancel.load(Ordering::Relaxed) {
                info!(iteration, "merge cancelled at iteration boundary");
                cancelled = true;
                break;
            }
        }

        info!(
            iteration,
            total = config.iterations,
            "post-refinement cycle"
        );

        // Refine every crystal against the reference when one was given,
        // otherwise against the current merged estimate.
        let comp = reference.as_ref().unwrap_or(&outcome.merged);
        for crystal in &mut crystals {
            select_refinable(crystal, comp, reference.is_some());
        }

        reporter.begin_stage(MergeStage::Refining, Some(crystals.len()));
        let stats = match &pool {
            Some(pool) => pool.install(|| {
                refine_all(&mut crystals, comp, model.as_ref(), &config.refine)
            }),
            None => refine_all(&mut crystals, comp, model.as_ref(), &config.refine),
        };
        reporter.finish_stage();

        if stats.n_flagged() > 0 {
            info!(
                n_flagged = stats.n_flagged(),
                n_no_refinement = stats.n_no_refinement,
                n_solver_failed = stats.n_solver_failed,
                n_lost = stats.n_lost,
                "crystals could not be refined this cycle"
            );
        }

        let mut n_obs = 0;
        for crystal in &mut crystals {
            n_obs += select_scalable(&mut crystal.reflections, reference.as_ref());
        }
        info!(iteration, n_obs, "scalable observations re-selected");

        reporter.begin_stage(MergeStage::Scaling, None);
        outcome = scale(&mut crystals, reference.as_ref(), &scale_opts)?;
        reporter.finish_stage();

        let report = make_report(
            iteration,
            &outcome,
            stats.n_no_refinement,
            stats.n_solver_failed,
            stats.n_lost,
            reference.as_ref(),
        );
        reporter.iteration(&report);
        reports.push(report);
    }

    Ok(MergeOutput {
        merged: outcome.merged,
        crystals,
        reports,
        cancelled,
    })
}

/// Run the full merge loop without progress reporting or cancellation.
pub fn run_merge(
    source: &mut dyn CrystalSource,
    reference: Option<&ReflList>,
    config: &MergeConfig,
) -> Result<MergeOutput> {
    run_merge_reported(source, reference, config, &NoOpReporter, None)
}

fn validate_crystal(crystal: &Crystal) -> Result<()> {
    let beam = &crystal.beam;
    if !(beam.wavelength > 0.0) || !beam.divergence.is_finite() || !beam.bandwidth.is_finite() {
        return Err(MergeError::Input(format!(
            "missing or invalid beam parameters (lambda {}, div {}, bw {})",
            beam.wavelength, beam.divergence, beam.bandwidth
        )));
    }
    if crystal.reflections.is_empty() {
        return Err(MergeError::Input("crystal has no reflections".to_string()));
    }
    Ok(())
}

fn build_pool(threads: usize) -> Result<Option<rayon::ThreadPool>> {
    if threads == 0 {
        return Ok(None);
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map(Some)
        .map_err(|e| MergeError::Pipeline(format!("failed to build thread pool: {e}")))
}

fn make_report(
    iteration: usize,
    outcome: &ScaleOutcome,
    n_no_refinement: usize,
    n_solver_failed: usize,
    n_lost: usize,
    reference: Option<&ReflList>,
) -> IterationReport {
    IterationReport {
        iteration,
        n_active_crystals: outcome.n_crystals_used,
        n_observations: outcome.n_observations,
        converged: outcome.converged,
        n_no_refinement,
        n_solver_failed,
        n_lost,
        r_reference: reference.map(|r| r_factor(&outcome.merged, r)),
    }
}

/// R1-style agreement of the merged list against a reference, over common
/// reflections.
fn r_factor(merged: &ReflList, reference: &ReflList) -> f64 {
    let mut num = 0.0;
    let mut den = 0.0;
    for (&idx, refl) in merged {
        if let Some(r) = reference.find(idx) {
            num += (refl.intensity - r.intensity).abs();
            den += r.intensity.abs();
        }
    }
    if den > 0.0 {
        num / den
    } else {
        f64::NAN
    }
}
