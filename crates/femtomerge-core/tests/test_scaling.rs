mod common;

use femtomerge_core::crystal::CrystalStatus;
use femtomerge_core::error::MergeError;
use femtomerge_core::hkl::Hkl;
use femtomerge_core::reflist::ReflList;
use femtomerge_core::scaling::{scale, select_scalable, ScaleOptions};

const TRUE_OSFS: [f64; 10] = [0.5, 0.7, 1.0, 1.3, 1.8, 0.9, 1.1, 2.0, 0.6, 1.5];

#[test]
fn select_scalable_applies_all_criteria() {
    let mut list = common::refl_list(&[(1, 0, 0, 100.0, 10.0), (2, 0, 0, 100.0, 10.0)]);
    list.find_mut(Hkl::new(1, 0, 0)).unwrap().partiality = 0.01;
    assert_eq!(select_scalable(&mut list, None), 1);
    assert!(!list.find(Hkl::new(1, 0, 0)).unwrap().scalable);

    // Zero redundancy means the reflection vanished at the last update.
    list.find_mut(Hkl::new(2, 0, 0)).unwrap().redundancy = 0;
    assert_eq!(select_scalable(&mut list, None), 0);

    // Against a reference, the index must also exist there.
    let mut list = common::refl_list(&[(1, 0, 0, 100.0, 10.0), (2, 0, 0, 100.0, 10.0)]);
    let reference = common::refl_list(&[(1, 0, 0, 90.0, 5.0)]);
    assert_eq!(select_scalable(&mut list, Some(&reference)), 1);
    assert!(list.find(Hkl::new(1, 0, 0)).unwrap().scalable);
    assert!(!list.find(Hkl::new(2, 0, 0)).unwrap().scalable);
}

#[test]
fn two_crystal_merge_without_scaling() {
    // Two observations of (1,0,0) at 100 and 200 merge to 150 with
    // redundancy 2 when the scale factors are held at unity.
    let mut crystals = vec![
        common::crystal_with(common::cubic_cell(1.0), &[(1, 0, 0, 100.0, 10.0)]),
        common::crystal_with(common::cubic_cell(1.0), &[(1, 0, 0, 200.0, 10.0)]),
    ];
    let opts = ScaleOptions {
        no_scale: true,
        min_measurements: 1,
    };
    let outcome = scale(&mut crystals, None, &opts).unwrap();

    let merged = outcome.merged.find(Hkl::new(1, 0, 0)).unwrap();
    assert!((merged.intensity - 150.0).abs() < 1e-9);
    assert_eq!(merged.redundancy, 2);
    assert_eq!(crystals[0].osf, 1.0);
    assert_eq!(crystals[1].osf, 1.0);
}

fn scaled_dataset() -> Vec<femtomerge_core::crystal::Crystal> {
    let truth = common::truth_entries(50);
    TRUE_OSFS
        .iter()
        .map(|&osf| {
            let entries: Vec<(i32, i32, i32, f64, f64)> = truth
                .iter()
                .map(|&(h, k, l, i, s)| (h, k, l, i * osf, s * osf))
                .collect();
            common::crystal_with(common::cubic_cell(10.0), &entries)
        })
        .collect()
}

#[test]
fn scale_recovery_up_to_the_common_gauge() {
    // Ten copies of the same truth list, multiplied by known OSFs. Scaling
    // must recover the factors (up to one global gauge constant shared by
    // OSFs and merged intensities) and reproduce the truth.
    let mut crystals = scaled_dataset();
    let opts = ScaleOptions {
        no_scale: false,
        min_measurements: 1,
    };
    let outcome = scale(&mut crystals, None, &opts).unwrap();
    assert!(outcome.converged);

    let gauge = crystals[0].osf / TRUE_OSFS[0];
    for (crystal, &true_osf) in crystals.iter().zip(&TRUE_OSFS) {
        let ratio = crystal.osf / (true_osf * gauge);
        assert!(
            (ratio - 1.0).abs() < 1e-3,
            "OSF {} vs true {true_osf}",
            crystal.osf
        );
    }

    let truth = common::truth_entries(50);
    for &(h, k, l, i, _) in &truth {
        let merged = outcome.merged.find(Hkl::new(h, k, l)).unwrap();
        let ratio = merged.intensity * gauge / i;
        assert!((ratio - 1.0).abs() < 1e-3, "merged {h} {k} {l}");
        assert_eq!(merged.redundancy, 10);
    }
}

#[test]
fn no_scale_runs_are_reproducible() {
    let opts = ScaleOptions {
        no_scale: true,
        min_measurements: 1,
    };
    let mut first = scaled_dataset();
    let a = scale(&mut first, None, &opts).unwrap();
    let mut second = scaled_dataset();
    let b = scale(&mut second, None, &opts).unwrap();
    common::assert_lists_identical(&a.merged, &b.merged);
}

#[test]
fn min_measurements_drops_sparse_reflections() {
    let mut crystals = vec![
        common::crystal_with(
            common::cubic_cell(1.0),
            &[(1, 0, 0, 100.0, 10.0), (2, 0, 0, 60.0, 6.0)],
        ),
        common::crystal_with(common::cubic_cell(1.0), &[(1, 0, 0, 120.0, 10.0)]),
    ];
    let opts = ScaleOptions {
        no_scale: true,
        min_measurements: 2,
    };
    let outcome = scale(&mut crystals, None, &opts).unwrap();
    assert!(outcome.merged.find(Hkl::new(1, 0, 0)).is_some());
    assert!(outcome.merged.find(Hkl::new(2, 0, 0)).is_none());
}

#[test]
fn crystal_with_nothing_scalable_is_flagged_not_fatal() {
    let mut crystals = vec![
        common::crystal_with(common::cubic_cell(1.0), &[(1, 0, 0, 100.0, 10.0)]),
        common::crystal_with(common::cubic_cell(1.0), &[(1, 0, 0, 110.0, 10.0)]),
        common::crystal_with(common::cubic_cell(1.0), &[(2, 0, 0, 90.0, 9.0)]),
    ];
    // The third crystal's only reflection is vanishingly partial.
    crystals[2]
        .reflections
        .find_mut(Hkl::new(2, 0, 0))
        .unwrap()
        .partiality = 0.01;
    for crystal in &mut crystals {
        select_scalable(&mut crystal.reflections, None);
    }

    let opts = ScaleOptions {
        no_scale: true,
        min_measurements: 1,
    };
    let outcome = scale(&mut crystals, None, &opts).unwrap();
    assert_eq!(crystals[2].status, CrystalStatus::SolverFailed);
    assert_eq!(outcome.n_crystals_used, 2);
    assert!(outcome.merged.find(Hkl::new(2, 0, 0)).is_none());
}

#[test]
fn no_observations_at_all_is_a_scaling_failure() {
    let mut crystals = vec![common::crystal_with(
        common::cubic_cell(1.0),
        &[(1, 0, 0, 100.0, 10.0)],
    )];
    // Nothing selected as scalable.
    for refl in crystals[0].reflections.iter_mut() {
        refl.1.scalable = false;
    }
    let result = scale(&mut crystals, None, &ScaleOptions::default());
    assert!(matches!(result, Err(MergeError::ScalingFailed(_))));
}

#[test]
fn reference_scaling_matches_crystals_to_the_reference() {
    // One crystal at half the reference intensity: its OSF must settle
    // near 0.5.
    let truth = common::truth_entries(30);
    let reference: ReflList = {
        let mut list = common::refl_list(&truth);
        for (_, refl) in list.iter_mut() {
            refl.redundancy = 5;
        }
        list
    };

    let halved: Vec<(i32, i32, i32, f64, f64)> = truth
        .iter()
        .map(|&(h, k, l, i, s)| (h, k, l, i * 0.5, s * 0.5))
        .collect();
    let mut crystals = vec![common::crystal_with(common::cubic_cell(10.0), &halved)];
    for crystal in &mut crystals {
        select_scalable(&mut crystal.reflections, Some(&reference));
    }

    let opts = ScaleOptions {
        no_scale: false,
        min_measurements: 1,
    };
    scale(&mut crystals, Some(&reference), &opts).unwrap();
    assert!((crystals[0].osf - 0.5).abs() < 1e-6);
}
