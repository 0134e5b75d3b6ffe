use femtomerge_core::error::MergeError;
use femtomerge_core::hkl::Hkl;
use femtomerge_core::symmetry::SymOpList;

#[test]
fn point_group_orders() {
    for (name, order) in [
        ("1", 1),
        ("-1", 2),
        ("2", 2),
        ("m", 2),
        ("2/m", 4),
        ("222", 4),
        ("mm2", 4),
        ("mmm", 8),
        ("4", 4),
        ("-4", 4),
        ("4/m", 8),
        ("422", 8),
        ("4mm", 8),
        ("-42m", 8),
        ("4/mmm", 16),
        ("3", 3),
        ("-3", 6),
        ("32", 6),
        ("3m", 6),
        ("-3m", 12),
        ("6", 6),
        ("-6", 6),
        ("6/m", 12),
        ("622", 12),
        ("6mm", 12),
        ("-62m", 12),
        ("6/mmm", 24),
        ("23", 12),
        ("m-3", 24),
        ("432", 24),
        ("-43m", 24),
        ("m-3m", 48),
    ] {
        let pg = SymOpList::from_name(name).unwrap();
        assert_eq!(pg.order(), order, "group {name}");
    }
}

#[test]
fn unknown_name_fails() {
    assert!(matches!(
        SymOpList::from_name("p21"),
        Err(MergeError::UnknownPointGroup(_))
    ));
}

#[test]
fn orbit_sizes_under_mmm() {
    let pg = SymOpList::from_name("mmm").unwrap();
    // General position: all eight sign combinations.
    assert_eq!(pg.num_equivs(Hkl::new(1, 2, 3)), 8);
    // Special position on the c axis: only the l sign flips.
    assert_eq!(pg.num_equivs(Hkl::new(0, 0, 4)), 2);
    assert_eq!(pg.num_equivs(Hkl::new(0, 0, 0)), 1);
}

#[test]
fn orbit_times_stabiliser_accounts_for_group_order() {
    // Orbit size always divides the group order.
    let pg = SymOpList::from_name("m-3m").unwrap();
    for idx in [
        Hkl::new(1, 2, 3),
        Hkl::new(1, 1, 1),
        Hkl::new(1, 0, 0),
        Hkl::new(1, 1, 0),
    ] {
        let n = pg.num_equivs(idx);
        assert_eq!(pg.order() % n, 0, "orbit of {idx} has size {n}");
    }
    assert_eq!(pg.num_equivs(Hkl::new(1, 0, 0)), 6);
    assert_eq!(pg.num_equivs(Hkl::new(1, 1, 1)), 8);
}

#[test]
fn get_equiv_enumerates_the_orbit() {
    let pg = SymOpList::from_name("222").unwrap();
    let idx = Hkl::new(1, 2, 3);
    let n = pg.num_equivs(idx);
    assert_eq!(n, 4);
    let mut seen = Vec::new();
    for i in 0..n {
        let e = pg.get_equiv(idx, i).unwrap();
        assert!(!seen.contains(&e), "duplicate equivalent {e}");
        seen.push(e);
    }
    assert_eq!(pg.get_equiv(idx, n), None);
}

#[test]
fn centric_classification_under_mmm() {
    let pg = SymOpList::from_name("mmm").unwrap();
    assert!(pg.is_centric(Hkl::new(0, 0, 4)));
    assert!(!pg.is_centric(Hkl::new(1, 2, 3)));
}

#[test]
fn centric_classification_under_monoclinic() {
    let pg = SymOpList::from_name("2").unwrap();
    // The b-axis twofold maps (h,0,l) onto its Friedel mate.
    assert!(pg.is_centric(Hkl::new(1, 0, 3)));
    assert!(!pg.is_centric(Hkl::new(1, 1, 3)));
}

#[test]
fn asymmetric_representative_is_stable() {
    let pg = SymOpList::from_name("mmm").unwrap();
    let idx = Hkl::new(-1, 2, -3);
    let asym = pg.asymmetric(idx);
    // The representative is the lexicographically greatest orbit member.
    assert_eq!(asym, Hkl::new(1, 2, 3));

    // Every equivalent folds to the same representative, and folding is
    // idempotent.
    for i in 0..pg.num_equivs(idx) {
        let e = pg.get_equiv(idx, i).unwrap();
        assert_eq!(pg.asymmetric(e), asym);
    }
    assert_eq!(pg.asymmetric(asym), asym);
}

#[test]
fn hexagonal_orbit_closes() {
    let pg = SymOpList::from_name("6").unwrap();
    let orbit = pg.orbit(Hkl::new(1, 0, 0));
    assert_eq!(orbit.len(), 6);
    // Repeated application of the sixfold returns to the start.
    assert!(orbit.contains(&Hkl::new(1, 0, 0)));
    assert!(orbit.contains(&Hkl::new(-1, 0, 0)));
}

#[test]
fn identity_group_leaves_indices_alone() {
    let pg = SymOpList::from_name("1").unwrap();
    let idx = Hkl::new(-3, 5, 2);
    assert_eq!(pg.num_equivs(idx), 1);
    assert_eq!(pg.asymmetric(idx), idx);
    assert!(!pg.is_centric(idx));
}
