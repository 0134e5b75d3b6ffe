use femtomerge_core::hkl::Hkl;
use femtomerge_core::reflist::ReflList;

#[test]
fn add_then_find() {
    let mut list = ReflList::new();
    let refl = list.add(Hkl::new(1, 2, 3));
    refl.intensity = 42.0;
    refl.redundancy = 1;

    assert_eq!(list.len(), 1);
    let found = list.find(Hkl::new(1, 2, 3)).unwrap();
    assert_eq!(found.intensity, 42.0);
    assert!(list.find(Hkl::new(3, 2, 1)).is_none());
}

#[test]
fn add_returns_the_existing_entry() {
    let mut list = ReflList::new();
    list.add(Hkl::new(0, 0, 1)).intensity = 10.0;
    // Same key: no duplicate is created and the handle sees the old data.
    let again = list.add(Hkl::new(0, 0, 1));
    assert_eq!(again.intensity, 10.0);
    assert_eq!(list.len(), 1);
}

#[test]
fn find_is_exact_not_symmetry_folded() {
    let mut list = ReflList::new();
    list.add(Hkl::new(1, 0, 0));
    assert!(list.find(Hkl::new(-1, 0, 0)).is_none());
}

#[test]
fn iteration_is_ordered_and_deterministic() {
    let mut list = ReflList::new();
    for &(h, k, l) in &[(2, 0, 0), (-1, 3, 0), (0, 0, 1), (-1, 2, 5), (2, -4, 1)] {
        list.add(Hkl::new(h, k, l));
    }
    let keys: Vec<Hkl> = list.iter().map(|(&idx, _)| idx).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);

    // A second list built in a different insertion order iterates the same.
    let mut other = ReflList::new();
    for &idx in keys.iter().rev() {
        other.add(idx);
    }
    let keys2: Vec<Hkl> = other.iter().map(|(&idx, _)| idx).collect();
    assert_eq!(keys, keys2);
}

#[test]
fn default_fields_satisfy_the_invariants() {
    let mut list = ReflList::new();
    let refl = list.add(Hkl::new(5, -2, 7));
    assert!(refl.partiality >= 0.0 && refl.partiality <= 1.0);
    assert!(refl.sigma >= 0.0);
    assert!(!refl.scalable);
    assert!(!refl.refinable);
    assert_eq!(refl.redundancy, 0);
}

#[test]
fn retain_drops_entries() {
    let mut list = ReflList::new();
    for h in 0..10 {
        list.add(Hkl::new(h, 0, 0)).redundancy = h as u32;
    }
    list.retain(|_, r| r.redundancy >= 5);
    assert_eq!(list.len(), 5);
    assert!(list.find(Hkl::new(4, 0, 0)).is_none());
    assert!(list.find(Hkl::new(5, 0, 0)).is_some());
}
