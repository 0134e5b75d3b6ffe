mod common;

use std::io::Cursor;

use femtomerge_core::crystal::CrystalStatus;
use femtomerge_core::hkl::Hkl;
use femtomerge_core::io::{
    read_refl_list, read_refl_list_from_path, write_crystal_params, write_refl_list,
    write_refl_list_to_path,
};

#[test]
fn written_lists_read_back_within_text_precision() {
    let mut list = common::refl_list(&[
        (1, 0, 0, 123.456789, 3.21),
        (-4, 2, 7, 0.001234, 0.0005),
        (10, -10, 3, 99999.875, 120.5),
    ]);
    for (i, (_, refl)) in list.iter_mut().enumerate() {
        refl.redundancy = i as u32 + 1;
    }

    let cell = common::cubic_cell(1.0);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("merged.hkl");
    write_refl_list_to_path(&path, &list, Some(&cell), "mmm").unwrap();

    let reread = read_refl_list_from_path(&path).unwrap();
    assert_eq!(reread.len(), list.len());
    for (&idx, refl) in &list {
        let r = reread.find(idx).unwrap();
        // The writer keeps six decimal places.
        assert!((r.intensity - refl.intensity).abs() < 5e-7);
        assert!((r.sigma - refl.sigma).abs() < 5e-7);
        assert_eq!(r.redundancy, refl.redundancy);
    }
}

#[test]
fn rewriting_a_reread_list_is_byte_identical() {
    let list = common::refl_list(&[(1, 2, 3, 100.125, 1.5), (2, 0, 0, 50.5, 0.25)]);
    let cell = common::cubic_cell(1.0);

    let mut first = Vec::new();
    write_refl_list(&mut first, &list, Some(&cell), "1").unwrap();

    let reread = read_refl_list(Cursor::new(&first)).unwrap();
    let mut second = Vec::new();
    write_refl_list(&mut second, &reread, Some(&cell), "1").unwrap();

    assert_eq!(first, second);
}

#[test]
fn header_documents_cell_and_point_group() {
    let list = common::refl_list(&[(1, 0, 0, 10.0, 1.0)]);
    let cell = common::cubic_cell(1.0);
    let mut out = Vec::new();
    write_refl_list(&mut out, &list, Some(&cell), "4/mmm").unwrap();
    let text = String::from_utf8(out).unwrap();

    let header = text.lines().next().unwrap();
    assert!(header.starts_with('#'));
    assert!(header.contains("pointgroup 4/mmm"));
    assert!(header.contains("1.00000"));
}

#[test]
fn reader_skips_unparseable_lines() {
    let text = "\
# some header\n\
bogus line entirely\n\
1 2 3 45.5 1.25 4\n\
4 5 not-a-number 1 1 1\n\
-1 -2 -3 10.0 0.5 2\n";
    let list = read_refl_list(Cursor::new(text)).unwrap();
    assert_eq!(list.len(), 2);
    let refl = list.find(Hkl::new(1, 2, 3)).unwrap();
    assert_eq!(refl.redundancy, 4);
    assert!((refl.intensity - 45.5).abs() < 1e-12);
}

#[test]
fn params_dump_has_one_line_per_crystal_with_status_chars() {
    let mut crystals = vec![
        common::crystal_with(common::cubic_cell(1.0), &[(1, 0, 0, 10.0, 1.0)]),
        common::crystal_with(common::cubic_cell(1.0), &[(1, 0, 0, 12.0, 1.0)]),
    ];
    crystals[0].osf = 1.25;
    crystals[1].status = CrystalStatus::SolverFailed;

    let mut out = Vec::new();
    write_crystal_params(&mut out, &crystals).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 2);
    assert!(lines[0].trim_end().ends_with('-'));
    assert!(lines[1].trim_end().ends_with('N'));
    assert!(lines[0].contains("1.25"));
}
