//! Text serialisation of merged reflection lists: a header documenting the
//! unit cell and point group, then one reflection per line as
//! `h k l I sigma(I) redundancy`.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::cell::UnitCell;
use crate::error::Result;
use crate::reflist::ReflList;

/// Write a reflection list. Intensities keep six decimal places, so a
/// written-and-reread list reproduces them to that precision exactly.
pub fn write_refl_list(
    w: &mut impl Write,
    list: &ReflList,
    cell: Option<&UnitCell>,
    point_group: &str,
) -> Result<()> {
    match cell {
        Some(cell) => {
            let (a, b, c, alpha, beta, gamma) = cell.parameters();
            writeln!(
                w,
                "# cell {:.5} {:.5} {:.5} nm {:.3} {:.3} {:.3} deg pointgroup {}",
                a * 1e9,
                b * 1e9,
                c * 1e9,
                alpha,
                beta,
                gamma,
                point_group
            )?;
        }
        None => writeln!(w, "# pointgroup {point_group}")?,
    }
    writeln!(w, "#   h   k   l          I   sigma(I)  redundancy")?;

    for (idx, refl) in list {
        writeln!(
            w,
            "{:4} {:3} {:3} {:.6} {:.6} {}",
            idx.h, idx.k, idx.l, refl.intensity, refl.sigma, refl.redundancy
        )?;
    }
    Ok(())
}

pub fn write_refl_list_to_path(
    path: &Path,
    list: &ReflList,
    cell: Option<&UnitCell>,
    point_group: &str,
) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write_refl_list(&mut w, list, cell, point_group)?;
    w.flush()?;
    Ok(())
}

/// Read a reflection list written by [`write_refl_list`] (or any external
/// list in the same column order). Lines that do not parse, including the
/// header, are skipped.
pub fn read_refl_list(r: impl BufRead) -> Result<ReflList> {
    let mut list = ReflList::new();

    for line in r.lines() {
        let line = line?;
        let mut fields = line.split_whitespace();

        let h = fields.next().and_then(|s| s.parse::<i32>().ok());
        let k = fields.next().and_then(|s| s.parse::<i32>().ok());
        let l = fields.next().and_then(|s| s.parse::<i32>().ok());
        let intensity = fields.next().and_then(|s| s.parse::<f64>().ok());
        let (h, k, l, intensity) = match (h, k, l, intensity) {
            (Some(h), Some(k), Some(l), Some(i)) => (h, k, l, i),
            _ => continue,
        };

        let sigma = fields.next().and_then(|s| s.parse::<f64>().ok());
        let redundancy = fields.next().and_then(|s| s.parse::<u32>().ok());

        let refl = list.add((h, k, l).into());
        refl.intensity = intensity;
        refl.sigma = sigma.unwrap_or(0.0);
        refl.redundancy = redundancy.unwrap_or(1);
    }
    Ok(list)
}

pub fn read_refl_list_from_path(path: &Path) -> Result<ReflList> {
    read_refl_list(BufReader::new(File::open(path)?))
}
