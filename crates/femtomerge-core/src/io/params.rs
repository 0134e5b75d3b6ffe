use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::crystal::Crystal;
use crate::error::Result;

/// Dump per-crystal parameters, one line per crystal: index, OSF,
/// divergence and a status character (`-` OK, `N` flagged).
pub fn write_crystal_params(w: &mut impl Write, crystals: &[Crystal]) -> Result<()> {
    for (i, crystal) in crystals.iter().enumerate() {
        writeln!(
            w,
            "{:4} {:5.2} {:10.5e} {}",
            i,
            crystal.osf,
            crystal.beam.divergence,
            crystal.status.flag_char()
        )?;
    }
    Ok(())
}

pub fn write_crystal_params_to_path(path: &Path, crystals: &[Crystal]) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write_crystal_params(&mut w, crystals)?;
    w.flush()?;
    Ok(())
}
