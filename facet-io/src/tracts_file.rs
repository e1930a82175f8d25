use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::{bail, Context, Result};
use facet_core::nalgebra::Vector3;
use itertools::Itertools;

/// Reads a tract file with one tract per line, given as flat `x0 y0 z0 x1 y1 z1 ...` coordinates. Blank lines and
/// lines starting with `#` are skipped.
///
/// # Errors
///
/// If the file can't be opened, a value is not a number or a line does not hold a multiple of three values
pub fn read_tracts_file<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<Vector3<f64>>>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Could not open tract file {}", path.display()))?;
    read_tracts(BufReader::new(file)).with_context(|| format!("Could not read tract file {}", path.display()))
}

pub fn read_tracts<R: BufRead>(read: R) -> Result<Vec<Vec<Vector3<f64>>>> {
    let mut tracts = vec![];
    for (index, line) in read.lines().enumerate() {
        let line = line.with_context(|| format!("ReadError in line {}.", index + 1))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let values = line
            .split_whitespace()
            .map(|field| {
                field
                    .parse::<f64>()
                    .with_context(|| format!("ParseError in line {}: expected f64 found '{}'.", index + 1, field))
            })
            .collect::<Result<Vec<_>>>()?;
        if values.len() % 3 != 0 {
            bail!(
                "Line {} holds {} values, which is not a multiple of three",
                index + 1,
                values.len()
            );
        }
        tracts.push(values.chunks_exact(3).map(Vector3::from_column_slice).collect());
    }
    Ok(tracts)
}

/// Writes `tracts` to the file at `path`, one tract per line
pub fn write_tracts_file<P: AsRef<Path>>(path: P, tracts: &[Vec<Vector3<f64>>]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Could not create tract file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_tracts(&mut writer, tracts)?;
    writer.flush()?;
    Ok(())
}

pub fn write_tracts<W: Write>(mut write: W, tracts: &[Vec<Vector3<f64>>]) -> Result<()> {
    for tract in tracts {
        writeln!(
            write,
            "{}",
            tract.iter().flat_map(|p| p.iter().cloned().collect_vec()).join(" ")
        )?;
    }
    Ok(())
}
