use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::{bail, Context, Result};
use facet_core::nalgebra::Point3;
use facet_core::points::PointSet;
use itertools::Itertools;
use log::warn;

/// File extension of ungrouped point files (`x y z r g b` per line)
pub const POINTS_EXTENSION: &str = "points";
/// File extension of grouped point files (`x y z r g b group` per line)
pub const GROUPS_EXTENSION: &str = "groups";

/// Returns true if `path` has the extension of grouped point files
pub fn is_groups_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .map_or(false, |extension| extension == GROUPS_EXTENSION)
}

/// Reads a `.points` or `.groups` file. Files with the `.groups` extension are read as grouped, all other files
/// as ungrouped.
///
/// # Errors
///
/// If the file can't be opened or one of its lines can't be parsed
pub fn read_points_file<P: AsRef<Path>>(path: P) -> Result<PointSet> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Could not open point file {}", path.display()))?;
    read_points(BufReader::new(file), is_groups_file(path))
        .with_context(|| format!("Could not read point file {}", path.display()))
}

/// Reads points from `read`, one point per line. Fields are separated by any whitespace, blank lines and lines
/// starting with `#` are skipped. A line holds three coordinates, up to three colour channels in `[0, 1]` and, if
/// `grouped` is set, a trailing group id. Missing colour channels repeat the first channel, points without any
/// colour are white
pub fn read_points<R: BufRead>(read: R, grouped: bool) -> Result<PointSet> {
    let mut set = if grouped {
        PointSet::new_grouped()
    } else {
        PointSet::new()
    };
    for (index, line) in read.lines().enumerate() {
        let line = line.with_context(|| format!("ReadError in line {}.", index + 1))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (position, color, group) =
            parse_line(line, grouped).with_context(|| format!("ParseError in line {}.", index + 1))?;
        set.push(position, color, group);
    }
    Ok(set)
}

fn parse_line(line: &str, grouped: bool) -> Result<(Point3<f64>, [f32; 3], Option<usize>)> {
    let mut fields: Vec<&str> = line.split_whitespace().collect();
    let group = if grouped {
        let field = match fields.pop() {
            Some(field) => field,
            None => bail!("Expected a group id"),
        };
        Some(parse_group(field)?)
    } else {
        None
    };

    if fields.len() < 3 {
        bail!("Expected three coordinates, found {} fields", fields.len());
    }
    if fields.len() > 6 {
        bail!("Expected at most three colour channels, found {}", fields.len() - 3);
    }
    let mut coordinates = [0.0; 3];
    for (coordinate, field) in coordinates.iter_mut().zip(&fields[..3]) {
        *coordinate = field
            .parse()
            .with_context(|| format!("ParseError expected f64 found '{}'.", field))?;
    }
    let channels = fields[3..]
        .iter()
        .map(|field| {
            field
                .parse::<f32>()
                .with_context(|| format!("ParseError expected f32 found '{}'.", field))
        })
        .collect::<Result<Vec<_>>>()?;
    let color = match channels.as_slice() {
        [] => [1.0, 1.0, 1.0],
        [r] => [*r, *r, *r],
        [r, g] => [*r, *g, *r],
        [r, g, b, ..] => [*r, *g, *b],
    };

    Ok((
        Point3::new(coordinates[0], coordinates[1], coordinates[2]),
        color,
        group,
    ))
}

/// Group ids are written as integers, but some producers write them as floating point numbers
fn parse_group(field: &str) -> Result<usize> {
    if let Ok(group) = field.parse::<usize>() {
        return Ok(group);
    }
    let value: f64 = field
        .parse()
        .with_context(|| format!("ParseError expected group id found '{}'.", field))?;
    if value < 0.0 || value.fract() != 0.0 || !value.is_finite() {
        bail!("Group id must be a non-negative integer, found '{}'", field);
    }
    Ok(value as usize)
}

/// Writes `set` to the file at `path`, which is created or overwritten. Grouped sets get a trailing group id on
/// every line.
///
/// # Errors
///
/// If `path` cannot be created or overwritten, or if writing fails
pub fn write_points_file<P: AsRef<Path>>(path: P, set: &PointSet) -> Result<()> {
    let path = path.as_ref();
    if set.is_grouped() != is_groups_file(path) {
        warn!(
            "Writing {} points to {}, which has the extension of {} point files",
            if set.is_grouped() { "grouped" } else { "ungrouped" },
            path.display(),
            if set.is_grouped() { "ungrouped" } else { "grouped" },
        );
    }
    let file = File::create(path).with_context(|| format!("Could not create point file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_points(&mut writer, set)?;
    writer.flush()?;
    Ok(())
}

/// Writes `set` to `write`, one tab-delimited point per line
pub fn write_points<W: Write>(mut write: W, set: &PointSet) -> Result<()> {
    for index in 0..set.len() {
        let position = set.position(index);
        let color = set.color(index);
        let mut line = [position.x, position.y, position.z]
            .iter()
            .map(|v| v.to_string())
            .chain(color.iter().map(|c| c.to_string()))
            .join("\t");
        if let Some(group) = set.group(index) {
            line.push('\t');
            line.push_str(&group.to_string());
        }
        writeln!(write, "{}", line)?;
    }
    Ok(())
}
