use std::{
    fmt, fs,
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use facet_core::matrix::SymmetricMatrix;
use itertools::Itertools;

/// Reasons why a cached distance matrix can't be used. All of them mean that the matrix has to be computed again
#[derive(Debug)]
pub enum CacheError {
    /// There is no cache file
    Missing(PathBuf),
    Io(io::Error),
    /// The file exists but does not hold a matrix
    Malformed(String),
    /// The matrix was computed for a different number of tracts
    Stale { expected: usize, found: usize },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Missing(path) => write!(f, "No matrix cache at {}", path.display()),
            CacheError::Io(err) => write!(f, "IO error: {}", err),
            CacheError::Malformed(msg) => write!(f, "Malformed matrix cache: {}", msg),
            CacheError::Stale { expected, found } => write!(
                f,
                "Matrix cache holds distances of {} tracts, expected {}",
                found, expected
            ),
        }
    }
}

impl std::error::Error for CacheError {}

impl From<io::Error> for CacheError {
    fn from(err: io::Error) -> Self {
        CacheError::Io(err)
    }
}

/// Path of the distance matrix cache next to the tract file at `tracts_path`. The name contains the metric and the
/// proximity threshold, so matrices computed with different settings don't replace each other
/// ```
/// # use facet_io::matrix_cache::matrix_cache_path;
/// let path = matrix_cache_path("data/tracts.txt", "dlt", 1.5);
/// assert_eq!(path.to_str(), Some("data/tracts.txt.dlt_1.5.matrix"));
/// ```
pub fn matrix_cache_path<P: AsRef<Path>>(tracts_path: P, metric: &str, proximity_threshold: f64) -> PathBuf {
    let mut name = tracts_path.as_ref().as_os_str().to_owned();
    name.push(format!(".{}_{}.matrix", metric, proximity_threshold));
    PathBuf::from(name)
}

/// Loads a matrix written by [save_matrix_cache]. The cache is only valid if it was computed for
/// `expected_count` tracts
pub fn load_matrix_cache<P: AsRef<Path>>(
    path: P,
    expected_count: usize,
) -> std::result::Result<SymmetricMatrix, CacheError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => CacheError::Missing(path.to_path_buf()),
        _ => CacheError::Io(err),
    })?;

    let mut values = content
        .split_whitespace()
        .map(|field| {
            field
                .parse::<f64>()
                .map_err(|_| CacheError::Malformed(format!("'{}' is not a number", field)))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let count = match values.pop() {
        Some(count) if count >= 0.0 && count.fract() == 0.0 => count as usize,
        Some(count) => {
            return Err(CacheError::Malformed(format!(
                "Trailing tract count {} is not a non-negative integer",
                count
            )))
        }
        None => return Err(CacheError::Malformed("File is empty".into())),
    };
    if count != expected_count {
        return Err(CacheError::Stale {
            expected: expected_count,
            found: count,
        });
    }

    let cells = values.len();
    SymmetricMatrix::from_upper_triangle(count, values).ok_or_else(|| {
        CacheError::Malformed(format!(
            "Expected {} distances for {} tracts, found {}",
            SymmetricMatrix::cell_count(count),
            count,
            cells
        ))
    })
}

/// Writes the upper triangle of `matrix` row by row, followed by the matrix size on the last line
pub fn save_matrix_cache<P: AsRef<Path>>(path: P, matrix: &SymmetricMatrix) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Could not create matrix cache {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let size = matrix.size();
    let mut offset = 0;
    for row in 0..size.saturating_sub(1) {
        let row_length = size - row - 1;
        let cells = &matrix.upper_triangle()[offset..offset + row_length];
        writeln!(writer, "{}", cells.iter().join(" "))?;
        offset += row_length;
    }
    writeln!(writer, "{}", size)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> SymmetricMatrix {
        SymmetricMatrix::from_upper_triangle(4, vec![1.0, 2.5, 3.0, 0.125, 4.0, 6.0]).unwrap()
    }

    #[test]
    fn test_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("cache.matrix");
        save_matrix_cache(&path, &matrix())?;
        assert_eq!(fs::read_to_string(&path)?, "1 2.5 3\n0.125 4\n6\n4\n");
        assert_eq!(load_matrix_cache(&path, 4)?, matrix());
        Ok(())
    }

    #[test]
    fn test_stale_and_missing_caches() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("cache.matrix");
        assert!(matches!(
            load_matrix_cache(&path, 4),
            Err(CacheError::Missing(_))
        ));

        save_matrix_cache(&path, &matrix())?;
        assert!(matches!(
            load_matrix_cache(&path, 5),
            Err(CacheError::Stale {
                expected: 5,
                found: 4
            })
        ));
        Ok(())
    }

    #[test]
    fn test_malformed_caches() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("cache.matrix");
        for content in &["", "1 2 x\n3\n", "1 2\n3\n", "1 2 3\n2.5\n"] {
            fs::write(&path, content)?;
            let result = load_matrix_cache(&path, 3);
            assert!(
                matches!(result, Err(CacheError::Malformed(_)) | Err(CacheError::Stale { .. })),
                "content {:?} gave {:?}",
                content,
                result
            );
        }
        // A single tract has no distances at all
        fs::write(&path, "1\n")?;
        assert_eq!(load_matrix_cache(&path, 1)?.size(), 1);
        Ok(())
    }
}
