/// Symmetric `n x n` matrix with an implicit zero diagonal. Only the strictly upper triangle is stored, so every
/// unordered pair `(i, j)` owns exactly one cell
/// ```
/// # use facet_core::matrix::SymmetricMatrix;
/// let mut matrix = SymmetricMatrix::new(3);
/// matrix.set(2, 0, 4.5);
/// assert_eq!(matrix.get(0, 2), 4.5);
/// assert_eq!(matrix.get(1, 1), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetricMatrix {
    size: usize,
    values: Vec<f64>,
}

impl SymmetricMatrix {
    /// Creates a zero matrix with `size` rows and columns
    pub fn new(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; Self::cell_count(size)],
        }
    }

    /// Creates a matrix from the row-major upper triangle values `(0,1), (0,2), ..., (1,2), ...`. Returns `None`
    /// if the number of values does not match `size`
    pub fn from_upper_triangle(size: usize, values: Vec<f64>) -> Option<Self> {
        if values.len() != Self::cell_count(size) {
            return None;
        }
        Some(Self { size, values })
    }

    /// Number of stored cells for a matrix with `size` rows
    pub fn cell_count(size: usize) -> usize {
        size * size.saturating_sub(1) / 2
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// The stored upper triangle in row-major order
    pub fn upper_triangle(&self) -> &[f64] {
        &self.values
    }

    fn index(&self, i: usize, j: usize) -> usize {
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        i * self.size - i * (i + 1) / 2 + (j - i - 1)
    }

    /// The value at `(i, j)`. Diagonal cells are always zero
    ///
    /// # Panics
    ///
    /// If `i` or `j` is out of bounds
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.check_bounds(i, j);
        if i == j {
            return 0.0;
        }
        self.values[self.index(i, j)]
    }

    /// Sets the value at `(i, j)`, which is the same cell as `(j, i)`
    ///
    /// # Panics
    ///
    /// If `i` or `j` is out of bounds or if `i == j`
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.check_bounds(i, j);
        if i == j {
            panic!("SymmetricMatrix::set: Diagonal cell ({}, {}) is not stored", i, j);
        }
        let index = self.index(i, j);
        self.values[index] = value;
    }

    /// Overwrites the cells `(row, row + 1), ..., (row, size - 1)` with `values`
    ///
    /// # Panics
    ///
    /// If `values` does not have exactly `size - row - 1` entries
    pub fn set_row_tail(&mut self, row: usize, values: &[f64]) {
        if row >= self.size || values.len() != self.size - row - 1 {
            panic!(
                "SymmetricMatrix::set_row_tail: Row {} of a {}x{} matrix needs {} values, got {}",
                row,
                self.size,
                self.size,
                self.size.saturating_sub(row + 1),
                values.len()
            );
        }
        if values.is_empty() {
            return;
        }
        let start = self.index(row, row + 1);
        self.values[start..start + values.len()].copy_from_slice(values);
    }

    fn check_bounds(&self, i: usize, j: usize) {
        if i >= self.size || j >= self.size {
            panic!(
                "SymmetricMatrix: Index ({}, {}) out of bounds for size {}",
                i, j, self.size
            );
        }
    }
}
