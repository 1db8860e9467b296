//! Height-field grids.
//!
//! The denoiser reads and writes grids exclusively through the [`HeightGrid`]
//! and [`HeightGridMut`] traits, so any raster container can be plugged in by
//! implementing them. [`Grid`] is the owned implementation used by the file
//! readers and the CLI.
//!
//! Cells are addressed as `(x, y)` with `x` the column and `y` the row. Row 0
//! lies on the southern edge, next to the lower-left origin.

use ndarray::Array2;

use crate::error::{DenoiseError, Result};

/// Default no-data sentinel, as used by ESRI ASCII grids.
pub const DEFAULT_NO_DATA: f64 = -9999.0;

/// Read access to a rectangular grid of height samples.
pub trait HeightGrid {
    /// Number of columns.
    fn nx(&self) -> usize;

    /// Number of rows.
    fn ny(&self) -> usize;

    /// Edge length of a (square) cell.
    fn cell_size(&self) -> f64;

    /// Value of cell `(x, y)`. Meaningless for no-data cells.
    fn value(&self, x: usize, y: usize) -> f64;

    /// Whether cell `(x, y)` holds no data.
    fn is_no_data(&self, x: usize, y: usize) -> bool;

    /// The sentinel written to no-data cells.
    fn no_data_value(&self) -> f64;

    /// World coordinates of the lower-left grid corner.
    fn origin(&self) -> (f64, f64) {
        (0.0, 0.0)
    }

    /// Total number of cells.
    fn num_cells(&self) -> usize {
        self.nx() * self.ny()
    }
}

/// Write access to a rectangular grid of height samples.
pub trait HeightGridMut: HeightGrid {
    /// Store `value` in cell `(x, y)`.
    fn set_value(&mut self, x: usize, y: usize, value: f64);

    /// Mark cell `(x, y)` as no-data.
    fn set_no_data(&mut self, x: usize, y: usize);
}

/// An owned height grid stored row by row.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// Cell values indexed `[[y, x]]`.
    data: Array2<f64>,
    cell_size: f64,
    xll: f64,
    yll: f64,
    no_data: f64,
}

impl Grid {
    /// Create a grid filled with `value`.
    ///
    /// # Example
    /// ```
    /// use terrace::grid::{Grid, HeightGrid};
    ///
    /// let grid = Grid::filled(4, 3, 1.0, 10.0).unwrap();
    /// assert_eq!(grid.nx(), 4);
    /// assert_eq!(grid.ny(), 3);
    /// assert_eq!(grid.value(3, 2), 10.0);
    /// ```
    pub fn filled(nx: usize, ny: usize, cell_size: f64, value: f64) -> Result<Self> {
        validate_shape(nx, ny, cell_size)?;
        Ok(Self {
            data: Array2::from_elem((ny, nx), value),
            cell_size,
            xll: 0.0,
            yll: 0.0,
            no_data: DEFAULT_NO_DATA,
        })
    }

    /// Create a grid from row-major values (`data[x + y * nx]`).
    pub fn from_vec(nx: usize, ny: usize, cell_size: f64, data: Vec<f64>) -> Result<Self> {
        validate_shape(nx, ny, cell_size)?;
        if data.len() != nx * ny {
            return Err(DenoiseError::InvalidGrid(format!(
                "expected {} values for a {}x{} grid, got {}",
                nx * ny,
                nx,
                ny,
                data.len()
            )));
        }
        let data = Array2::from_shape_vec((ny, nx), data)
            .map_err(|e| DenoiseError::InvalidGrid(e.to_string()))?;
        Ok(Self {
            data,
            cell_size,
            xll: 0.0,
            yll: 0.0,
            no_data: DEFAULT_NO_DATA,
        })
    }

    /// Create an all-no-data grid with the geometry of `other`.
    pub fn like<G: HeightGrid + ?Sized>(other: &G) -> Self {
        let (xll, yll) = other.origin();
        let no_data = other.no_data_value();
        Self {
            data: Array2::from_elem((other.ny(), other.nx()), no_data),
            cell_size: other.cell_size(),
            xll,
            yll,
            no_data,
        }
    }

    /// Set the lower-left origin.
    pub fn with_origin(mut self, xll: f64, yll: f64) -> Self {
        self.xll = xll;
        self.yll = yll;
        self
    }

    /// Set the no-data sentinel. Existing cells are not rewritten.
    pub fn with_no_data(mut self, no_data: f64) -> Self {
        self.no_data = no_data;
        self
    }

    /// Number of cells holding data.
    pub fn valid_cells(&self) -> usize {
        self.data.iter().filter(|&&v| !self.is_sentinel(v)).count()
    }

    /// Smallest and largest valid value, or `None` for an all-no-data grid.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.data
            .iter()
            .copied()
            .filter(|&v| !self.is_sentinel(v))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Row-major view of all cell values.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().copied()
    }

    #[inline]
    fn is_sentinel(&self, v: f64) -> bool {
        v.is_nan() || v == self.no_data
    }
}

fn validate_shape(nx: usize, ny: usize, cell_size: f64) -> Result<()> {
    if nx == 0 || ny == 0 {
        return Err(DenoiseError::InvalidGrid(format!(
            "grid dimensions must be positive, got {}x{}",
            nx, ny
        )));
    }
    if !(cell_size.is_finite() && cell_size > 0.0) {
        return Err(DenoiseError::InvalidGrid(format!(
            "cell size must be positive, got {}",
            cell_size
        )));
    }
    Ok(())
}

impl HeightGrid for Grid {
    #[inline]
    fn nx(&self) -> usize {
        self.data.ncols()
    }

    #[inline]
    fn ny(&self) -> usize {
        self.data.nrows()
    }

    #[inline]
    fn cell_size(&self) -> f64 {
        self.cell_size
    }

    #[inline]
    fn value(&self, x: usize, y: usize) -> f64 {
        self.data[[y, x]]
    }

    #[inline]
    fn is_no_data(&self, x: usize, y: usize) -> bool {
        self.is_sentinel(self.data[[y, x]])
    }

    #[inline]
    fn no_data_value(&self) -> f64 {
        self.no_data
    }

    fn origin(&self) -> (f64, f64) {
        (self.xll, self.yll)
    }
}

impl HeightGridMut for Grid {
    #[inline]
    fn set_value(&mut self, x: usize, y: usize, value: f64) {
        self.data[[y, x]] = value;
    }

    #[inline]
    fn set_no_data(&mut self, x: usize, y: usize) {
        self.data[[y, x]] = self.no_data;
    }
}
