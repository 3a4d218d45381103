//! The pixel grid and its in-memory store.
//!
//! [`Grid`] is an immutable-dimension matrix of [`Color`] tokens stored
//! row-major. On the wire it is an array of arrays of color strings; ragged,
//! empty, or invalid-token payloads are rejected during deserialization so a
//! `Grid` value is always complete.
//!
//! [`GridStore`] owns the grid used for rendering and outgoing writes. Its
//! dimensions are fixed at construction and [`GridStore::replace_all`]
//! rejects grids of any other size.

use serde::{Deserialize, Serialize};

use crate::{CanvasError, Color, GridError};

/// Default canvas width in pixels.
const DEFAULT_WIDTH_PX: u32 = 800;

/// Default canvas height in pixels.
const DEFAULT_HEIGHT_PX: u32 = 600;

/// Default edge length of one cell in pixels.
const DEFAULT_CELL_SIZE: u32 = 8;

/// Pixel geometry of the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Canvas width in pixels.
    pub width_px: u32,
    /// Canvas height in pixels.
    pub height_px: u32,
    /// Edge length of one cell in pixels.
    pub cell_size: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width_px: DEFAULT_WIDTH_PX,
            height_px: DEFAULT_HEIGHT_PX,
            cell_size: DEFAULT_CELL_SIZE,
        }
    }
}

impl CanvasConfig {
    /// Grid dimensions as `(rows, cols)`, i.e. canvas size divided by cell size.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidConfig`] if the cell size is zero or
    /// larger than the canvas.
    pub fn dimensions(&self) -> Result<(usize, usize), CanvasError> {
        if self.cell_size == 0 {
            return Err(CanvasError::InvalidConfig("cell size must be non-zero".into()));
        }
        let rows = (self.height_px / self.cell_size) as usize;
        let cols = (self.width_px / self.cell_size) as usize;
        if rows == 0 || cols == 0 {
            return Err(CanvasError::InvalidConfig(format!(
                "{}x{} canvas holds no {}px cells",
                self.width_px, self.height_px, self.cell_size
            )));
        }
        Ok((rows, cols))
    }

    /// A grid of this configuration's size filled with the background color.
    ///
    /// # Errors
    ///
    /// See [`CanvasConfig::dimensions`].
    pub fn blank_grid(&self) -> Result<Grid, CanvasError> {
        let (rows, cols) = self.dimensions()?;
        Ok(Grid::filled(rows, cols, &Color::background()))
    }
}

/// A fixed-size matrix of cell colors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Color>>", into = "Vec<Vec<Color>>")]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Color>,
}

impl Grid {
    /// Create a `rows x cols` grid with every cell set to `color`.
    ///
    /// # Panics
    ///
    /// Panics if `rows` or `cols` is zero.
    #[must_use]
    pub fn filled(rows: usize, cols: usize, color: &Color) -> Self {
        assert!(rows > 0 && cols > 0, "grid dimensions must be non-zero");
        Self {
            rows,
            cols,
            cells: vec![color.clone(); rows * cols],
        }
    }

    /// Build a grid from nested rows.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Empty`] for zero rows or columns and
    /// [`GridError::Ragged`] when rows differ in length.
    pub fn from_rows(rows: Vec<Vec<Color>>) -> Result<Self, GridError> {
        let cols = rows.first().map_or(0, Vec::len);
        if cols == 0 {
            return Err(GridError::Empty);
        }
        let row_count = rows.len();
        let mut cells = Vec::with_capacity(row_count * cols);
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(GridError::Ragged {
                    row: index,
                    len: row.len(),
                    expected: cols,
                });
            }
            cells.extend(row);
        }
        Ok(Self {
            rows: row_count,
            cols,
            cells,
        })
    }

    /// Dimensions as `(rows, cols)`.
    #[must_use]
    pub const fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Whether `(row, col)` addresses a cell.
    #[must_use]
    pub const fn contains(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    /// Color at `(row, col)`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Result<&Color, GridError> {
        let index = self.index(row, col)?;
        Ok(&self.cells[index])
    }

    /// Set the color at `(row, col)`, returning whether the cell changed.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] outside the grid.
    pub fn set(&mut self, row: usize, col: usize, color: &Color) -> Result<bool, GridError> {
        let index = self.index(row, col)?;
        let cell = &mut self.cells[index];
        if *cell == *color {
            return Ok(false);
        }
        cell.clone_from(color);
        Ok(true)
    }

    /// Set every cell to `color`.
    pub fn fill(&mut self, color: &Color) {
        for cell in &mut self.cells {
            cell.clone_from(color);
        }
    }

    /// Iterate rows as slices.
    pub fn rows(&self) -> impl Iterator<Item = &[Color]> {
        self.cells.chunks(self.cols)
    }

    /// Copy out as nested rows.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<Color>> {
        self.rows().map(<[Color]>::to_vec).collect()
    }

    fn index(&self, row: usize, col: usize) -> Result<usize, GridError> {
        if self.contains(row, col) {
            Ok(row * self.cols + col)
        } else {
            Err(GridError::OutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            })
        }
    }
}

impl TryFrom<Vec<Vec<Color>>> for Grid {
    type Error = GridError;

    fn try_from(rows: Vec<Vec<Color>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<Grid> for Vec<Vec<Color>> {
    fn from(grid: Grid) -> Self {
        grid.to_rows()
    }
}

/// Single source of truth for the locally displayed grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridStore {
    grid: Grid,
}

impl GridStore {
    /// Create a store holding `grid`; its dimensions become permanent.
    #[must_use]
    pub fn new(grid: Grid) -> Self {
        Self { grid }
    }

    /// Create a background-filled store sized by `config`.
    ///
    /// # Errors
    ///
    /// See [`CanvasConfig::dimensions`].
    pub fn from_config(config: &CanvasConfig) -> Result<Self, CanvasError> {
        Ok(Self::new(config.blank_grid()?))
    }

    /// Color at `(row, col)`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Result<&Color, GridError> {
        self.grid.get(row, col)
    }

    /// Set one cell, returning whether it changed.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] outside the grid.
    pub fn set(&mut self, row: usize, col: usize, color: &Color) -> Result<bool, GridError> {
        self.grid.set(row, col, color)
    }

    /// Replace the whole grid.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::DimensionMismatch`] if `grid` is not exactly the
    /// store's size; the current contents are left untouched.
    pub fn replace_all(&mut self, grid: Grid) -> Result<(), GridError> {
        let (expected_rows, expected_cols) = self.grid.dimensions();
        let (actual_rows, actual_cols) = grid.dimensions();
        if (expected_rows, expected_cols) != (actual_rows, actual_cols) {
            return Err(GridError::DimensionMismatch {
                expected_rows,
                expected_cols,
                actual_rows,
                actual_cols,
            });
        }
        self.grid = grid;
        Ok(())
    }

    /// Reset every cell to the background color.
    pub fn clear(&mut self) {
        self.grid.fill(&Color::background());
    }

    /// Dimensions as `(rows, cols)`.
    #[must_use]
    pub const fn dimensions(&self) -> (usize, usize) {
        self.grid.dimensions()
    }

    /// Borrow the current grid.
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Mutable access for the paint engine.
    pub(crate) fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    /// Clone the current grid for an outgoing write.
    #[must_use]
    pub fn snapshot(&self) -> Grid {
        self.grid.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> Color {
        Color::parse("#FF0000").expect("valid")
    }

    #[test]
    fn test_default_config_dimensions() {
        let config = CanvasConfig::default();
        assert_eq!(config.dimensions().expect("valid config"), (75, 100));
    }

    #[test]
    fn test_config_rejects_zero_cell_size() {
        let config = CanvasConfig {
            cell_size: 0,
            ..CanvasConfig::default()
        };
        assert!(config.dimensions().is_err());
    }

    #[test]
    fn test_config_rejects_oversized_cells() {
        let config = CanvasConfig {
            width_px: 4,
            height_px: 4,
            cell_size: 8,
        };
        assert!(config.blank_grid().is_err());
    }

    #[test]
    fn test_blank_grid_is_background() {
        let grid = CanvasConfig::default().blank_grid().expect("valid config");
        assert!(grid.rows().flatten().all(Color::is_background));
    }

    #[test]
    fn test_get_and_set() {
        let mut store = GridStore::new(Grid::filled(3, 4, &Color::background()));
        assert!(store.set(2, 3, &red()).expect("in bounds"));
        assert_eq!(store.get(2, 3).expect("in bounds"), &red());
        // Writing the same color is not a change.
        assert!(!store.set(2, 3, &red()).expect("in bounds"));
    }

    #[test]
    fn test_out_of_bounds_is_an_error_not_a_write() {
        let mut store = GridStore::new(Grid::filled(3, 4, &Color::background()));
        let before = store.snapshot();
        assert!(matches!(
            store.set(3, 0, &red()),
            Err(GridError::OutOfBounds { row: 3, col: 0, .. })
        ));
        assert!(store.get(0, 4).is_err());
        assert_eq!(store.grid(), &before);
    }

    #[test]
    fn test_replace_all_rejects_mismatched_dimensions() {
        let mut store = GridStore::new(Grid::filled(3, 4, &Color::background()));
        let result = store.replace_all(Grid::filled(4, 3, &red()));
        assert_eq!(
            result,
            Err(GridError::DimensionMismatch {
                expected_rows: 3,
                expected_cols: 4,
                actual_rows: 4,
                actual_cols: 3,
            })
        );
        assert!(store.grid().rows().flatten().all(Color::is_background));
    }

    #[test]
    fn test_replace_all_accepts_matching_dimensions() {
        let mut store = GridStore::new(Grid::filled(3, 4, &Color::background()));
        store
            .replace_all(Grid::filled(3, 4, &red()))
            .expect("same size");
        assert_eq!(store.get(1, 1).expect("in bounds"), &red());
    }

    #[test]
    fn test_clear_restores_background() {
        let mut store = GridStore::new(Grid::filled(2, 2, &red()));
        store.clear();
        assert!(store.grid().rows().flatten().all(Color::is_background));
    }

    #[test]
    fn test_from_rows_rejects_ragged_and_empty() {
        let bg = Color::background();
        assert_eq!(Grid::from_rows(vec![]), Err(GridError::Empty));
        assert_eq!(Grid::from_rows(vec![vec![]]), Err(GridError::Empty));
        assert_eq!(
            Grid::from_rows(vec![vec![bg.clone(), bg.clone()], vec![bg]]),
            Err(GridError::Ragged {
                row: 1,
                len: 1,
                expected: 2
            })
        );
    }

    #[test]
    fn test_wire_shape_is_nested_arrays() {
        let mut grid = Grid::filled(2, 2, &Color::background());
        grid.set(0, 1, &red()).expect("in bounds");
        let json = serde_json::to_string(&grid).expect("should serialize");
        assert_eq!(
            json,
            r##"[["#081226","#FF0000"],["#081226","#081226"]]"##
        );
        let back: Grid = serde_json::from_str(&json).expect("should parse");
        assert_eq!(back, grid);
    }

    #[test]
    fn test_deserialize_rejects_invalid_cells() {
        assert!(serde_json::from_str::<Grid>(r##"[["#000000", null]]"##).is_err());
        assert!(serde_json::from_str::<Grid>(r##"[["#000000"], ["#000000", "#111111"]]"##).is_err());
        assert!(serde_json::from_str::<Grid>("[]").is_err());
    }
}
