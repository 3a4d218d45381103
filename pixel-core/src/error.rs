//! Error types for canvas operations.

use thiserror::Error;

/// Result type for canvas operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Errors raised by the grid store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// A cell coordinate fell outside `[0, rows) x [0, cols)`.
    #[error("Cell ({row}, {col}) is outside the {rows}x{cols} grid")]
    OutOfBounds {
        /// Requested row.
        row: usize,
        /// Requested column.
        col: usize,
        /// Grid row count.
        rows: usize,
        /// Grid column count.
        cols: usize,
    },

    /// An incoming grid did not match the store's fixed dimensions.
    #[error("Grid dimensions {actual_rows}x{actual_cols} do not match expected {expected_rows}x{expected_cols}")]
    DimensionMismatch {
        /// Expected row count.
        expected_rows: usize,
        /// Expected column count.
        expected_cols: usize,
        /// Incoming row count.
        actual_rows: usize,
        /// Incoming column count.
        actual_cols: usize,
    },

    /// A grid had no rows or no columns.
    #[error("Grid must have at least one row and one column")]
    Empty,

    /// A grid row had a different length from the first row.
    #[error("Row {row} has {len} cells, expected {expected}")]
    Ragged {
        /// Offending row index.
        row: usize,
        /// Its length.
        len: usize,
        /// Length of row 0.
        expected: usize,
    },
}

/// Errors that can occur in canvas operations.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// A color token was not a valid hex color.
    #[error("Invalid color token: {0:?}")]
    InvalidColor(String),

    /// Grid store error.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// Canvas configuration produced an unusable grid.
    #[error("Invalid canvas configuration: {0}")]
    InvalidConfig(String),

    /// Document serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
