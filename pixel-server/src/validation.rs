//! Input validation for untrusted documents.
//!
//! Grid shape and color tokens are already enforced when a
//! [`CanvasDocument`] is deserialized. This module adds the limits that
//! depend on server configuration.

use pixel_core::{CanvasDocument, Grid};
use thiserror::Error;

/// Maximum length for the `updatedBy` origin tag (an email plus a session suffix).
pub const MAX_UPDATED_BY_LEN: usize = 320;
/// Maximum cells per grid.
pub const MAX_GRID_CELLS: usize = 1_000_000;
/// Maximum request body for a document write.
pub const MAX_DOCUMENT_BYTES: usize = 16 * 1_048_576;
/// Maximum inbound WebSocket message size.
pub const MAX_WS_MESSAGE_SIZE: usize = 4096;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// `updatedBy` was empty or blank.
    #[error("updatedBy must not be empty")]
    UpdatedByEmpty,
    /// `updatedBy` exceeds [`MAX_UPDATED_BY_LEN`].
    #[error("updatedBy too long (max {MAX_UPDATED_BY_LEN} chars)")]
    UpdatedByTooLong,
    /// `updatedBy` contains control characters.
    #[error("updatedBy contains invalid characters")]
    UpdatedByInvalidChars,
    /// Grid exceeds [`MAX_GRID_CELLS`].
    #[error("grid too large ({cells} cells, max {MAX_GRID_CELLS})")]
    GridTooLarge {
        /// Cell count of the rejected grid.
        cells: usize,
    },
    /// Grid does not have the dimensions this server is configured for.
    #[error("grid is {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    DimensionMismatch {
        /// Incoming rows.
        rows: usize,
        /// Incoming columns.
        cols: usize,
        /// Configured rows.
        expected_rows: usize,
        /// Configured columns.
        expected_cols: usize,
    },
    /// WebSocket message exceeds [`MAX_WS_MESSAGE_SIZE`].
    #[error("message too large (max {MAX_WS_MESSAGE_SIZE} bytes)")]
    MessageTooLarge,
}

impl ValidationError {
    /// Short label used for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UpdatedByEmpty | Self::UpdatedByTooLong | Self::UpdatedByInvalidChars => {
                "updated_by"
            }
            Self::GridTooLarge { .. } => "grid_size",
            Self::DimensionMismatch { .. } => "dimensions",
            Self::MessageTooLarge => "ws_message",
        }
    }
}

/// Validate a writer's origin tag.
///
/// # Errors
///
/// Returns [`ValidationError::UpdatedByEmpty`] for blank tags,
/// [`ValidationError::UpdatedByTooLong`] past [`MAX_UPDATED_BY_LEN`] chars and
/// [`ValidationError::UpdatedByInvalidChars`] if it contains control characters.
pub fn validate_updated_by(tag: &str) -> Result<(), ValidationError> {
    if tag.trim().is_empty() {
        return Err(ValidationError::UpdatedByEmpty);
    }
    if tag.chars().count() > MAX_UPDATED_BY_LEN {
        return Err(ValidationError::UpdatedByTooLong);
    }
    if tag.chars().any(char::is_control) {
        return Err(ValidationError::UpdatedByInvalidChars);
    }
    Ok(())
}

/// Validate grid size, and shape when `expected` is set.
///
/// # Errors
///
/// Returns [`ValidationError::GridTooLarge`] or
/// [`ValidationError::DimensionMismatch`].
pub fn validate_grid(grid: &Grid, expected: Option<(usize, usize)>) -> Result<(), ValidationError> {
    let (rows, cols) = grid.dimensions();
    let cells = rows.saturating_mul(cols);
    if cells > MAX_GRID_CELLS {
        return Err(ValidationError::GridTooLarge { cells });
    }
    if let Some((expected_rows, expected_cols)) = expected {
        if (rows, cols) != (expected_rows, expected_cols) {
            return Err(ValidationError::DimensionMismatch {
                rows,
                cols,
                expected_rows,
                expected_cols,
            });
        }
    }
    Ok(())
}

/// Validate a whole incoming document.
///
/// # Errors
///
/// See [`validate_updated_by`] and [`validate_grid`].
pub fn validate_document(
    document: &CanvasDocument,
    expected: Option<(usize, usize)>,
) -> Result<(), ValidationError> {
    validate_updated_by(&document.updated_by)?;
    validate_grid(&document.grid, expected)
}

/// Validate an inbound WebSocket text frame's size.
///
/// # Errors
///
/// Returns [`ValidationError::MessageTooLarge`] past [`MAX_WS_MESSAGE_SIZE`].
pub fn validate_message_size(text: &str) -> Result<(), ValidationError> {
    if text.len() > MAX_WS_MESSAGE_SIZE {
        return Err(ValidationError::MessageTooLarge);
    }
    Ok(())
}
