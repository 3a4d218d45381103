//! Renderer error types.

use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The grid does not fit in an image buffer at this cell size.
    #[error("Frame of {cols}x{rows} cells at {cell_size}px is too large")]
    FrameTooLarge {
        /// Grid rows.
        rows: usize,
        /// Grid columns.
        cols: usize,
        /// Cell edge in pixels.
        cell_size: u32,
    },

    /// Cell size of zero.
    #[error("Cell size must be non-zero")]
    ZeroCellSize,

    /// Image encoding failed.
    #[error("Export failed: {0}")]
    Export(String),
}
