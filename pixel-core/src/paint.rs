//! Paint engine: turns a brush application into cell mutations.
//!
//! The footprint is a square of half-width `floor(size / 2)` around the
//! center cell, clipped to the grid. Painting is idempotent, and a center
//! outside the grid is a silent no-op because drags routinely leave the
//! canvas.

use std::collections::BTreeSet;

use crate::{BrushState, CellPosition, Color, Grid, GridStore};

/// Paint a square footprint and return the cells whose color changed.
///
/// `erasing` writes the background color and ignores `color`.
#[must_use]
pub fn paint_at(
    grid: &mut Grid,
    center_row: i64,
    center_col: i64,
    color: &Color,
    brush_size: u32,
    erasing: bool,
) -> BTreeSet<CellPosition> {
    let mut changed = BTreeSet::new();
    let (rows, cols) = grid.dimensions();
    let (Ok(row), Ok(col)) = (usize::try_from(center_row), usize::try_from(center_col)) else {
        return changed;
    };
    if row >= rows || col >= cols {
        return changed;
    }

    let background = Color::background();
    let target = if erasing { &background } else { color };
    let half = (brush_size / 2) as usize;

    let row_range = row.saturating_sub(half)..=(row + half).min(rows - 1);
    for r in row_range {
        for c in col.saturating_sub(half)..=(col + half).min(cols - 1) {
            // Both ranges are clipped, so the write cannot fail.
            if matches!(grid.set(r, c, target), Ok(true)) {
                changed.insert(CellPosition::new(r, c));
            }
        }
    }
    changed
}

/// Applies the current brush to a grid store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaintEngine {
    brush: BrushState,
}

impl PaintEngine {
    /// Create an engine with the given brush.
    #[must_use]
    pub fn new(brush: BrushState) -> Self {
        Self { brush }
    }

    /// Current brush.
    #[must_use]
    pub const fn brush(&self) -> &BrushState {
        &self.brush
    }

    /// Mutable brush access for UI controls.
    pub fn brush_mut(&mut self) -> &mut BrushState {
        &mut self.brush
    }

    /// Paint at a cell with the current brush.
    pub fn paint(
        &self,
        store: &mut GridStore,
        center_row: i64,
        center_col: i64,
    ) -> BTreeSet<CellPosition> {
        let changed = paint_at(
            store.grid_mut(),
            center_row,
            center_col,
            self.brush.color(),
            self.brush.size(),
            self.brush.erasing(),
        );
        if !changed.is_empty() {
            tracing::trace!(
                row = center_row,
                col = center_col,
                cells = changed.len(),
                "painted"
            );
        }
        changed
    }
}
