//! Pointer input for canvas interaction.
//!
//! Mouse and touch events are reduced to a [`PointerEvent`] carrying a phase
//! and a position in canvas pixels. [`PointerTracker`] keeps the drag state
//! and tells the caller which cell, if any, the event should paint.

use serde::{Deserialize, Serialize};

/// Phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Button pressed or finger down.
    Down,
    /// Pointer moved.
    Move,
    /// Button released or finger lifted.
    Up,
    /// Pointer left the canvas.
    Leave,
    /// Touch cancelled by the platform.
    Cancel,
}

/// A pointer event in canvas pixel coordinates.
///
/// Coordinates may be negative or beyond the canvas while dragging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Event phase.
    pub phase: PointerPhase,
    /// X offset from the canvas left edge, in pixels.
    pub x: f32,
    /// Y offset from the canvas top edge, in pixels.
    pub y: f32,
}

impl PointerEvent {
    /// Create a pointer event.
    #[must_use]
    pub const fn new(phase: PointerPhase, x: f32, y: f32) -> Self {
        Self { phase, x, y }
    }

    /// Build an event from the primary point of a touch list.
    ///
    /// Returns `None` for an empty touch list.
    #[must_use]
    pub fn from_touches(phase: PointerPhase, touches: &[(f32, f32)]) -> Option<Self> {
        touches.first().map(|&(x, y)| Self::new(phase, x, y))
    }

    /// Cell under the pointer, as signed `(row, col)`.
    ///
    /// Uses floor division so positions left of or above the canvas map to
    /// negative cells rather than cell zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn cell(&self, cell_size: u32) -> (i64, i64) {
        let size = f64::from(cell_size.max(1));
        let row = (f64::from(self.y) / size).floor() as i64;
        let col = (f64::from(self.x) / size).floor() as i64;
        (row, col)
    }
}

/// A cell coordinate inside the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellPosition {
    /// Row index.
    pub row: usize,
    /// Column index.
    pub col: usize,
}

impl CellPosition {
    /// Create a cell position.
    #[must_use]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Drag state for a single pointer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerTracker {
    drawing: bool,
}

impl PointerTracker {
    /// Create an idle tracker.
    #[must_use]
    pub const fn new() -> Self {
        Self { drawing: false }
    }

    /// Whether a drag is in progress.
    #[must_use]
    pub const fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// Advance the drag state and return the cell to paint, if any.
    pub fn handle(&mut self, event: &PointerEvent, cell_size: u32) -> Option<(i64, i64)> {
        match event.phase {
            PointerPhase::Down => {
                self.drawing = true;
                Some(event.cell(cell_size))
            }
            PointerPhase::Move if self.drawing => Some(event.cell(cell_size)),
            PointerPhase::Move => None,
            PointerPhase::Up | PointerPhase::Leave | PointerPhase::Cancel => {
                self.drawing = false;
                None
            }
        }
    }

    /// Abandon any drag in progress.
    pub fn reset(&mut self) {
        self.drawing = false;
    }
}
