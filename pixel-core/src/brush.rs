//! Brush state: color, size and erase mode.
//!
//! Local-only. Never persisted or synchronized.

use serde::{Deserialize, Serialize};

use crate::Color;

/// Smallest brush size in cells.
pub const MIN_BRUSH_SIZE: u32 = 1;

/// Largest brush size in cells.
pub const MAX_BRUSH_SIZE: u32 = 20;

/// Brush size on startup.
pub const DEFAULT_BRUSH_SIZE: u32 = 2;

/// Current brush settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrushState {
    color: Color,
    size: u32,
    erasing: bool,
}

impl Default for BrushState {
    fn default() -> Self {
        Self {
            color: Color::parse("#ffffff").unwrap_or_default(),
            size: DEFAULT_BRUSH_SIZE,
            erasing: false,
        }
    }
}

impl BrushState {
    /// Create a brush with the given color and size.
    #[must_use]
    pub fn new(color: Color, size: u32) -> Self {
        Self {
            color,
            size: clamp_size(size),
            erasing: false,
        }
    }

    /// Selected paint color.
    #[must_use]
    pub const fn color(&self) -> &Color {
        &self.color
    }

    /// Brush size in cells.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Whether the eraser is active.
    #[must_use]
    pub const fn erasing(&self) -> bool {
        self.erasing
    }

    /// Half-width of the square footprint.
    #[must_use]
    pub const fn half_width(&self) -> u32 {
        self.size / 2
    }

    /// Select a paint color.
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Set the brush size, clamped to `MIN_BRUSH_SIZE..=MAX_BRUSH_SIZE`.
    pub fn set_size(&mut self, size: u32) {
        self.size = clamp_size(size);
    }

    /// Turn the eraser on or off.
    pub fn set_erasing(&mut self, erasing: bool) {
        self.erasing = erasing;
    }

    /// Flip erase mode, returning the new value.
    pub fn toggle_erase(&mut self) -> bool {
        self.erasing = !self.erasing;
        self.erasing
    }

    /// Color actually written by the next stroke.
    #[must_use]
    pub fn effective_color(&self) -> Color {
        if self.erasing {
            Color::background()
        } else {
            self.color.clone()
        }
    }
}

fn clamp_size(size: u32) -> u32 {
    size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_brush() {
        let brush = BrushState::default();
        assert_eq!(brush.size(), 2);
        assert_eq!(brush.half_width(), 1);
        assert!(!brush.erasing());
    }

    #[test]
    fn test_size_is_clamped() {
        let mut brush = BrushState::default();
        brush.set_size(0);
        assert_eq!(brush.size(), MIN_BRUSH_SIZE);
        brush.set_size(500);
        assert_eq!(brush.size(), MAX_BRUSH_SIZE);
    }

    #[test]
    fn test_toggle_erase_switches_effective_color() {
        let mut brush = BrushState::new(Color::parse("#FF0000").expect("valid"), 3);
        assert_eq!(brush.effective_color().as_str(), "#FF0000");
        assert!(brush.toggle_erase());
        assert!(brush.effective_color().is_background());
        assert!(!brush.toggle_erase());
    }
}
