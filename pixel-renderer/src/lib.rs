//! # PixelPals Renderer
//!
//! Software rasterizer that turns a [`Grid`] into pixels.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────┐    ┌──────────────┐    ┌──────────────┐
//! │   Grid   │ -> │ GridRenderer │ -> │  RgbaImage   │ -> PNG
//! └──────────┘    │ cells + lines│    └──────────────┘
//!                 └──────────────┘           │
//!                                     ┌──────────────┐
//!                                     │ RenderTarget │ (FrameBuffer)
//!                                     └──────────────┘
//! ```
//!
//! Output is a pure function of the grid and cell size, so frames can be
//! compared pixel for pixel.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod export;
pub mod target;

pub use error::{RenderError, RenderResult};
pub use export::encode_png;
pub use image::{Rgba, RgbaImage};
pub use target::{FrameBuffer, RenderTarget};

use pixel_core::Grid;

/// Grid line alpha, 0.03 scaled to 0..=255 and rounded.
pub const GRID_LINE_ALPHA: u8 = 8;

/// Grid line color before blending.
pub const GRID_LINE_COLOR: [u8; 3] = [255, 255, 255];

/// Draws grids as filled cells with a faint line overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridRenderer {
    cell_size: u32,
}

impl GridRenderer {
    /// Create a renderer for the given cell edge length.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ZeroCellSize`] for a zero cell size.
    pub fn new(cell_size: u32) -> RenderResult<Self> {
        if cell_size == 0 {
            return Err(RenderError::ZeroCellSize);
        }
        Ok(Self { cell_size })
    }

    /// Cell edge length in pixels.
    #[must_use]
    pub const fn cell_size(&self) -> u32 {
        self.cell_size
    }

    /// Image size in pixels for a grid, as `(width, height)`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::FrameTooLarge`] when the size overflows `u32`.
    pub fn frame_size(&self, grid: &Grid) -> RenderResult<(u32, u32)> {
        let (rows, cols) = grid.dimensions();
        let too_large = || RenderError::FrameTooLarge {
            rows,
            cols,
            cell_size: self.cell_size,
        };
        let width = u32::try_from(cols)
            .ok()
            .and_then(|c| c.checked_mul(self.cell_size))
            .ok_or_else(too_large)?;
        let height = u32::try_from(rows)
            .ok()
            .and_then(|r| r.checked_mul(self.cell_size))
            .ok_or_else(too_large)?;
        Ok((width, height))
    }

    /// Redraw every cell and the grid line overlay.
    ///
    /// # Errors
    ///
    /// Returns an error when the frame size overflows.
    pub fn render(&self, grid: &Grid) -> RenderResult<RgbaImage> {
        let (width, height) = self.frame_size(grid)?;
        let mut image = RgbaImage::new(width, height);

        for (row_index, row) in grid.rows().enumerate() {
            for (col_index, color) in row.iter().enumerate() {
                let pixel = Rgba(color.to_rgba());
                // frame_size already proved these products fit in u32.
                let x0 = u32::try_from(col_index).unwrap_or(u32::MAX) * self.cell_size;
                let y0 = u32::try_from(row_index).unwrap_or(u32::MAX) * self.cell_size;
                for y in y0..y0 + self.cell_size {
                    for x in x0..x0 + self.cell_size {
                        image.put_pixel(x, y, pixel);
                    }
                }
            }
        }

        self.draw_grid_lines(&mut image);
        tracing::trace!(width, height, "rendered grid frame");
        Ok(image)
    }

    /// Render and encode as PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    pub fn render_png(&self, grid: &Grid) -> RenderResult<Vec<u8>> {
        let image = self.render(grid)?;
        encode_png(&image)
    }

    /// Whether pixel offset `p` lies on a line in an axis of length `extent`.
    ///
    /// Lines sit at every multiple of the cell size. The line at the far
    /// edge falls outside the image and is clamped to the last pixel.
    fn on_line(&self, p: u32, extent: u32) -> bool {
        p % self.cell_size == 0 || (extent > 0 && p == extent - 1 && extent % self.cell_size == 0)
    }

    fn draw_grid_lines(&self, image: &mut RgbaImage) {
        let (width, height) = image.dimensions();
        for y in 0..height {
            let row_line = self.on_line(y, height);
            for x in 0..width {
                if row_line || self.on_line(x, width) {
                    let pixel = image.get_pixel_mut(x, y);
                    *pixel = blend_line(*pixel);
                }
            }
        }
    }
}

impl Default for GridRenderer {
    fn default() -> Self {
        Self {
            cell_size: pixel_core::CanvasConfig::default().cell_size,
        }
    }
}

/// Blend the grid line color over an opaque pixel, once per pixel.
fn blend_line(dst: Rgba<u8>) -> Rgba<u8> {
    let a = u32::from(GRID_LINE_ALPHA);
    let mix = |src: u8, dst: u8| {
        let value = (u32::from(src) * a + u32::from(dst) * (255 - a) + 127) / 255;
        u8::try_from(value).unwrap_or(u8::MAX)
    };
    Rgba([
        mix(GRID_LINE_COLOR[0], dst[0]),
        mix(GRID_LINE_COLOR[1], dst[1]),
        mix(GRID_LINE_COLOR[2], dst[2]),
        dst[3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixel_core::Color;

    #[test]
    fn test_zero_cell_size_rejected() {
        assert!(matches!(GridRenderer::new(0), Err(RenderError::ZeroCellSize)));
    }

    #[test]
    fn test_frame_size_matches_default_canvas() {
        let grid = pixel_core::CanvasConfig::default().blank_grid().expect("grid");
        let renderer = GridRenderer::default();
        assert_eq!(renderer.frame_size(&grid).expect("size"), (800, 600));
    }

    #[test]
    fn test_blend_over_background() {
        let bg = Rgba(Color::background().to_rgba());
        assert_eq!(blend_line(bg), Rgba([16, 25, 45, 255]));
    }

    #[test]
    fn test_blend_saturates_white() {
        let white = Rgba([255, 255, 255, 255]);
        assert_eq!(blend_line(white), white);
    }

    #[test]
    fn test_line_positions() {
        let renderer = GridRenderer::new(4).expect("renderer");
        let lines: Vec<u32> = (0..12).filter(|&p| renderer.on_line(p, 12)).collect();
        assert_eq!(lines, vec![0, 4, 8, 11]);
    }
}
