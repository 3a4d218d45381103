//! Render targets that receive whole-grid redraws.

use pixel_core::Grid;

use crate::{GridRenderer, RenderResult, RgbaImage};

/// Something the session can redraw the grid onto.
pub trait RenderTarget: Send {
    /// Redraw the full grid.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be produced.
    fn render(&mut self, grid: &Grid) -> RenderResult<()>;
}

/// Off-screen target that keeps the most recent frame.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    renderer: GridRenderer,
    frame: Option<RgbaImage>,
    frame_count: u64,
}

impl FrameBuffer {
    /// Create an empty frame buffer.
    #[must_use]
    pub const fn new(renderer: GridRenderer) -> Self {
        Self {
            renderer,
            frame: None,
            frame_count: 0,
        }
    }

    /// The last rendered frame, if any.
    #[must_use]
    pub const fn frame(&self) -> Option<&RgbaImage> {
        self.frame.as_ref()
    }

    /// Number of frames rendered so far.
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(GridRenderer::default())
    }
}

impl RenderTarget for FrameBuffer {
    fn render(&mut self, grid: &Grid) -> RenderResult<()> {
        self.frame = Some(self.renderer.render(grid)?);
        self.frame_count += 1;
        Ok(())
    }
}
