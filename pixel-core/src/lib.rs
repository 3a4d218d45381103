//! # PixelPals Core
//!
//! Core canvas logic for the shared pixel canvas.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 pixel-core                  │
//! ├─────────────────────────────────────────────┤
//! │  Grid Store      │  Paint Engine            │
//! │  - Color tokens  │  - Brush footprint       │
//! │  - Fixed dims    │  - Erase mode            │
//! │  - Wholesale     │  - Pointer tracking      │
//! │    replacement   │                          │
//! ├─────────────────────────────────────────────┤
//! │  Wire Format     │  Connection State        │
//! │  - CanvasDocument│  - Connected / Offline   │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod brush;
pub mod color;
pub mod document;
pub mod error;
pub mod event;
pub mod grid;
pub mod paint;
pub mod state;

pub use brush::{BrushState, DEFAULT_BRUSH_SIZE, MAX_BRUSH_SIZE, MIN_BRUSH_SIZE};
pub use color::{Color, BACKGROUND};
pub use document::{current_timestamp, CanvasDocument, FeedMessage, DOCUMENT_ID};
pub use error::{CanvasError, CanvasResult, GridError};
pub use event::{CellPosition, PointerEvent, PointerPhase, PointerTracker};
pub use grid::{CanvasConfig, Grid, GridStore};
pub use paint::{paint_at, PaintEngine};
pub use state::ConnectionStatus;

/// Canvas core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
