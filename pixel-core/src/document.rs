//! Shared canvas document: the persisted and synchronized representation.
//!
//! ```json
//! {
//!   "grid": [["#081226", "#FF0000"], ["#081226", "#081226"]],
//!   "lastUpdated": 1700000000000,
//!   "updatedBy": "alice@example.com"
//! }
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::{CanvasResult, Grid};

/// Identifier of the single shared document.
pub const DOCUMENT_ID: &str = "shared";

/// The shared canvas document.
///
/// `updated_by` carries the origin tag of the writer. Clients compare it with
/// their own tag to skip echoes of their own saves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasDocument {
    /// Full cell grid.
    pub grid: Grid,
    /// Write time in milliseconds since the Unix epoch.
    pub last_updated: u64,
    /// Origin tag of the writer.
    pub updated_by: String,
}

impl CanvasDocument {
    /// Build a document stamped with the current time.
    #[must_use]
    pub fn new(grid: Grid, updated_by: impl Into<String>) -> Self {
        Self {
            grid,
            last_updated: current_timestamp(),
            updated_by: updated_by.into(),
        }
    }

    /// Whether this document was written by `origin`.
    #[must_use]
    pub fn is_from(&self, origin: &str) -> bool {
        self.updated_by == origin
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CanvasResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from JSON. Malformed grids and color tokens are rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or the grid is malformed.
    pub fn from_json(json: &str) -> CanvasResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Frame exchanged over the live document feed.
///
/// Tagged by a `type` field, e.g. `{"type":"snapshot","document":{...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    /// The document after a write, or the current document on connect.
    Snapshot {
        /// Full document.
        document: CanvasDocument,
    },
    /// Keepalive request.
    Ping,
    /// Keepalive reply.
    Pong,
    /// Server-side failure report.
    Error {
        /// Human-readable description.
        message: String,
    },
}

/// Current time in milliseconds since the Unix epoch.
#[must_use]
pub fn current_timestamp() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| {
        #[allow(clippy::cast_possible_truncation)]
        {
            d.as_millis() as u64
        }
    })
}
