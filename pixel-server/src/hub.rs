//! The shared document and its change feed.
//!
//! [`DocumentHub`] holds the single canvas document. Every accepted write is
//! stamped with server time, broadcast to every connected feed and then
//! persisted (when a data directory is configured) on the blocking pool.
//! Writes are serialized, so feeds observe them in commit order. The file
//! write happens after the document lock is released and never replaces a
//! newer document on disk.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use pixel_core::{current_timestamp, CanvasDocument, DOCUMENT_ID};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::validation::{validate_document, ValidationError};

/// Capacity of the feed broadcast channel.
const FEED_CAPACITY: usize = 64;

/// Errors raised by the document hub.
#[derive(Debug, Error)]
pub enum HubError {
    /// The incoming document was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Reading or creating the data directory failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A persisted document could not be parsed.
    #[error("Corrupt document at {path}: {source}")]
    Corrupt {
        /// File that failed to parse.
        path: PathBuf,
        /// Parse error.
        source: serde_json::Error,
    },
}

#[derive(Debug)]
struct HubInner {
    current: RwLock<Option<CanvasDocument>>,
    feed: broadcast::Sender<CanvasDocument>,
    data_dir: Option<PathBuf>,
    dimensions: Option<(usize, usize)>,
    persist_ok: AtomicBool,
    /// Stamp of the newest document on disk, held across each file write.
    persisted: Mutex<u64>,
}

/// Shared document state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DocumentHub {
    inner: Arc<HubInner>,
}

impl Default for DocumentHub {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentHub {
    /// In-memory hub accepting grids of any size.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None, None, None)
    }

    /// Hub persisting to `data_dir`, loading any document already there.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Io`] if the directory cannot be created or read
    /// and [`HubError::Corrupt`] if the stored document does not parse.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Result<Self, HubError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        let existing = load_document(&document_path(&data_dir))?;
        if let Some(doc) = &existing {
            let (rows, cols) = doc.grid.dimensions();
            tracing::info!(rows, cols, updated_by = %doc.updated_by, "Loaded persisted document");
        }
        Ok(Self::build(Some(data_dir), None, existing))
    }

    /// Only accept grids of exactly `rows x cols`.
    ///
    /// A persisted document of a different size is dropped from memory
    /// (the file is left untouched until the next write).
    #[must_use]
    pub fn with_dimensions(self, rows: usize, cols: usize) -> Self {
        let current = self.current().filter(|doc| {
            let matches = doc.grid.dimensions() == (rows, cols);
            if !matches {
                let (actual_rows, actual_cols) = doc.grid.dimensions();
                tracing::warn!(
                    actual_rows,
                    actual_cols,
                    rows,
                    cols,
                    "Ignoring persisted document with different dimensions"
                );
            }
            matches
        });
        Self::build(self.inner.data_dir.clone(), Some((rows, cols)), current)
    }

    fn build(
        data_dir: Option<PathBuf>,
        dimensions: Option<(usize, usize)>,
        current: Option<CanvasDocument>,
    ) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            inner: Arc::new(HubInner {
                current: RwLock::new(current),
                feed,
                data_dir,
                dimensions,
                persist_ok: AtomicBool::new(true),
                persisted: Mutex::new(0),
            }),
        }
    }

    /// The current document, if one has been written.
    #[must_use]
    pub fn current(&self) -> Option<CanvasDocument> {
        self.inner
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Configured grid dimensions, if any.
    #[must_use]
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.inner.dimensions
    }

    /// Directory the document is persisted to, if any.
    #[must_use]
    pub fn data_dir(&self) -> Option<&Path> {
        self.inner.data_dir.as_deref()
    }

    /// Whether the last persistence attempt succeeded.
    #[must_use]
    pub fn persistence_healthy(&self) -> bool {
        self.inner.persist_ok.load(Ordering::Relaxed)
    }

    /// Whether the document lock is usable.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !self.inner.current.is_poisoned()
    }

    /// Validate, stamp, store, persist and broadcast a write.
    ///
    /// The stored `lastUpdated` is server time, strictly greater than the
    /// previous document's. Returns the stored document.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if the document is rejected. Nothing
    /// is stored or broadcast in that case.
    pub async fn publish(&self, document: CanvasDocument) -> Result<CanvasDocument, HubError> {
        let document = self.commit(document)?;
        if self.inner.data_dir.is_some() {
            let hub = self.clone();
            let to_disk = document.clone();
            if let Err(e) = tokio::task::spawn_blocking(move || hub.persist(&to_disk)).await {
                tracing::warn!("Persistence task failed: {e}");
                self.inner.persist_ok.store(false, Ordering::Relaxed);
            }
        }
        Ok(document)
    }

    /// Stamp, store and broadcast under the document lock.
    fn commit(&self, mut document: CanvasDocument) -> Result<CanvasDocument, HubError> {
        validate_document(&document, self.inner.dimensions)?;

        let mut current = self
            .inner
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let floor = current.as_ref().map_or(0, |doc| doc.last_updated + 1);
        document.last_updated = current_timestamp().max(floor);
        *current = Some(document.clone());
        // No receivers is fine.
        let receivers = self.inner.feed.send(document.clone()).unwrap_or(0);
        drop(current);

        tracing::debug!(
            updated_by = %document.updated_by,
            last_updated = document.last_updated,
            receivers,
            "Document published"
        );
        Ok(document)
    }

    /// Receive every document published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CanvasDocument> {
        self.inner.feed.subscribe()
    }

    /// Number of live feed receivers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.feed.receiver_count()
    }

    /// Blocking file write. Skips documents older than the one on disk.
    fn persist(&self, document: &CanvasDocument) {
        let Some(ref data_dir) = self.inner.data_dir else {
            return;
        };
        let mut persisted = self
            .inner
            .persisted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if document.last_updated <= *persisted {
            tracing::trace!(
                last_updated = document.last_updated,
                "Newer document already persisted"
            );
            return;
        }
        let ok = match write_document(data_dir, document) {
            Ok(()) => {
                *persisted = document.last_updated;
                true
            }
            Err(e) => {
                tracing::warn!(dir = %data_dir.display(), "Failed to persist document: {e}");
                false
            }
        };
        self.inner.persist_ok.store(ok, Ordering::Relaxed);
    }
}

fn document_path(data_dir: &Path) -> PathBuf {
    data_dir.join(format!("{DOCUMENT_ID}.json"))
}

fn load_document(path: &Path) -> Result<Option<CanvasDocument>, HubError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| HubError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

/// Write through a temporary file so a crash never leaves a torn document.
fn write_document(data_dir: &Path, document: &CanvasDocument) -> std::io::Result<()> {
    let json = serde_json::to_vec(document)?;
    let path = document_path(data_dir);
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, &path)
}
