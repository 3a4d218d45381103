//! Persistent document store interface and an in-process implementation.
//!
//! A store holds the single shared [`CanvasDocument`]. Writes are
//! unconditional full overwrites and every write is delivered to every live
//! feed, including the writer's own.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use pixel_core::CanvasDocument;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use crate::error::SyncError;

/// Live feed of document changes.
pub type DocumentStream = BoxStream<'static, Result<CanvasDocument, SyncError>>;

/// Storage for the shared canvas document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the current document, `None` when nothing has been written.
    async fn get(&self) -> Result<Option<CanvasDocument>, SyncError>;

    /// Overwrite the document.
    async fn set(&self, document: &CanvasDocument) -> Result<(), SyncError>;

    /// Open a live feed of document changes.
    ///
    /// The feed yields an error item and ends when the connection breaks.
    async fn subscribe(&self) -> Result<DocumentStream, SyncError>;
}

const FEED_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
enum FeedEvent {
    Document(CanvasDocument),
    Disconnect(String),
}

/// In-process document store.
///
/// Cheap to clone; clones share the same document. Supports failure
/// injection for exercising offline paths.
#[derive(Clone)]
pub struct MemoryDocumentStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    document: RwLock<Option<CanvasDocument>>,
    feed: broadcast::Sender<FeedEvent>,
    offline: AtomicBool,
    writes: AtomicU64,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            inner: Arc::new(MemoryInner {
                document: RwLock::new(None),
                feed,
                offline: AtomicBool::new(false),
                writes: AtomicU64::new(0),
            }),
        }
    }

    /// Create a store already holding `document`.
    #[must_use]
    pub fn with_document(document: CanvasDocument) -> Self {
        let store = Self::new();
        *store
            .inner
            .document
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(document);
        store
    }

    /// Make every operation fail with [`SyncError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Break every open feed with an error item.
    pub fn disconnect_feeds(&self, reason: impl Into<String>) {
        let _ = self.inner.feed.send(FeedEvent::Disconnect(reason.into()));
    }

    /// Number of successful writes so far.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Current document without going through the async interface.
    #[must_use]
    pub fn snapshot(&self) -> Option<CanvasDocument> {
        self.inner
            .document
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of open feeds.
    #[must_use]
    pub fn feed_count(&self) -> usize {
        self.inner.feed.receiver_count()
    }

    fn check_online(&self) -> Result<(), SyncError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            Err(SyncError::Unavailable("store is offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self) -> Result<Option<CanvasDocument>, SyncError> {
        self.check_online()?;
        Ok(self.snapshot())
    }

    async fn set(&self, document: &CanvasDocument) -> Result<(), SyncError> {
        self.check_online()?;
        *self
            .inner
            .document
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(document.clone());
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        // No open feeds is not an error.
        let _ = self.inner.feed.send(FeedEvent::Document(document.clone()));
        Ok(())
    }

    async fn subscribe(&self) -> Result<DocumentStream, SyncError> {
        self.check_online()?;
        // Subscribe before reading so no write can fall between the two.
        let rx = self.inner.feed.subscribe();
        let current = self.snapshot();

        let live = stream::unfold(Some(BroadcastStream::new(rx)), |state| async move {
            let mut events = state?;
            loop {
                match events.next().await? {
                    Ok(FeedEvent::Document(doc)) => return Some((Ok(doc), Some(events))),
                    // The error is the last item of a broken feed.
                    Ok(FeedEvent::Disconnect(reason)) => {
                        return Some((Err(SyncError::Feed(reason)), None));
                    }
                    Err(BroadcastStreamRecvError::Lagged(n)) => {
                        tracing::warn!("Memory feed lagged by {} messages", n);
                    }
                }
            }
        });

        Ok(stream::iter(current.map(Ok)).chain(live).boxed())
    }
}
