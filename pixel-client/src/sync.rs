//! Sync client: moves the grid between the session and the document store.
//!
//! ```text
//!  SessionController                     DocumentStore
//!        │  initialize / save_now / load_now   │
//!        ├────────────────────────────────────►│
//!        │  schedule_save ─► Debouncer ───────►│ (500 ms quiet period)
//!        │                                     │
//!        │◄── on_foreign ◄── feed task ◄───────┤ subscribe
//!        │        (own origin dropped)         │
//! ```
//!
//! Background tasks never touch the grid. The feed task only hands foreign
//! documents to the callback, and the debouncer writes the snapshot it was
//! given.

use std::sync::Arc;

use futures::StreamExt;
use pixel_core::{CanvasDocument, Grid};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::SyncConfig;
use crate::debounce::Debouncer;
use crate::error::SyncError;
use crate::origin::OriginTag;
use crate::status::{StatusReporter, SyncSignal};
use crate::store::DocumentStore;

/// Handle to a running live-feed subscription.
///
/// Dropping the handle stops the feed as well.
#[derive(Debug)]
pub struct SubscriptionHandle {
    task: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl SubscriptionHandle {
    /// Whether the feed task is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the feed.
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.task.abort();
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Stop a subscription if there is one. Safe to call repeatedly.
pub fn unsubscribe(handle: &mut Option<SubscriptionHandle>) {
    if let Some(handle) = handle.take() {
        handle.shutdown();
        tracing::debug!("Live feed unsubscribed");
    }
}

/// Client side of document synchronization.
pub struct SyncClient {
    store: Arc<dyn DocumentStore>,
    config: SyncConfig,
    debouncer: Debouncer,
    status: StatusReporter,
}

impl std::fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClient")
            .field("config", &self.config)
            .field("save_pending", &self.debouncer.is_pending())
            .field("status", &self.status.snapshot())
            .finish_non_exhaustive()
    }
}

impl SyncClient {
    /// Create a client over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, config: SyncConfig) -> Self {
        Self {
            store,
            debouncer: Debouncer::new(config.debounce()),
            config,
            status: StatusReporter::new(),
        }
    }

    /// Status reporter fed by this client.
    #[must_use]
    pub fn status(&self) -> &StatusReporter {
        &self.status
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Fetch the shared document, seeding it with `local` if none exists.
    ///
    /// Returns the grid to render.
    ///
    /// # Errors
    ///
    /// Returns the store error on transport failure and reports offline.
    pub async fn initialize(&self, origin: &OriginTag, local: &Grid) -> Result<Grid, SyncError> {
        let fetched = match self.store.get().await {
            Ok(fetched) => fetched,
            Err(e) => {
                self.status.signal(SyncSignal::InitializeFailed);
                return Err(e);
            }
        };

        if let Some(document) = fetched {
            tracing::debug!(updated_by = %document.updated_by, "Loaded shared canvas");
            return Ok(document.grid);
        }

        let seed = CanvasDocument::new(local.clone(), origin.as_str());
        match self.store.set(&seed).await {
            Ok(()) => {
                tracing::info!(%origin, "Seeded shared canvas");
                self.status.signal(SyncSignal::Saved {
                    at: seed.last_updated,
                });
                Ok(seed.grid)
            }
            Err(e) => {
                self.status.signal(SyncSignal::InitializeFailed);
                Err(e)
            }
        }
    }

    /// Open the live feed and forward foreign documents to `on_foreign`.
    ///
    /// Documents tagged with `origin` are echoes of this client's own saves
    /// and are dropped, as are documents with no writer tag. A broken feed
    /// reports offline and is reopened with exponential backoff until the
    /// handle is shut down. A failure that [`SyncError::is_retryable`] rules
    /// out ends the task instead.
    pub fn subscribe<F>(&self, origin: OriginTag, on_foreign: F) -> SubscriptionHandle
    where
        F: Fn(CanvasDocument) + Send + Sync + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let store = Arc::clone(&self.store);
        let status = self.status.clone();
        let retry = self.config.retry.clone();

        let task = tokio::spawn(async move {
            let mut consecutive_failures: u32 = 0;
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    outcome = run_feed(store.as_ref(), &origin, &status, &on_foreign) => {
                        if outcome.delivered {
                            consecutive_failures = 0;
                        }
                        if let Some(e) = outcome.error.filter(|e| !e.is_retryable()) {
                            status.signal(SyncSignal::SubscribeFailed);
                            tracing::error!(error = %e, "Live feed cannot recover, giving up");
                            break;
                        }
                    }
                }

                status.signal(SyncSignal::SubscribeFailed);
                let delay = retry.delay_for_attempt(consecutive_failures);
                consecutive_failures = consecutive_failures.saturating_add(1);
                tracing::debug!(
                    attempt = consecutive_failures,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Reopening live feed"
                );

                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    () = tokio::time::sleep(delay) => {}
                }
            }
            tracing::debug!("Live feed task stopped");
        });

        SubscriptionHandle {
            task,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Stop a subscription if there is one. Safe to call repeatedly.
    pub fn unsubscribe(&self, handle: &mut Option<SubscriptionHandle>) {
        unsubscribe(handle);
    }

    /// Save `grid` after the quiet period, replacing any pending save.
    ///
    /// Failures are logged and never surfaced.
    pub fn schedule_save(&mut self, origin: &OriginTag, grid: Grid) {
        let store = Arc::clone(&self.store);
        let status = self.status.clone();
        let origin = origin.clone();
        self.debouncer.schedule(async move {
            let document = CanvasDocument::new(grid, origin.as_str());
            match store.set(&document).await {
                Ok(()) => {
                    tracing::debug!(%origin, "Debounced save written");
                    status.signal(SyncSignal::Saved {
                        at: document.last_updated,
                    });
                }
                Err(e) => {
                    tracing::warn!(%origin, error = %e, "Debounced save failed");
                    status.signal(SyncSignal::SaveFailed);
                }
            }
        });
    }

    /// Write `grid` immediately, replacing any pending debounced save.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub async fn save_now(
        &mut self,
        origin: &OriginTag,
        grid: Grid,
    ) -> Result<CanvasDocument, SyncError> {
        self.debouncer.cancel();
        let document = CanvasDocument::new(grid, origin.as_str());
        match self.store.set(&document).await {
            Ok(()) => {
                self.status.signal(SyncSignal::Saved {
                    at: document.last_updated,
                });
                Ok(document)
            }
            Err(e) => {
                self.status.signal(SyncSignal::SaveFailed);
                Err(e)
            }
        }
    }

    /// Fetch the stored grid.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DocumentNotFound`] when nothing is stored, or the
    /// store error.
    pub async fn load_now(&self) -> Result<Grid, SyncError> {
        self.store
            .get()
            .await?
            .map(|document| document.grid)
            .ok_or(SyncError::DocumentNotFound)
    }

    /// Drop any pending debounced save. Returns whether one was waiting.
    pub fn cancel_pending_save(&mut self) -> bool {
        let cancelled = self.debouncer.cancel();
        if cancelled {
            tracing::debug!("Pending save cancelled");
        }
        cancelled
    }

    /// Whether a debounced save is waiting to fire.
    #[must_use]
    pub fn has_pending_save(&self) -> bool {
        self.debouncer.is_pending()
    }
}

struct FeedOutcome {
    delivered: bool,
    error: Option<SyncError>,
}

/// Run one feed connection until it breaks.
async fn run_feed<F>(
    store: &dyn DocumentStore,
    origin: &OriginTag,
    status: &StatusReporter,
    on_foreign: &F,
) -> FeedOutcome
where
    F: Fn(CanvasDocument) + Send + Sync,
{
    let mut outcome = FeedOutcome {
        delivered: false,
        error: None,
    };
    let mut feed = match store.subscribe().await {
        Ok(feed) => feed,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to open live feed");
            outcome.error = Some(e);
            return outcome;
        }
    };
    status.signal(SyncSignal::Subscribed);
    tracing::debug!(%origin, "Live feed open");

    while let Some(item) = feed.next().await {
        match item {
            Ok(document) => {
                outcome.delivered = true;
                status.signal(SyncSignal::Delivered);
                if document.updated_by == origin.as_str() {
                    tracing::trace!("Dropping echo of own save");
                    continue;
                }
                if document.updated_by.trim().is_empty() {
                    tracing::debug!("Dropping update with no writer tag");
                    continue;
                }
                tracing::debug!(updated_by = %document.updated_by, "Foreign update received");
                on_foreign(document);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Live feed broke");
                outcome.error = Some(e);
                return outcome;
            }
        }
    }
    tracing::warn!("Live feed ended");
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStream, MemoryDocumentStore};
    use async_trait::async_trait;
    use pixel_core::{paint_at, Color, ConnectionStatus};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn red() -> Color {
        Color::parse("#FF0000").expect("valid")
    }

    fn blank() -> Grid {
        Grid::filled(10, 10, &Color::background())
    }

    fn client(store: &MemoryDocumentStore) -> SyncClient {
        SyncClient::new(Arc::new(store.clone()), SyncConfig::default())
    }

    #[tokio::test]
    async fn test_initialize_seeds_missing_document() {
        let store = MemoryDocumentStore::new();
        let sync = client(&store);
        let origin = OriginTag::new("a@x.com");

        let grid = sync.initialize(&origin, &blank()).await.expect("initialize");
        assert_eq!(grid, blank());

        let stored = store.snapshot().expect("seeded");
        assert!(stored.is_from("a@x.com"));
        assert_eq!(store.write_count(), 1);
        assert!(sync.status().snapshot().last_saved.is_some());
    }

    #[tokio::test]
    async fn test_initialize_returns_existing_grid() {
        let mut painted = blank();
        let _ = paint_at(&mut painted, 1, 1, &red(), 1, false);
        let store = MemoryDocumentStore::with_document(CanvasDocument::new(
            painted.clone(),
            "b@x.com",
        ));
        let sync = client(&store);

        let grid = sync
            .initialize(&OriginTag::new("a@x.com"), &blank())
            .await
            .expect("initialize");
        assert_eq!(grid, painted);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_initialize_failure_reports_offline() {
        let store = MemoryDocumentStore::new();
        store.set_offline(true);
        let sync = client(&store);
        sync.status().signal(SyncSignal::Subscribed);

        let result = sync.initialize(&OriginTag::new("a@x.com"), &blank()).await;
        assert!(result.is_err());
        assert_eq!(sync.status().status(), ConnectionStatus::Offline);
    }

    #[tokio::test]
    async fn test_own_echo_is_suppressed() {
        let store = MemoryDocumentStore::new();
        let sync = client(&store);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut handle = Some(sync.subscribe(OriginTag::new("a@x.com"), move |doc| {
            let _ = tx.send(doc);
        }));

        // Wait for the feed to open.
        let mut status = sync.status().watch();
        status
            .wait_for(|s| s.status == ConnectionStatus::Connected)
            .await
            .expect("connected");

        store
            .set(&CanvasDocument::new(blank(), "a@x.com"))
            .await
            .expect("set");
        let mut foreign = blank();
        let _ = paint_at(&mut foreign, 0, 0, &red(), 1, false);
        store
            .set(&CanvasDocument::new(foreign.clone(), "b@x.com"))
            .await
            .expect("set");

        let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("delivered in time")
            .expect("document");
        assert!(received.is_from("b@x.com"));
        assert_eq!(received.grid, foreign);
        assert!(rx.try_recv().is_err(), "echo must not be forwarded");

        sync.unsubscribe(&mut handle);
        sync.unsubscribe(&mut handle);
        assert!(handle.is_none());
    }

    #[tokio::test]
    async fn test_untagged_updates_are_dropped() {
        let store = MemoryDocumentStore::new();
        let sync = client(&store);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = sync.subscribe(OriginTag::new("a@x.com"), move |doc| {
            let _ = tx.send(doc);
        });
        let mut status = sync.status().watch();
        status
            .wait_for(|s| s.status == ConnectionStatus::Connected)
            .await
            .expect("connected");

        for tag in ["", "   "] {
            store
                .set(&CanvasDocument::new(blank(), tag))
                .await
                .expect("set");
        }
        store
            .set(&CanvasDocument::new(blank(), "b@x.com"))
            .await
            .expect("set");

        let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("delivered in time")
            .expect("document");
        assert!(received.is_from("b@x.com"));
        assert!(rx.try_recv().is_err());
    }

    /// Store whose feed can never be opened.
    struct MisconfiguredStore {
        attempts: AtomicU32,
    }

    #[async_trait]
    impl DocumentStore for MisconfiguredStore {
        async fn get(&self) -> Result<Option<CanvasDocument>, SyncError> {
            Ok(None)
        }

        async fn set(&self, _document: &CanvasDocument) -> Result<(), SyncError> {
            Ok(())
        }

        async fn subscribe(&self) -> Result<DocumentStream, SyncError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(SyncError::InvalidUrl("ftp://host/ws".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_stops_on_unrecoverable_error() {
        let store = Arc::new(MisconfiguredStore {
            attempts: AtomicU32::new(0),
        });
        let sync = SyncClient::new(store.clone(), SyncConfig::default());
        sync.status().signal(SyncSignal::Subscribed);
        let handle = sync.subscribe(OriginTag::new("a@x.com"), |_| {});

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(store.attempts.load(Ordering::SeqCst), 1);
        assert!(!handle.is_active());
        assert_eq!(sync.status().status(), ConnectionStatus::Offline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_coalesces_burst_into_one_write() {
        let store = MemoryDocumentStore::new();
        let mut sync = client(&store);
        let origin = OriginTag::new("a@x.com");
        let mut grid = blank();

        for i in 0..5_i64 {
            let _ = paint_at(&mut grid, i, i, &red(), 1, false);
            sync.schedule_save(&origin, grid.clone());
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(store.write_count(), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(store.write_count(), 1);
        let stored = store.snapshot().expect("saved");
        assert_eq!(stored.grid, grid);
        assert!(stored.is_from("a@x.com"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_pending_save() {
        let store = MemoryDocumentStore::new();
        let mut sync = client(&store);
        sync.schedule_save(&OriginTag::new("a@x.com"), blank());
        assert!(sync.has_pending_save());
        assert!(sync.cancel_pending_save());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_debounced_save_keeps_status() {
        let store = MemoryDocumentStore::new();
        let mut sync = client(&store);
        sync.status().signal(SyncSignal::Subscribed);
        store.set_offline(true);

        sync.schedule_save(&OriginTag::new("a@x.com"), blank());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sync.status().status(), ConnectionStatus::Connected);
        assert!(sync.status().snapshot().last_saved.is_none());
    }

    #[tokio::test]
    async fn test_save_now_and_load_now() {
        let store = MemoryDocumentStore::new();
        let mut sync = client(&store);
        assert!(matches!(sync.load_now().await, Err(SyncError::DocumentNotFound)));

        let mut grid = blank();
        let _ = paint_at(&mut grid, 3, 3, &red(), 2, false);
        let saved = sync
            .save_now(&OriginTag::new("a@x.com"), grid.clone())
            .await
            .expect("save");
        assert_eq!(sync.status().snapshot().last_saved, Some(saved.last_updated));
        assert_eq!(sync.load_now().await.expect("load"), grid);
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_reconnects_after_break() {
        let store = MemoryDocumentStore::new();
        let sync = client(&store);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = sync.subscribe(OriginTag::new("a@x.com"), move |doc| {
            let _ = tx.send(doc);
        });

        let mut status = sync.status().watch();
        status
            .wait_for(|s| s.status == ConnectionStatus::Connected)
            .await
            .expect("connected");

        store.disconnect_feeds("network down");
        status
            .wait_for(|s| s.status == ConnectionStatus::Offline)
            .await
            .expect("offline");
        status
            .wait_for(|s| s.status == ConnectionStatus::Connected)
            .await
            .expect("reconnected");

        store
            .set(&CanvasDocument::new(blank(), "b@x.com"))
            .await
            .expect("set");
        let received = rx.recv().await.expect("document");
        assert!(received.is_from("b@x.com"));
    }
}
