//! Connection status reporting.
//!
//! The sync client emits [`SyncSignal`]s; the reporter folds them into a
//! [`StatusSnapshot`] published on a `watch` channel for the UI.

use std::sync::Arc;

use pixel_core::ConnectionStatus;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// What the UI shows: connection state and last successful save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Connected or offline.
    pub status: ConnectionStatus,
    /// Time of the last successful write, ms since the Unix epoch.
    pub last_saved: Option<u64>,
}

/// Events that move the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSignal {
    /// The live feed opened.
    Subscribed,
    /// The live feed delivered a document.
    Delivered,
    /// A write succeeded at the given time.
    Saved {
        /// Document timestamp of the write.
        at: u64,
    },
    /// A write failed. Leaves the status unchanged.
    SaveFailed,
    /// The live feed could not open or broke.
    SubscribeFailed,
    /// The initial fetch failed.
    InitializeFailed,
    /// The user signed out.
    SignedOut,
}

/// Publishes the current [`StatusSnapshot`].
#[derive(Debug, Clone)]
pub struct StatusReporter {
    tx: Arc<watch::Sender<StatusSnapshot>>,
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReporter {
    /// Create a reporter starting offline.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(StatusSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    /// Apply a signal. Receivers are only woken when the snapshot changes.
    pub fn signal(&self, signal: SyncSignal) {
        self.tx.send_if_modified(|snapshot| {
            let before = *snapshot;
            match signal {
                SyncSignal::Subscribed | SyncSignal::Delivered => {
                    snapshot.status = ConnectionStatus::Connected;
                }
                SyncSignal::Saved { at } => {
                    snapshot.status = ConnectionStatus::Connected;
                    snapshot.last_saved = Some(at);
                }
                SyncSignal::SaveFailed => {}
                SyncSignal::SubscribeFailed
                | SyncSignal::InitializeFailed
                | SyncSignal::SignedOut => {
                    snapshot.status = ConnectionStatus::Offline;
                }
            }
            if *snapshot != before {
                tracing::debug!(status = %snapshot.status, ?signal, "Connection status changed");
            }
            *snapshot != before
        });
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        *self.tx.borrow()
    }

    /// Current connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.snapshot().status
    }

    /// Subscribe to snapshot changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<StatusSnapshot> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_offline() {
        let reporter = StatusReporter::new();
        assert_eq!(reporter.status(), ConnectionStatus::Offline);
        assert_eq!(reporter.snapshot().last_saved, None);
    }

    #[test]
    fn test_transitions() {
        let reporter = StatusReporter::new();
        reporter.signal(SyncSignal::Subscribed);
        assert!(reporter.status().is_connected());

        reporter.signal(SyncSignal::SaveFailed);
        assert!(reporter.status().is_connected());

        reporter.signal(SyncSignal::SubscribeFailed);
        assert_eq!(reporter.status(), ConnectionStatus::Offline);

        reporter.signal(SyncSignal::Saved { at: 99 });
        assert!(reporter.status().is_connected());
        assert_eq!(reporter.snapshot().last_saved, Some(99));

        reporter.signal(SyncSignal::SignedOut);
        assert_eq!(reporter.status().label(), "Offline");
        assert_eq!(reporter.snapshot().last_saved, Some(99));
    }

    #[tokio::test]
    async fn test_watchers_see_changes_only() {
        let reporter = StatusReporter::new();
        let mut rx = reporter.watch();

        reporter.signal(SyncSignal::InitializeFailed);
        assert!(!rx.has_changed().expect("sender alive"));

        reporter.signal(SyncSignal::Delivered);
        rx.changed().await.expect("changed");
        assert_eq!(rx.borrow_and_update().status, ConnectionStatus::Connected);
    }
}
