//! Inline notices shown next to the login form.
//!
//! Errors and confirmations clear themselves after [`NOTICE_TIMEOUT`];
//! progress notices ("Logging in...") stay until replaced.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// How long an expiring notice stays visible.
pub const NOTICE_TIMEOUT: Duration = Duration::from_secs(5);

/// Progress notice shown during sign-up.
pub const CREATING_ACCOUNT: &str = "Creating account...";

/// Progress notice shown during sign-in.
pub const LOGGING_IN: &str = "Logging in...";

/// Confirmation after a manual save.
pub const CANVAS_SAVED: &str = "Canvas saved successfully!";

/// Confirmation after a manual load.
pub const CANVAS_LOADED: &str = "Canvas loaded successfully!";

/// Shown when a load finds nothing stored.
pub const NO_SAVED_CANVAS: &str = "No saved canvas found";

/// Confirmation after clearing the canvas.
pub const CANVAS_CLEARED: &str = "Canvas cleared";

/// Notice flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    /// Operation in progress. Does not expire.
    Progress,
    /// Something failed.
    Error,
    /// Something succeeded.
    Info,
}

/// A visible notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Flavor.
    pub kind: NoticeKind,
    /// Text shown to the user.
    pub message: String,
}

/// Single-slot notice area.
#[derive(Debug)]
pub struct InlineNotice {
    tx: Arc<watch::Sender<Option<Notice>>>,
    expiry: Option<JoinHandle<()>>,
    timeout: Duration,
}

impl Default for InlineNotice {
    fn default() -> Self {
        Self::new(NOTICE_TIMEOUT)
    }
}

impl InlineNotice {
    /// Create an empty notice area.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            expiry: None,
            timeout,
        }
    }

    /// Show a notice, replacing the current one.
    ///
    /// Must be called inside a Tokio runtime for expiring kinds.
    pub fn show(&mut self, kind: NoticeKind, message: impl Into<String>) {
        if let Some(handle) = self.expiry.take() {
            handle.abort();
        }
        self.tx.send_replace(Some(Notice {
            kind,
            message: message.into(),
        }));

        if kind != NoticeKind::Progress {
            let tx = Arc::clone(&self.tx);
            let timeout = self.timeout;
            self.expiry = Some(tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                tx.send_replace(None);
            }));
        }
    }

    /// Show an expiring error.
    pub fn error(&mut self, message: impl Into<String>) {
        self.show(NoticeKind::Error, message);
    }

    /// Show an expiring confirmation.
    pub fn info(&mut self, message: impl Into<String>) {
        self.show(NoticeKind::Info, message);
    }

    /// Show a progress notice that stays until replaced.
    pub fn progress(&mut self, message: impl Into<String>) {
        self.show(NoticeKind::Progress, message);
    }

    /// Remove the current notice.
    pub fn clear(&mut self) {
        if let Some(handle) = self.expiry.take() {
            handle.abort();
        }
        self.tx.send_replace(None);
    }

    /// Currently visible notice.
    #[must_use]
    pub fn current(&self) -> Option<Notice> {
        self.tx.borrow().clone()
    }

    /// Subscribe to notice changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Option<Notice>> {
        self.tx.subscribe()
    }
}

impl Drop for InlineNotice {
    fn drop(&mut self) {
        if let Some(handle) = self.expiry.take() {
            handle.abort();
        }
    }
}
