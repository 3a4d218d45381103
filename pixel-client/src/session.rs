//! Session controller: the single thread of control for the canvas.
//!
//! The controller owns the grid, the brush, the sync client and the render
//! target. Every grid mutation (local paint, foreign overwrite, load, clear)
//! happens inside its methods; the live feed reaches it only through an
//! internal channel.
//!
//! ```text
//!                ┌───────────────── Unauthenticated ◄──────────┐
//!   identity ──► │ initialize, render, subscribe               │ sign-out:
//!                ▼                                             │ unsubscribe,
//!             Active ── pointer ─► paint ─► render ─► save ────┘ cancel save
//!                ▲
//!                └── inbound (generation, document) ◄── feed task
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use pixel_core::{
    BrushState, CanvasConfig, CanvasDocument, CellPosition, Color, Grid, GridStore, PaintEngine,
    PointerEvent, PointerTracker,
};
use pixel_renderer::RenderTarget;
use tokio::sync::mpsc;

use crate::auth::{AuthProvider, Identity};
use crate::error::{SessionError, SyncError};
use crate::notice::{
    InlineNotice, CANVAS_CLEARED, CANVAS_LOADED, CANVAS_SAVED, CREATING_ACCOUNT, LOGGING_IN,
    NO_SAVED_CANVAS,
};
use crate::origin::{OriginPolicy, OriginTag};
use crate::status::{StatusReporter, SyncSignal};
use crate::sync::{unsubscribe, SubscriptionHandle, SyncClient};

type Inbound = (u64, CanvasDocument);

/// UI commands accepted by [`SessionController::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Mouse or touch input on the canvas.
    Pointer(PointerEvent),
    /// Pick a paint color.
    SetColor(Color),
    /// Change the brush size.
    SetBrushSize(u32),
    /// Flip erase mode.
    ToggleErase,
    /// Save the canvas now.
    Save,
    /// Reload the canvas from the store.
    Load,
    /// Reset to the background color and save.
    Clear,
    /// Create an account.
    SignUp {
        /// Account email.
        email: String,
        /// Account password.
        password: String,
    },
    /// Sign in.
    SignIn {
        /// Account email.
        email: String,
        /// Account password.
        password: String,
    },
    /// Sign out.
    SignOut,
}

/// Session state.
#[derive(Debug)]
enum SessionState {
    Unauthenticated,
    Active(ActiveSession),
}

#[derive(Debug)]
struct ActiveSession {
    identity: Identity,
    origin: OriginTag,
    generation: u64,
    subscription: Option<SubscriptionHandle>,
}

/// Owns the canvas and reacts to auth changes, UI input and foreign updates.
#[derive(Debug)]
pub struct SessionController<R: RenderTarget> {
    config: CanvasConfig,
    store: GridStore,
    engine: PaintEngine,
    pointer: PointerTracker,
    sync: SyncClient,
    renderer: R,
    policy: OriginPolicy,
    state: SessionState,
    generation: u64,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    inbound_rx: mpsc::UnboundedReceiver<Inbound>,
    notice: InlineNotice,
}

impl<R: RenderTarget> SessionController<R> {
    /// Create a signed-out controller with a blank canvas and draw it.
    ///
    /// # Errors
    ///
    /// Returns an error if the canvas configuration is unusable or the first
    /// frame cannot be drawn.
    pub fn new(
        config: CanvasConfig,
        sync: SyncClient,
        renderer: R,
        policy: OriginPolicy,
    ) -> Result<Self, SessionError> {
        let store = GridStore::from_config(&config)?;
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let mut controller = Self {
            config,
            store,
            engine: PaintEngine::default(),
            pointer: PointerTracker::new(),
            sync,
            renderer,
            policy,
            state: SessionState::Unauthenticated,
            generation: 0,
            inbound_tx,
            inbound_rx,
            notice: InlineNotice::default(),
        };
        controller.renderer.render(controller.store.grid())?;
        Ok(controller)
    }

    /// Whether a user is signed in.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active(_))
    }

    /// Signed-in identity.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match &self.state {
            SessionState::Active(active) => Some(&active.identity),
            SessionState::Unauthenticated => None,
        }
    }

    /// Origin tag of the current session.
    #[must_use]
    pub fn origin(&self) -> Option<&OriginTag> {
        match &self.state {
            SessionState::Active(active) => Some(&active.origin),
            SessionState::Unauthenticated => None,
        }
    }

    /// Whether the live feed task of the current session is running.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        match &self.state {
            SessionState::Active(active) => active
                .subscription
                .as_ref()
                .is_some_and(SubscriptionHandle::is_active),
            SessionState::Unauthenticated => false,
        }
    }

    /// The grid store.
    #[must_use]
    pub const fn grid(&self) -> &GridStore {
        &self.store
    }

    /// Canvas geometry.
    #[must_use]
    pub const fn config(&self) -> &CanvasConfig {
        &self.config
    }

    /// Current brush.
    #[must_use]
    pub const fn brush(&self) -> &BrushState {
        self.engine.brush()
    }

    /// The render target.
    #[must_use]
    pub const fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Status reporter for the connection indicator.
    #[must_use]
    pub fn status(&self) -> &StatusReporter {
        self.sync.status()
    }

    /// Inline notice area.
    #[must_use]
    pub const fn notice(&self) -> &InlineNotice {
        &self.notice
    }

    /// The sync client.
    #[must_use]
    pub const fn sync(&self) -> &SyncClient {
        &self.sync
    }

    /// React to the auth collaborator reporting a new identity or none.
    pub async fn handle_auth_change(&mut self, identity: Option<Identity>) {
        match identity {
            Some(identity) => self.activate(identity).await,
            None => self.deactivate(),
        }
    }

    async fn activate(&mut self, identity: Identity) {
        if let SessionState::Active(active) = &self.state {
            if active.identity == identity && active.subscription.is_some() {
                return;
            }
        }
        // A new identity replaces the old session and its feed.
        self.teardown();

        let origin = self.policy.issue(&identity);
        self.generation += 1;
        let generation = self.generation;
        tracing::info!(email = %identity.email, %origin, "Session starting");

        match self.sync.initialize(&origin, self.store.grid()).await {
            Ok(grid) => {
                self.replace_grid(grid, "initial load");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Initial load failed, keeping local canvas");
            }
        }
        self.render();

        let tx = self.inbound_tx.clone();
        let subscription = self.sync.subscribe(origin.clone(), move |document| {
            // The receiver lives as long as the controller.
            let _ = tx.send((generation, document));
        });

        self.state = SessionState::Active(ActiveSession {
            identity,
            origin,
            generation,
            subscription: Some(subscription),
        });
    }

    fn deactivate(&mut self) {
        if self.is_active() {
            tracing::info!("Session ended");
        }
        self.teardown();
    }

    fn teardown(&mut self) {
        let previous = std::mem::replace(&mut self.state, SessionState::Unauthenticated);
        if let SessionState::Active(mut active) = previous {
            unsubscribe(&mut active.subscription);
            self.sync.cancel_pending_save();
            self.sync.status().signal(SyncSignal::SignedOut);
        }
        self.pointer.reset();
        // Anything still queued belongs to the old session.
        while self.inbound_rx.try_recv().is_ok() {}
    }

    /// Feed a pointer event. Returns the cells that changed.
    ///
    /// Ignored while signed out.
    pub fn pointer(&mut self, event: &PointerEvent) -> BTreeSet<CellPosition> {
        if !self.is_active() {
            return BTreeSet::new();
        }
        match self.pointer.handle(event, self.config.cell_size) {
            Some((row, col)) => self.paint_at(row, col),
            None => BTreeSet::new(),
        }
    }

    /// Paint at a cell with the current brush. Returns the cells that changed.
    ///
    /// A change re-renders immediately and schedules a debounced save.
    /// Ignored while signed out.
    pub fn paint_at(&mut self, row: i64, col: i64) -> BTreeSet<CellPosition> {
        let SessionState::Active(active) = &self.state else {
            return BTreeSet::new();
        };
        let changed = self.engine.paint(&mut self.store, row, col);
        if !changed.is_empty() {
            let origin = active.origin.clone();
            self.render();
            self.sync.schedule_save(&origin, self.store.snapshot());
        }
        changed
    }

    /// Select a paint color.
    pub fn set_color(&mut self, color: Color) {
        self.engine.brush_mut().set_color(color);
    }

    /// Set the brush size, clamped to the allowed range.
    pub fn set_brush_size(&mut self, size: u32) {
        self.engine.brush_mut().set_size(size);
    }

    /// Flip erase mode, returning the new value.
    pub fn toggle_erase(&mut self) -> bool {
        self.engine.brush_mut().toggle_erase()
    }

    /// Save the canvas immediately.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAuthenticated`] while signed out, or the store error.
    pub async fn save(&mut self) -> Result<(), SessionError> {
        let origin = self.require_origin()?;
        self.sync.save_now(&origin, self.store.snapshot()).await?;
        tracing::info!("Canvas saved");
        Ok(())
    }

    /// Replace the canvas with the stored document.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAuthenticated`] while signed out, the store error,
    /// or [`SessionError::Grid`] if the stored grid has other dimensions.
    pub async fn load(&mut self) -> Result<(), SessionError> {
        self.require_origin()?;
        let grid = self.sync.load_now().await?;
        self.store.replace_all(grid)?;
        self.render();
        tracing::info!("Canvas loaded");
        Ok(())
    }

    /// Reset every cell to the background and save immediately.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAuthenticated`] while signed out, or the store error.
    pub async fn clear(&mut self) -> Result<(), SessionError> {
        let origin = self.require_origin()?;
        self.store.clear();
        self.render();
        self.sync.save_now(&origin, self.store.snapshot()).await?;
        tracing::info!("Canvas cleared");
        Ok(())
    }

    /// Apply every queued foreign update. Returns how many were applied.
    pub fn apply_inbound(&mut self) -> usize {
        let mut applied = 0;
        while let Ok((generation, document)) = self.inbound_rx.try_recv() {
            if self.apply_foreign(generation, document) {
                applied += 1;
            }
        }
        applied
    }

    fn apply_foreign(&mut self, generation: u64, document: CanvasDocument) -> bool {
        let current = match &self.state {
            SessionState::Active(active) => active.generation,
            SessionState::Unauthenticated => return false,
        };
        if generation != current {
            tracing::debug!(generation, current, "Dropping update from stale subscription");
            return false;
        }
        tracing::debug!(updated_by = %document.updated_by, "Applying foreign update");
        if self.replace_grid(document.grid, "foreign update") {
            // The pending save holds the grid that was just replaced.
            self.sync.cancel_pending_save();
            self.render();
            true
        } else {
            false
        }
    }

    /// Drive the session until the command channel or auth feed closes.
    pub async fn run(
        mut self,
        auth: Arc<dyn AuthProvider>,
        mut commands: mpsc::Receiver<SessionCommand>,
    ) {
        let mut identities = auth.watch();
        let initial = identities.borrow_and_update().clone();
        self.handle_auth_change(initial).await;

        loop {
            tokio::select! {
                changed = identities.changed() => {
                    if changed.is_err() {
                        tracing::debug!("Auth feed closed");
                        break;
                    }
                    let identity = identities.borrow_and_update().clone();
                    self.handle_auth_change(identity).await;
                }
                Some((generation, document)) = self.inbound_rx.recv() => {
                    self.apply_foreign(generation, document);
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command, auth.as_ref()).await,
                    None => break,
                },
            }
        }

        self.teardown();
        tracing::debug!("Session loop stopped");
    }

    /// Execute one UI command. Failures are shown in the notice area.
    pub async fn handle_command(&mut self, command: SessionCommand, auth: &dyn AuthProvider) {
        let result = match command {
            SessionCommand::Pointer(event) => {
                self.pointer(&event);
                Ok(())
            }
            SessionCommand::SetColor(color) => {
                self.set_color(color);
                Ok(())
            }
            SessionCommand::SetBrushSize(size) => {
                self.set_brush_size(size);
                Ok(())
            }
            SessionCommand::ToggleErase => {
                self.toggle_erase();
                Ok(())
            }
            SessionCommand::Save => self.save().await.map(|()| self.notice.info(CANVAS_SAVED)),
            SessionCommand::Load => match self.load().await {
                Ok(()) => {
                    self.notice.info(CANVAS_LOADED);
                    Ok(())
                }
                Err(SessionError::Sync(SyncError::DocumentNotFound)) => {
                    self.notice.info(NO_SAVED_CANVAS);
                    Ok(())
                }
                Err(e) => Err(e),
            },
            SessionCommand::Clear => {
                let cleared = self.clear().await;
                cleared.map(|()| self.notice.info(CANVAS_CLEARED))
            }
            SessionCommand::SignUp { email, password } => {
                self.notice.progress(CREATING_ACCOUNT);
                auth.sign_up(&email, &password)
                    .await
                    .map(|_| self.notice.clear())
                    .map_err(SessionError::from)
            }
            SessionCommand::SignIn { email, password } => {
                self.notice.progress(LOGGING_IN);
                auth.sign_in(&email, &password)
                    .await
                    .map(|_| self.notice.clear())
                    .map_err(SessionError::from)
            }
            SessionCommand::SignOut => auth.sign_out().await.map_err(SessionError::from),
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, "Command failed");
            self.notice.error(e.to_string());
        }
    }

    fn require_origin(&self) -> Result<OriginTag, SessionError> {
        match &self.state {
            SessionState::Active(active) => Ok(active.origin.clone()),
            SessionState::Unauthenticated => Err(SessionError::NotAuthenticated),
        }
    }

    /// Swap in a remote grid. Mismatched dimensions are logged and dropped.
    fn replace_grid(&mut self, grid: Grid, source: &str) -> bool {
        match self.store.replace_all(grid) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(source, error = %e, "Rejected remote grid");
                false
            }
        }
    }

    fn render(&mut self) {
        if let Err(e) = self.renderer.render(self.store.grid()) {
            tracing::warn!(error = %e, "Render failed");
        }
    }
}
