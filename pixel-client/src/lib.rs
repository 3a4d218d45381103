//! # PixelPals Client
//!
//! Client engine for the shared pixel canvas: keeps a local grid in step with
//! the shared document.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  SessionController                   │
//! │  GridStore · PaintEngine · PointerTracker · Render   │
//! ├──────────────────────────┬───────────────────────────┤
//! │        SyncClient        │       AuthProvider        │
//! │  initialize · subscribe  │  sign_up · sign_in        │
//! │  debounced save · load   │  sign_out · watch         │
//! ├──────────────────────────┼───────────────────────────┤
//! │      DocumentStore       │      StatusReporter       │
//! │  Memory · Http (+ /ws)   │  Connected / Offline      │
//! └──────────────────────────┴───────────────────────────┘
//! ```
//!
//! Conflicts resolve last-writer-wins on the whole document. Each client
//! tags its writes with an origin and ignores feed updates carrying its own
//! tag.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod debounce;
pub mod error;
pub mod http;
pub mod notice;
pub mod origin;
pub mod session;
pub mod status;
pub mod store;
pub mod sync;

pub use auth::{AuthError, AuthProvider, Identity, LocalAuth};
pub use config::{RetryConfig, SyncConfig};
pub use debounce::Debouncer;
pub use error::{SessionError, SyncError};
pub use http::HttpDocumentStore;
pub use notice::{InlineNotice, Notice, NoticeKind};
pub use origin::{OriginPolicy, OriginTag};
pub use session::{SessionCommand, SessionController};
pub use status::{StatusReporter, StatusSnapshot, SyncSignal};
pub use store::{DocumentStore, DocumentStream, MemoryDocumentStore};
pub use sync::{unsubscribe, SubscriptionHandle, SyncClient};
