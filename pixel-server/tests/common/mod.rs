//! Test server harness for integration tests.
//!
//! Spins up a real Axum server on a random port for HTTP and WebSocket
//! clients.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::StreamExt;
use metrics_exporter_prometheus::PrometheusBuilder;
use pixel_core::{CanvasDocument, FeedMessage};
use pixel_server::{AppState, DocumentHub};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tower_http::cors::{Any, CorsLayer};

/// Client side of a feed connection.
pub type FeedSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A test server instance with control handles.
pub struct TestServer {
    addr: SocketAddr,
    hub: DocumentHub,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start an in-memory server accepting any grid size.
    pub async fn start() -> Self {
        Self::start_with(DocumentHub::new()).await
    }

    /// Start a server around an existing hub.
    ///
    /// # Panics
    ///
    /// Panics if no port is available or the server fails to bind.
    pub async fn start_with(hub: DocumentHub) -> Self {
        let port = portpicker::pick_unused_port().expect("no available port");
        let addr = SocketAddr::from(([127, 0, 0, 1], port));

        // Local recorder handle; nothing is installed globally.
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();
        let app = pixel_server::app(AppState::new(hub.clone()), metrics_handle)
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any));

        let listener = TcpListener::bind(addr).await.expect("failed to bind");
        let actual_addr = listener.local_addr().expect("failed to get local addr");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("server error");
        });

        tokio::time::sleep(Duration::from_millis(10)).await;

        Self {
            addr: actual_addr,
            hub,
            shutdown_tx: Some(shutdown_tx),
            handle,
        }
    }

    /// Base HTTP URL.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// URL for a path on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// WebSocket feed URL.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// The server's hub (for test assertions).
    pub fn hub(&self) -> &DocumentHub {
        &self.hub
    }

    /// Open a feed connection.
    pub async fn connect_feed(&self) -> FeedSocket {
        let (socket, _) = tokio_tungstenite::connect_async(self.ws_url())
            .await
            .expect("feed connect");
        socket
    }

    /// Gracefully shut down the server.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
    }
}

/// Wait for the next feed frame, failing after two seconds.
pub async fn next_frame(socket: &mut FeedSocket) -> FeedMessage {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("timed out waiting for frame")
            .expect("feed ended")
            .expect("feed error");
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).expect("valid frame");
        }
    }
}

/// Wait for the next `snapshot` frame.
pub async fn next_snapshot(socket: &mut FeedSocket) -> CanvasDocument {
    match next_frame(socket).await {
        FeedMessage::Snapshot { document } => document,
        other => panic!("expected snapshot, got {other:?}"),
    }
}

/// Assert no frame arrives within `window`.
pub async fn assert_quiet(socket: &mut FeedSocket, window: Duration) {
    if let Ok(frame) = tokio::time::timeout(window, socket.next()).await {
        panic!("unexpected frame: {frame:?}");
    }
}
