//! # PixelPals Server Library
//!
//! Document service for the shared canvas. Holds the single
//! [`CanvasDocument`](pixel_core::CanvasDocument), accepts whole-document
//! writes over HTTP and pushes every write to WebSocket feeds.
//!
//! ```text
//!  PUT /api/canvas ──> validate ──> DocumentHub ──> data_dir/shared.json
//!                                       │
//!                                  broadcast
//!                                       │
//!                      ┌────────────────┼────────────────┐
//!                      v                v                v
//!                   /ws feed         /ws feed         /ws feed
//! ```
//!
//! Used by both the `pixelpals-server` binary and integration tests.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod feed;
pub mod health;
pub mod hub;
pub mod metrics;
pub mod routes;
pub mod validation;

pub use hub::{DocumentHub, HubError};
pub use validation::ValidationError;

use axum::{
    extract::{ws::WebSocketUpgrade, DefaultBodyLimit, State},
    middleware,
    response::IntoResponse,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use pixel_renderer::GridRenderer;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The shared document.
    pub hub: DocumentHub,
    /// Renderer for the PNG snapshot endpoint.
    pub renderer: GridRenderer,
}

impl AppState {
    /// State with the default renderer.
    #[must_use]
    pub fn new(hub: DocumentHub) -> Self {
        Self {
            hub,
            renderer: GridRenderer::default(),
        }
    }

    /// Replace the PNG renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: GridRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Get a reference to the document hub.
    #[must_use]
    pub fn hub(&self) -> &DocumentHub {
        &self.hub
    }
}

/// Document API, feed and health routes with request metrics.
///
/// Transport layers (CORS, tracing, request ids) are left to the caller.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/health", get(health::readiness))
        .route("/ws", get(feed_handler))
        .route(
            "/api/canvas",
            get(routes::get_canvas).put(routes::put_canvas),
        )
        .route("/api/canvas.png", get(routes::get_canvas_png))
        .layer(DefaultBodyLimit::max(validation::MAX_DOCUMENT_BYTES))
        .route_layer(middleware::from_fn(metrics::track_http))
        .with_state(state)
}

/// [`router`] plus the Prometheus `/metrics` endpoint.
pub fn app(state: AppState, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);
    router(state).merge(metrics_router)
}

/// Prometheus metrics endpoint.
#[tracing::instrument(name = "metrics", skip(handle))]
async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}

/// Live document feed.
#[tracing::instrument(name = "feed_connect", skip(ws, state))]
async fn feed_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    tracing::debug!("Feed upgrade requested");
    ws.on_upgrade(move |socket| feed::handle_feed_socket(socket, state.hub))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use pixel_core::{CanvasDocument, Color, Grid};
    use tower::ServiceExt;

    fn put_request(body: String) -> Request<Body> {
        Request::builder()
            .method(Method::PUT)
            .uri("/api/canvas")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .expect("request")
    }

    #[tokio::test]
    async fn test_get_empty_canvas() {
        let app = router(AppState::new(DocumentHub::new()));
        let response = app
            .oneshot(Request::get("/api/canvas").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_put_returns_stamped_document() {
        let hub = DocumentHub::new();
        let app = router(AppState::new(hub.clone()));
        let doc = CanvasDocument {
            grid: Grid::filled(2, 2, &Color::background()),
            last_updated: 7,
            updated_by: "a@x.com".to_string(),
        };

        let response = app
            .oneshot(put_request(doc.to_json().expect("json")))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let stored: CanvasDocument = serde_json::from_slice(&body).expect("document");
        assert_eq!(stored.grid, doc.grid);
        assert_ne!(stored.last_updated, 7);
        assert_eq!(hub.current(), Some(stored));
    }

    #[tokio::test]
    async fn test_invalid_color_is_unprocessable() {
        let app = router(AppState::new(DocumentHub::new()));
        let body = r#"{"grid":[["blue"]],"lastUpdated":1,"updatedBy":"a@x.com"}"#;
        let response = app
            .oneshot(put_request(body.to_string()))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_syntax_error_is_unprocessable() {
        let app = router(AppState::new(DocumentHub::new()));
        let response = app
            .oneshot(put_request("{".to_string()))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
