//! API route handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use pixel_core::CanvasDocument;
use serde_json::json;

use crate::hub::HubError;
use crate::metrics;
use crate::AppState;

/// Error response body: `{"error": "..."}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "no document has been written yet")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        match err {
            HubError::Validation(e) => Self::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            other => Self::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    }
}

/// `GET /api/canvas`: the current document, 404 when none exists.
#[tracing::instrument(name = "get_canvas", skip(state))]
pub async fn get_canvas(State(state): State<AppState>) -> Result<Json<CanvasDocument>, ApiError> {
    state.hub.current().map(Json).ok_or_else(ApiError::not_found)
}

/// `PUT /api/canvas`: overwrite the document.
///
/// Malformed bodies (ragged grids, bad color tokens) and validation failures
/// are answered with 422; the stored document is returned on success.
#[tracing::instrument(name = "put_canvas", skip(state, payload))]
pub async fn put_canvas(
    State(state): State<AppState>,
    payload: Result<Json<CanvasDocument>, JsonRejection>,
) -> Result<Json<CanvasDocument>, ApiError> {
    let Json(document) = payload.map_err(|rejection| {
        tracing::debug!("Rejected document body: {}", rejection.body_text());
        metrics::record_document_write("rejected");
        metrics::record_validation_failure("body");
        ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text())
    })?;

    match state.hub.publish(document).await {
        Ok(stored) => {
            metrics::record_document_write("accepted");
            Ok(Json(stored))
        }
        Err(err) => {
            if let HubError::Validation(ref e) = err {
                tracing::warn!(kind = e.kind(), "Rejected document: {e}");
                metrics::record_validation_failure(e.kind());
            }
            metrics::record_document_write("rejected");
            Err(err.into())
        }
    }
}

/// `GET /api/canvas.png`: the current grid rendered as PNG.
#[tracing::instrument(name = "get_canvas_png", skip(state))]
pub async fn get_canvas_png(State(state): State<AppState>) -> Result<Response, ApiError> {
    let document = state.hub.current().ok_or_else(ApiError::not_found)?;
    let png = state.renderer.render_png(&document.grid).map_err(|e| {
        tracing::warn!("PNG export failed: {e}");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}
