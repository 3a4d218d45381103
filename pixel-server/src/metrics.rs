//! Prometheus metrics for pixel-server.
//!
//! Provides metrics collection and a Prometheus-compatible `/metrics` endpoint.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

const HTTP_REQUESTS_TOTAL: &str = "pixelpals_http_requests_total";
const HTTP_REQUEST_DURATION: &str = "pixelpals_http_request_duration_seconds";
const WS_CONNECTIONS_ACTIVE: &str = "pixelpals_ws_connections_active";
const WS_MESSAGES_TOTAL: &str = "pixelpals_ws_messages_total";
const DOCUMENT_WRITES_TOTAL: &str = "pixelpals_document_writes_total";
const VALIDATION_FAILURES_TOTAL: &str = "pixelpals_validation_failures_total";

/// Initialize metrics and return the Prometheus handle.
///
/// # Errors
///
/// Returns an error if the Prometheus recorder cannot be installed
/// (e.g., if another recorder is already installed).
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Record an HTTP request.
///
/// # Arguments
///
/// * `method` - HTTP method (GET, PUT, etc.)
/// * `path` - Matched route or raw path
/// * `status` - HTTP status code
/// * `duration_secs` - Request duration in seconds
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        HTTP_REQUEST_DURATION,
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

/// Middleware recording every request through [`record_http_request`].
pub async fn track_http(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<axum::extract::MatchedPath>()
        .map_or_else(|| request.uri().path().to_string(), |p| p.as_str().to_string());

    let response = next.run(request).await;
    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

/// Increment active WebSocket connections.
pub fn inc_ws_connections() {
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
}

/// Decrement active WebSocket connections.
pub fn dec_ws_connections() {
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a WebSocket message.
///
/// # Arguments
///
/// * `direction` - "inbound" or "outbound"
/// * `msg_type` - Message type (e.g., "snapshot", "ping")
pub fn record_ws_message(direction: &str, msg_type: &str) {
    counter!(
        WS_MESSAGES_TOTAL,
        "direction" => direction.to_string(),
        "type" => msg_type.to_string()
    )
    .increment(1);
}

/// Record a document write attempt.
///
/// * `outcome` - "accepted" or "rejected"
pub fn record_document_write(outcome: &str) {
    counter!(DOCUMENT_WRITES_TOTAL, "outcome" => outcome.to_string()).increment(1);
}

/// Record an input validation failure.
///
/// # Arguments
///
/// * `validation_type` - Type of validation that failed (updated_by, dimensions, etc.)
pub fn record_validation_failure(validation_type: &str) {
    counter!(
        VALIDATION_FAILURES_TOTAL,
        "type" => validation_type.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn test_recorded_metrics_render() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_document_write("accepted");
            record_validation_failure("dimensions");
            record_ws_message("outbound", "snapshot");
        });

        let rendered = handle.render();
        assert!(rendered.contains(DOCUMENT_WRITES_TOTAL));
        assert!(rendered.contains("outcome=\"accepted\""));
        assert!(rendered.contains(VALIDATION_FAILURES_TOTAL));
        assert!(rendered.contains(WS_MESSAGES_TOTAL));
    }

    #[test]
    fn test_functions_are_noops_without_recorder() {
        inc_ws_connections();
        dec_ws_connections();
        record_http_request("GET", "/health", 200, 0.001);
    }
}
