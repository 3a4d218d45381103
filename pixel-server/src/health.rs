//! Health check endpoints for Kubernetes probes.
//!
//! - `/health/live` - Liveness probe (restart if fails)
//! - `/health/ready` - Readiness probe (remove from LB if fails)
//! - `/health` - Same as readiness

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

/// Health status response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Overall status: "healthy" or "unhealthy"
    pub status: &'static str,
    /// Server version
    pub version: &'static str,
    /// Individual component checks
    pub checks: HealthChecks,
}

/// Individual health checks.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    /// Document lock usable
    pub document_store: bool,
    /// Last persistence write succeeded (always true without a data dir)
    pub persistence: bool,
    /// A document has been written
    pub document_present: bool,
    /// Connected feeds
    pub feeds: usize,
}

/// Liveness probe - is the server running?
#[tracing::instrument(name = "liveness_probe")]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe - can the server accept writes?
///
/// An empty canvas is still ready; only an unusable store or failing disk
/// persistence reports unhealthy.
#[tracing::instrument(name = "readiness_probe", skip(state))]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let store_ok = state.hub.is_available();
    let persist_ok = state.hub.persistence_healthy();
    let all_ok = store_ok && persist_ok;

    let status = HealthStatus {
        status: if all_ok { "healthy" } else { "unhealthy" },
        version: env!("CARGO_PKG_VERSION"),
        checks: HealthChecks {
            document_store: store_ok,
            persistence: persist_ok,
            document_present: state.hub.current().is_some(),
            feeds: state.hub.subscriber_count(),
        },
    };

    let code = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_serialization() {
        let status = HealthStatus {
            status: "healthy",
            version: "0.2.0",
            checks: HealthChecks {
                document_store: true,
                persistence: true,
                document_present: false,
                feeds: 2,
            },
        };

        let json = serde_json::to_string(&status).expect("should serialize");
        assert!(json.contains("healthy"));
        assert!(json.contains("0.2.0"));
        assert!(json.contains("document_store"));
        assert!(json.contains("\"feeds\":2"));
    }

    #[tokio::test]
    async fn test_empty_hub_is_ready() {
        let (code, Json(status)) = readiness(State(AppState::new(crate::DocumentHub::new()))).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(status.status, "healthy");
        assert!(!status.checks.document_present);
    }
}
