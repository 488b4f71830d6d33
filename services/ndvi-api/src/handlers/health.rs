//! Health and metrics handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use ee_client::ProjectInfo;
use serde::Serialize;

use super::finish;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_info: Option<ProjectInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: f64,
}

/// Current time as fractional Unix seconds.
fn unix_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// GET /health - Initializes the backend if needed and reports its identity
pub async fn health_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    let started = Instant::now();

    let (status, body) = match state.backend.client().await {
        Ok(client) => (
            StatusCode::OK,
            HealthResponse {
                status: "healthy",
                backend_info: Some(client.project_info()),
                error: None,
                timestamp: unix_timestamp(),
            },
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            HealthResponse {
                status: "unhealthy",
                backend_info: None,
                error: Some(e.to_string()),
                timestamp: unix_timestamp(),
            },
        ),
    };

    finish("/health", started, (status, Json(body)).into_response())
}

/// GET /metrics - Prometheus metrics
pub async fn metrics_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    match state.prometheus {
        Some(ref handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics exporter not installed").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_timestamp_is_fractional_seconds() {
        let ts = unix_timestamp();
        // after 2020-01-01
        assert!(ts > 1_577_836_800.0);
    }

    #[test]
    fn test_unhealthy_response_omits_backend_info() {
        let body = serde_json::to_value(HealthResponse {
            status: "unhealthy",
            backend_info: None,
            error: Some("no credentials".to_string()),
            timestamp: 1.5,
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({"status": "unhealthy", "error": "no credentials", "timestamp": 1.5})
        );
    }
}
