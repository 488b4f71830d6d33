//! HTTP request handlers.
//!
//! - `health`: backend health check and Prometheus metrics
//! - `ndvi`: composite NDVI and the single-product vegetation routes
//! - `climate`: point precipitation and temperature

pub mod climate;
pub mod health;
pub mod ndvi;

use std::time::Instant;

use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};
use tracing::error;

use crate::error::ApiError;
use crate::metrics::record_request;
use crate::response::{elapsed_seconds, project_info_value};
use crate::state::AppState;

/// Error response for `route`.
///
/// Validation errors carry only the message. Backend errors also report the
/// configured project and, when `started` is given, the elapsed time.
pub(crate) fn failure(
    route: &'static str,
    err: ApiError,
    state: &AppState,
    started: Option<Instant>,
) -> Response {
    if let ApiError::InvalidRequest(_) = err {
        return err.into_response();
    }

    error!(route, error = %err, "Request failed");
    let mut metadata = Map::new();
    if let Some(started) = started {
        metadata.insert(
            "processing_time_seconds".to_string(),
            Value::from(elapsed_seconds(started)),
        );
    }
    metadata.insert("project_info".to_string(), project_info_value(&state.project));
    err.into_response_with(metadata)
}

/// Record metrics for a finished request and pass the response through.
pub(crate) fn finish(route: &'static str, started: Instant, response: Response) -> Response {
    record_request(route, response.status(), started);
    response
}
