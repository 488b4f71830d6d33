//! Request metrics.

use std::time::Instant;

use axum::http::StatusCode;
use metrics::{counter, histogram};

/// Record one completed request on `route`.
pub fn record_request(route: &'static str, status: StatusCode, started: Instant) {
    counter!(
        "ndvi_api_requests_total",
        "route" => route,
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    histogram!("ndvi_api_request_duration_seconds", "route" => route)
        .record(started.elapsed().as_secs_f64());
}
