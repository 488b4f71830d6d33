//! Point climate route.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::Extension,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};
use tracing::info;

use super::{failure, finish};
use crate::error::ApiError;
use crate::products::climate;
use crate::request::{parse_body, PointRequest};
use crate::response::assemble;
use crate::state::AppState;
use crate::tasks::TaskGroup;

async fn climate_stats(
    state: &AppState,
    body: &[u8],
    started: Instant,
) -> Result<Map<String, Value>, ApiError> {
    let request = Arc::new(PointRequest::from_body(&parse_body(body))?);
    let engine = state.backend.client().await?;
    info!(periods = request.periods.len(), "Climate statistics request");

    let mut tasks = TaskGroup::new();
    tasks.spawn(
        "precipitation",
        climate::precipitation(Arc::clone(&engine), Arc::clone(&request)),
    );
    tasks.spawn("temperature", climate::temperature(engine, request));

    Ok(assemble(tasks.join().await, started, &state.project))
}

/// POST /climate_stats - Precipitation and temperature for every period
pub async fn climate_stats_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> Response {
    const ROUTE: &str = "/climate_stats";
    let started = Instant::now();

    let response = match climate_stats(&state, &body, started).await {
        Ok(results) => Json(Value::Object(results)).into_response(),
        Err(e) => failure(ROUTE, e, &state, Some(started)),
    };
    finish(ROUTE, started, response)
}
