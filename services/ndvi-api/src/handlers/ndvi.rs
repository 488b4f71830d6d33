//! Vegetation routes.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::Extension,
    response::{IntoResponse, Response},
    Json,
};
use ee_client::EarthEngine;
use serde_json::{Map, Value};
use tracing::info;

use super::{failure, finish};
use crate::error::ApiError;
use crate::products::vegetation;
use crate::request::{parse_body, RoiRequest};
use crate::response::assemble;
use crate::state::AppState;
use crate::tasks::TaskGroup;

async fn ndvi_composite(
    state: &AppState,
    body: &[u8],
    started: Instant,
) -> Result<Map<String, Value>, ApiError> {
    let request = Arc::new(RoiRequest::from_body(&parse_body(body))?);
    let engine = state.backend.client().await?;
    info!(periods = request.periods.len(), "NDVI composite request");

    let mut tasks = TaskGroup::new();
    tasks.spawn(
        "ndvi",
        vegetation::ndvi_stats(Arc::clone(&engine), Arc::clone(&request)),
    );
    tasks.spawn("ndvi_tiles", vegetation::ndvi_tiles(engine, request));

    Ok(assemble(tasks.join().await, started, &state.project))
}

/// POST /ndvi_composite - NDVI statistics and tiles for every period
pub async fn ndvi_composite_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> Response {
    const ROUTE: &str = "/ndvi_composite";
    let started = Instant::now();

    let response = match ndvi_composite(&state, &body, started).await {
        Ok(results) => Json(Value::Object(results)).into_response(),
        Err(e) => failure(ROUTE, e, &state, None),
    };
    finish(ROUTE, started, response)
}

/// Run one vegetation product inline and return its period map as-is.
async fn single_product<F, Fut>(
    route: &'static str,
    state: Arc<AppState>,
    body: Bytes,
    product: F,
) -> Response
where
    F: FnOnce(Arc<dyn EarthEngine>, Arc<RoiRequest>) -> Fut,
    Fut: Future<Output = ee_client::Result<Value>>,
{
    let started = Instant::now();

    let result = async {
        let request = Arc::new(RoiRequest::from_body(&parse_body(&body))?);
        let engine = state.backend.client().await?;
        Ok::<_, ApiError>(product(engine, request).await?)
    }
    .await;

    let response = match result {
        Ok(value) => Json(value).into_response(),
        Err(e) => failure(route, e, &state, None),
    };
    finish(route, started, response)
}

/// POST /calculate_ndvi - NDVI statistics only
pub async fn calculate_ndvi_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> Response {
    single_product("/calculate_ndvi", state, body, vegetation::ndvi_stats).await
}

/// POST /get_ndvi_tiles - NDVI tile URLs only
pub async fn ndvi_tiles_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> Response {
    single_product("/get_ndvi_tiles", state, body, vegetation::ndvi_tiles).await
}

/// POST /get_image_tile - True-colour tile URLs
pub async fn image_tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> Response {
    single_product("/get_image_tile", state, body, vegetation::true_color_tiles).await
}
