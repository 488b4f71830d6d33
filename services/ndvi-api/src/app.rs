//! Router construction.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::state::AppState;

/// Build the service router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        // Multi-product routes
        .route(
            "/ndvi_composite",
            post(handlers::ndvi::ndvi_composite_handler),
        )
        .route(
            "/climate_stats",
            post(handlers::climate::climate_stats_handler),
        )
        // Single-product routes
        .route(
            "/calculate_ndvi",
            post(handlers::ndvi::calculate_ndvi_handler),
        )
        .route("/get_ndvi_tiles", post(handlers::ndvi::ndvi_tiles_handler))
        .route("/get_image_tile", post(handlers::ndvi::image_tile_handler))
        // Middleware
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
