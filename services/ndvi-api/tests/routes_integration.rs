//! Router-level tests against the in-memory backend.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use ee_client::Reducer;
use serde_json::{json, Value};
use test_utils::{collections, point_request, roi_request, MockEarthEngine};
use tower::ServiceExt;

use ndvi_api::app::router;
use ndvi_api::state::AppState;

fn app(mock: &Arc<MockEarthEngine>) -> Router {
    router(Arc::new(AppState::with_engine(mock.clone())))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn keys(body: &Value) -> Vec<&str> {
    body.as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect()
}

fn clear_sentinel() -> MockEarthEngine {
    MockEarthEngine::new()
        .with_scenes(collections::SENTINEL, &[("S2_A", 4.0), ("S2_B", 1.5)])
        .with_valid_pixels("S2_B", 1200)
        .with_reduction(
            "S2_B",
            &Reducer::MeanMinMax,
            json!({"NDVI_mean": 0.52, "NDVI_min": 0.05, "NDVI_max": 0.88}),
        )
}

// ============================================================================
// /health
// ============================================================================

#[tokio::test]
async fn test_health_reports_backend_info() {
    let mock = Arc::new(MockEarthEngine::new());
    let request = Request::get("/health").body(Body::empty()).unwrap();

    let (status, body) = send(app(&mock), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(
        body["backend_info"],
        json!({"project_id": "test-project", "status": "initialized", "source": "default"})
    );
    assert!(body["timestamp"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_health_unhealthy_on_initialization_failure() {
    let mock = Arc::new(MockEarthEngine::new().failing_initialize("credentials expired"));
    let request = Request::get("/health").body(Body::empty()).unwrap();

    let (status, body) = send(app(&mock), request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "unhealthy");
    assert!(body["error"].as_str().unwrap().contains("credentials expired"));
    assert!(body["timestamp"].is_number());
    assert!(body.get("backend_info").is_none());
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_invalid_roi_rejected_before_backend() {
    let mock = Arc::new(MockEarthEngine::new());

    for uri in [
        "/ndvi_composite",
        "/calculate_ndvi",
        "/get_ndvi_tiles",
        "/get_image_tile",
    ] {
        let (status, body) = send(app(&mock), post(uri, &json!({"roi": {}}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body, json!({"error": "invalid ROI GeoJSON (polygon)"}), "{}", uri);
    }

    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_missing_body_is_invalid_roi() {
    let mock = Arc::new(MockEarthEngine::new());
    let request = Request::post("/ndvi_composite").body(Body::empty()).unwrap();

    let (status, body) = send(app(&mock), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid ROI GeoJSON (polygon)");
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_invalid_point_rejected_before_backend() {
    let mock = Arc::new(MockEarthEngine::new());

    let (status, body) = send(
        app(&mock),
        post("/climate_stats", &json!({"point": {"type": "Point"}})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "invalid point GeoJSON"}));
    assert_eq!(mock.call_count(), 0);
}

// ============================================================================
// /ndvi_composite
// ============================================================================

#[tokio::test]
async fn test_ndvi_composite_shape() {
    let mock = Arc::new(clear_sentinel());
    let body = roi_request(&[("2024-01-01", "2024-01-31"), ("2024-02-01", "2024-02-29")]);

    let (status, body) = send(app(&mock), post("/ndvi_composite", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        keys(&body),
        vec!["ndvi", "ndvi_tiles", "processing_time_seconds", "project_info"]
    );
    assert_eq!(keys(&body["ndvi"]), vec!["period_1", "period_2"]);
    assert_eq!(body["ndvi"]["period_1"]["satellite"], "sentinel");
    assert_eq!(body["ndvi"]["period_1"]["ndvi_mean"], 0.52);
    assert_eq!(body["ndvi"]["period_1"]["scale"], 10.0);
    assert!(body["ndvi_tiles"]["period_2"]["tile_url"]
        .as_str()
        .unwrap()
        .ends_with("/maps/S2_B/tiles/{z}/{x}/{y}"));
    assert!(body["processing_time_seconds"].as_f64().unwrap() >= 0.0);
    assert_eq!(body["project_info"]["project_id"], "test-project");
}

#[tokio::test]
async fn test_ndvi_composite_default_period() {
    let mock = Arc::new(clear_sentinel());
    let body = json!({"roi": {"coordinates": test_utils::roi_coordinates()}});

    let (status, body) = send(app(&mock), post("/ndvi_composite", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(keys(&body["ndvi"]), vec!["period_1"]);
    assert_eq!(keys(&body["ndvi_tiles"]), vec!["period_1"]);
}

#[tokio::test]
async fn test_ndvi_composite_task_failures_are_isolated() {
    // Scenes list, but every query on the chosen scene fails.
    let mock = Arc::new(
        MockEarthEngine::new()
            .with_scenes(collections::SENTINEL, &[("S2_A", 1.0)])
            .failing("S2_A", "Computation timed out."),
    );
    let body = roi_request(&[("2024-01-01", "2024-01-31")]);

    let (status, body) = send(app(&mock), post("/ndvi_composite", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["ndvi"]["error"]
        .as_str()
        .unwrap()
        .contains("Computation timed out."));
    assert!(body["ndvi_tiles"]["error"].is_string());
    assert!(body["project_info"].is_object());
}

#[tokio::test]
async fn test_ndvi_composite_panicking_task_is_isolated() {
    let mock = Arc::new(clear_sentinel().panicking("S2_B", &Reducer::MeanMinMax));
    let body = roi_request(&[("2024-01-01", "2024-01-31")]);

    let (status, body) = send(app(&mock), post("/ndvi_composite", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["ndvi"],
        json!({"error": "task panicked: mock backend panic for S2_B"})
    );
    assert_eq!(body["ndvi_tiles"]["period_1"]["satellite"], "sentinel");
    assert!(body["ndvi_tiles"]["period_1"]["tile_url"].is_string());
}

#[tokio::test]
async fn test_ndvi_composite_backend_unavailable() {
    let mock = Arc::new(MockEarthEngine::new().failing_initialize("no credentials"));
    let body = roi_request(&[("2024-01-01", "2024-01-31")]);

    let (status, body) = send(app(&mock), post("/ndvi_composite", &body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("no credentials"));
    assert_eq!(body["project_info"]["project_id"], "test-project");
}

// ============================================================================
// /climate_stats
// ============================================================================

#[tokio::test]
async fn test_climate_stats_round_trip() {
    let mock = Arc::new(
        MockEarthEngine::new()
            .with_reduction(
                collections::CHIRPS,
                &Reducer::First,
                json!({"precip_sum": 120.0, "precip_mean": 4.0}),
            )
            .with_reduction(
                collections::ERA5_LAND,
                &Reducer::First,
                json!({"temp_min_k": 293.15, "temp_mean_k": 298.15, "temp_max_k": 303.15}),
            ),
    );
    let body = point_request(&[("2024-01-01", "2024-01-31")]);

    let (status, body) = send(app(&mock), post("/climate_stats", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        keys(&body),
        vec![
            "precipitation",
            "temperature",
            "processing_time_seconds",
            "project_info"
        ]
    );
    assert_eq!(body["precipitation"]["period_1"]["precipitation_sum"], 120.0);
    assert_eq!(body["precipitation"]["period_1"]["source"], "precipitation");
    let mean = body["temperature"]["period_1"]["temperature_mean_celsius"]
        .as_f64()
        .unwrap();
    assert!((mean - 25.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_climate_stats_one_failing_task() {
    let mock = Arc::new(MockEarthEngine::new().failing(collections::CHIRPS, "quota exceeded"));
    let body = point_request(&[("2024-01-01", "2024-01-31")]);

    let (status, body) = send(app(&mock), post("/climate_stats", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["precipitation"]["error"]
        .as_str()
        .unwrap()
        .contains("quota exceeded"));
    assert_eq!(body["temperature"]["period_1"]["source"], "temperature");
}

#[tokio::test]
async fn test_climate_stats_backend_unavailable_reports_timing() {
    let mock = Arc::new(MockEarthEngine::new().failing_initialize("no credentials"));
    let body = point_request(&[("2024-01-01", "2024-01-31")]);

    let (status, body) = send(app(&mock), post("/climate_stats", &body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        keys(&body),
        vec!["error", "processing_time_seconds", "project_info"]
    );
}

// ============================================================================
// Single-product routes
// ============================================================================

#[tokio::test]
async fn test_calculate_ndvi_returns_bare_period_map() {
    let mock = Arc::new(clear_sentinel());
    let body = roi_request(&[("2024-01-01", "2024-01-31")]);

    let (status, body) = send(app(&mock), post("/calculate_ndvi", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(keys(&body), vec!["period_1"]);
    assert_eq!(body["period_1"]["ndvi_max"], 0.88);
}

#[tokio::test]
async fn test_get_ndvi_tiles_no_data() {
    let mock = Arc::new(MockEarthEngine::new());
    let body = roi_request(&[("2024-01-01", "2024-01-31")]);

    let (status, body) = send(app(&mock), post("/get_ndvi_tiles", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["period_1"],
        json!({"error": "no image with valid pixels in region", "satellite": "none"})
    );
}

#[tokio::test]
async fn test_get_image_tile_uses_true_color() {
    let mock = Arc::new(clear_sentinel());
    let body = roi_request(&[("2024-01-01", "2024-01-31")]);

    let (status, body) = send(app(&mock), post("/get_image_tile", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["period_1"]["satellite"], "sentinel");
    assert!(mock
        .reduce_calls()
        .iter()
        .any(|c| matches!(c.reducer, Reducer::Percentile { .. })));
}

#[tokio::test]
async fn test_single_product_backend_failure() {
    let mock = Arc::new(MockEarthEngine::new().failing(collections::SENTINEL, "bad request"));
    let body = roi_request(&[("2024-01-01", "2024-01-31")]);

    let (status, body) = send(app(&mock), post("/get_ndvi_tiles", &body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("bad request"));
    assert!(body["project_info"].is_object());
}
