//! Point climate statistics.
//!
//! Each period is reduced in a single backend round-trip: the per-pixel
//! aggregates are concatenated into one image and sampled with `first`.

use std::sync::Arc;

use ee_client::{
    Aggregate, CollectionQuery, EarthEngine, Geometry, ImageExpr, Reducer, Result,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::periods::DateWindow;
use crate::request::PointRequest;
use crate::sources::{ClimateSource, CHIRPS, ERA5_LAND};

const KELVIN_OFFSET: f64 = 273.15;

#[derive(Debug, Serialize)]
pub struct PrecipitationStats {
    pub precipitation_sum: Option<f64>,
    pub precipitation_daily_mean: Option<f64>,
    pub source: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TemperatureStats {
    pub temperature_min_celsius: Option<f64>,
    pub temperature_mean_celsius: Option<f64>,
    pub temperature_max_celsius: Option<f64>,
    pub source: &'static str,
}

pub fn kelvin_to_celsius(kelvin: Option<f64>) -> Option<f64> {
    kelvin.map(|k| k - KELVIN_OFFSET)
}

/// Concatenation of `aggregates` over the window, bands renamed to `names`.
fn aggregate_image(
    source: &ClimateSource,
    point: &Geometry,
    window: &DateWindow,
    aggregates: &[(Aggregate, &str)],
) -> ImageExpr {
    let query = CollectionQuery::new(
        source.collection,
        point.clone(),
        window.start_date.as_str(),
        window.end_date.as_str(),
    )
    .select([source.band]);

    ImageExpr::cat(
        aggregates
            .iter()
            .map(|(aggregate, _)| ImageExpr::composite(query.clone(), *aggregate))
            .collect(),
    )
    .rename(aggregates.iter().map(|(_, name)| *name))
}

async fn sample(
    engine: &dyn EarthEngine,
    source: &ClimateSource,
    point: &Geometry,
    window: &DateWindow,
    aggregates: &[(Aggregate, &str)],
) -> Result<Map<String, Value>> {
    let image = aggregate_image(source, point, window, aggregates);
    engine
        .reduce_region(&image, &Reducer::First, point, source.scale)
        .await
}

/// Precipitation total and daily mean per period.
#[instrument(skip_all, fields(periods = request.periods.len()))]
pub async fn precipitation(
    engine: Arc<dyn EarthEngine>,
    request: Arc<PointRequest>,
) -> Result<Value> {
    let mut results = Map::new();
    for (name, window) in request.periods.iter() {
        let stats = sample(
            engine.as_ref(),
            &CHIRPS,
            &request.point,
            window,
            &[(Aggregate::Sum, "precip_sum"), (Aggregate::Mean, "precip_mean")],
        )
        .await?;

        let record = PrecipitationStats {
            precipitation_sum: stats.get("precip_sum").and_then(Value::as_f64),
            precipitation_daily_mean: stats.get("precip_mean").and_then(Value::as_f64),
            source: "precipitation",
        };
        results.insert(name.to_string(), serde_json::to_value(record)?);
    }
    Ok(Value::Object(results))
}

/// 2 m temperature min/mean/max in Celsius per period.
#[instrument(skip_all, fields(periods = request.periods.len()))]
pub async fn temperature(
    engine: Arc<dyn EarthEngine>,
    request: Arc<PointRequest>,
) -> Result<Value> {
    let mut results = Map::new();
    for (name, window) in request.periods.iter() {
        let stats = sample(
            engine.as_ref(),
            &ERA5_LAND,
            &request.point,
            window,
            &[
                (Aggregate::Min, "temp_min_k"),
                (Aggregate::Mean, "temp_mean_k"),
                (Aggregate::Max, "temp_max_k"),
            ],
        )
        .await?;
        let kelvin = |key: &str| stats.get(key).and_then(Value::as_f64);

        let record = TemperatureStats {
            temperature_min_celsius: kelvin_to_celsius(kelvin("temp_min_k")),
            temperature_mean_celsius: kelvin_to_celsius(kelvin("temp_mean_k")),
            temperature_max_celsius: kelvin_to_celsius(kelvin("temp_max_k")),
            source: "temperature",
        };
        results.insert(name.to_string(), serde_json::to_value(record)?);
    }
    Ok(Value::Object(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_utils::{assert_approx_eq, point_request, MockEarthEngine};

    fn request(periods: &[(&str, &str)]) -> Arc<PointRequest> {
        Arc::new(PointRequest::from_body(&point_request(periods)).unwrap())
    }

    #[test]
    fn test_kelvin_to_celsius() {
        assert_approx_eq!(kelvin_to_celsius(Some(300.0)).unwrap(), 26.85, 1e-9);
        assert_eq!(kelvin_to_celsius(None), None);
    }

    #[test]
    fn test_aggregate_image_renames_in_order() {
        let image = aggregate_image(
            &CHIRPS,
            &Geometry::Point([0.0, 0.0]),
            &DateWindow::new("2024-01-01", "2024-01-31"),
            &[(Aggregate::Sum, "precip_sum"), (Aggregate::Mean, "precip_mean")],
        );
        match image {
            ImageExpr::Rename { input, names } => {
                assert_eq!(names, vec!["precip_sum", "precip_mean"]);
                assert!(matches!(*input, ImageExpr::Cat { ref inputs } if inputs.len() == 2));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_precipitation_per_period() {
        let mock = Arc::new(MockEarthEngine::new().with_reduction(
            CHIRPS.collection,
            &Reducer::First,
            json!({"precip_sum": 182.5, "precip_mean": 5.89}),
        ));

        let result = precipitation(mock.clone(), request(&[("2024-01-01", "2024-01-31")]))
            .await
            .unwrap();

        assert_eq!(
            result["period_1"],
            json!({
                "precipitation_sum": 182.5,
                "precipitation_daily_mean": 5.89,
                "source": "precipitation"
            })
        );
        let calls = mock.reduce_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].scale, CHIRPS.scale);
    }

    #[tokio::test]
    async fn test_temperature_converts_and_keeps_missing_as_null() {
        let mock = Arc::new(MockEarthEngine::new().with_reduction(
            ERA5_LAND.collection,
            &Reducer::First,
            json!({"temp_min_k": 290.15, "temp_max_k": 305.15}),
        ));

        let result = temperature(mock, request(&[("2024-01-01", "2024-01-31")]))
            .await
            .unwrap();

        let period = &result["period_1"];
        assert_approx_eq!(period["temperature_min_celsius"].as_f64().unwrap(), 17.0, 1e-9);
        assert_approx_eq!(period["temperature_max_celsius"].as_f64().unwrap(), 32.0, 1e-9);
        assert!(period["temperature_mean_celsius"].is_null());
        assert_eq!(period["source"], "temperature");
    }

    #[tokio::test]
    async fn test_backend_failure_fails_product() {
        let mock = Arc::new(MockEarthEngine::new().failing(ERA5_LAND.collection, "timeout"));
        let err = temperature(mock, request(&[("2024-01-01", "2024-01-31")]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }
}
