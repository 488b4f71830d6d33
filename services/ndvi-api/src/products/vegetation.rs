//! Vegetation products resolved through satellite fallback.
//!
//! Each function handles every period of a request in order and returns a
//! `{period_i: record}` object. A period without usable imagery yields the
//! no-data record; backend failures abort the whole product.

use std::sync::Arc;

use ee_client::{EarthEngine, Reducer, Result, StretchValue, VisParams};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::request::RoiRequest;
use crate::selector::{select_scene, NoDataRecord, Product, Selected, Selection};

/// Lower stretch bound used when a band's 15th percentile is unavailable.
pub const DEFAULT_STRETCH_MIN: f64 = 300.0;
/// Upper stretch bound used when a band's 85th percentile is unavailable.
pub const DEFAULT_STRETCH_MAX: f64 = 1000.0;
pub const TRUE_COLOR_GAMMA: f64 = 1.3;

#[derive(Debug, Serialize)]
pub struct NdviStats {
    pub ndvi_mean: Option<f64>,
    pub ndvi_min: Option<f64>,
    pub ndvi_max: Option<f64>,
    pub satellite: &'static str,
    pub scale: f64,
}

#[derive(Debug, Serialize)]
pub struct TileRecord {
    pub tile_url: String,
    pub satellite: &'static str,
    pub scale: f64,
}

/// Red-yellow-green ramp over 0..0.8.
pub fn default_ndvi_vis() -> VisParams {
    VisParams {
        min: Some(StretchValue::Scalar(0.0)),
        max: Some(StretchValue::Scalar(0.8)),
        palette: Some(vec![
            "red".to_string(),
            "yellow".to_string(),
            "green".to_string(),
        ]),
        ..Default::default()
    }
}

async fn per_period<F, Fut>(
    engine: &dyn EarthEngine,
    request: &RoiRequest,
    product: Product,
    mut resolve: F,
) -> Result<Value>
where
    F: FnMut(Selected) -> Fut,
    Fut: std::future::Future<Output = Result<Value>>,
{
    let mut results = Map::new();
    for (name, window) in request.periods.iter() {
        let record = match select_scene(engine, &request.roi, window, product).await? {
            Selection::Found(selected) => resolve(selected).await?,
            Selection::NoData => serde_json::to_value(NoDataRecord::default())?,
        };
        results.insert(name.to_string(), record);
    }
    Ok(Value::Object(results))
}

/// NDVI mean/min/max per period.
#[instrument(skip_all, fields(periods = request.periods.len()))]
pub async fn ndvi_stats(engine: Arc<dyn EarthEngine>, request: Arc<RoiRequest>) -> Result<Value> {
    let engine = engine.as_ref();
    let roi = &request.roi;

    per_period(engine, &request, Product::Ndvi, |selected| async move {
        let stats = engine
            .reduce_region(&selected.image, &Reducer::MeanMinMax, roi, selected.scale())
            .await?;
        let field = |key: &str| stats.get(key).and_then(Value::as_f64);

        Ok(serde_json::to_value(NdviStats {
            ndvi_mean: field("NDVI_mean"),
            ndvi_min: field("NDVI_min"),
            ndvi_max: field("NDVI_max"),
            satellite: selected.source.name,
            scale: selected.scale(),
        })?)
    })
    .await
}

/// NDVI tile URL per period, rendered with the caller's `vis_params` or
/// [`default_ndvi_vis`].
#[instrument(skip_all, fields(periods = request.periods.len()))]
pub async fn ndvi_tiles(engine: Arc<dyn EarthEngine>, request: Arc<RoiRequest>) -> Result<Value> {
    let engine = engine.as_ref();
    let vis = request.vis_params.clone().unwrap_or_else(default_ndvi_vis);
    let vis = &vis;

    per_period(engine, &request, Product::Ndvi, |selected| async move {
        let tile_url = engine.tile_url(&selected.image, vis).await?;
        Ok(serde_json::to_value(TileRecord {
            tile_url,
            satellite: selected.source.name,
            scale: selected.scale(),
        })?)
    })
    .await
}

/// True-colour tile URL per period.
///
/// Without caller `vis_params`, each band is stretched between its 15th and
/// 85th percentile over the region. Bands always follow the chosen source.
#[instrument(skip_all, fields(periods = request.periods.len()))]
pub async fn true_color_tiles(
    engine: Arc<dyn EarthEngine>,
    request: Arc<RoiRequest>,
) -> Result<Value> {
    let engine = engine.as_ref();
    let roi = &request.roi;
    let custom = request.vis_params.as_ref();

    per_period(engine, &request, Product::TrueColor, |selected| async move {
        let bands: Vec<String> = selected
            .source
            .rgb_bands
            .iter()
            .map(|b| b.to_string())
            .collect();

        let vis = match custom {
            Some(custom) => VisParams {
                bands: Some(bands),
                ..custom.clone()
            },
            None => {
                let percentiles = engine
                    .reduce_region(
                        &selected.image,
                        &Reducer::Percentile {
                            percentiles: vec![15, 85],
                        },
                        roi,
                        selected.scale(),
                    )
                    .await?;
                percentile_stretch(&bands, &percentiles)
            }
        };

        let tile_url = engine.tile_url(&selected.image, &vis).await?;
        Ok(serde_json::to_value(TileRecord {
            tile_url,
            satellite: selected.source.name,
            scale: selected.scale(),
        })?)
    })
    .await
}

/// Per-band `p15..p85` stretch with fixed fallbacks for missing bands.
pub fn percentile_stretch(bands: &[String], percentiles: &Map<String, Value>) -> VisParams {
    let lookup = |band: &str, suffix: &str, fallback: f64| {
        percentiles
            .get(&format!("{}_{}", band, suffix))
            .and_then(Value::as_f64)
            .unwrap_or(fallback)
    };

    VisParams {
        bands: Some(bands.to_vec()),
        min: Some(StretchValue::PerBand(
            bands
                .iter()
                .map(|b| lookup(b, "p15", DEFAULT_STRETCH_MIN))
                .collect(),
        )),
        max: Some(StretchValue::PerBand(
            bands
                .iter()
                .map(|b| lookup(b, "p85", DEFAULT_STRETCH_MAX))
                .collect(),
        )),
        gamma: Some(TRUE_COLOR_GAMMA),
        palette: None,
    }
}
