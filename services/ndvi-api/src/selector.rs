//! Satellite fallback selection.
//!
//! For one period the selector walks
//! `TrySource(primary) -> Validate -> TrySource(fallback) -> Validate -> Resolve`.
//! A source is abandoned when it has no scene under the cloud threshold, or
//! when its least cloudy scene has no valid pixels over the region for the
//! requested product. Whatever source resolves the selection also fixes the
//! reduction scale for everything derived from it.

use ee_client::{
    CollectionQuery, EarthEngine, Geometry, ImageExpr, Reducer, Result, SceneCoverage,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::periods::DateWindow;
use crate::sources::{SatelliteSource, MAX_CLOUD_COVERAGE, SATELLITE_FALLBACK_ORDER};

/// Message reported when no source yields usable pixels.
pub const NO_DATA_MESSAGE: &str = "no image with valid pixels in region";

/// Derived image a selection is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    /// Normalized difference of the source's NIR and red bands, band `NDVI`.
    Ndvi,
    /// The source's red, green and blue bands.
    TrueColor,
}

impl Product {
    /// Masked, clipped product image for one scene of `source`.
    pub fn image(&self, source: &SatelliteSource, scene_id: &str, roi: &Geometry) -> ImageExpr {
        let masked = ImageExpr::scene(source.collection, scene_id).update_mask(source.pixel_mask());
        let product = match self {
            Product::Ndvi => {
                let [nir, red] = source.ndvi_bands;
                masked.normalized_difference(nir, red, "NDVI")
            }
            Product::TrueColor => masked.select(source.rgb_bands),
        };
        product.clip(roi.clone())
    }
}

/// A scene that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Selected {
    pub source: SatelliteSource,
    pub scene: SceneCoverage,
    /// Product image, already masked and clipped.
    pub image: ImageExpr,
}

impl Selected {
    /// Reduction scale matching the chosen source.
    pub fn scale(&self) -> f64 {
        self.source.scale
    }
}

/// Outcome of selection for one period.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Found(Selected),
    NoData,
}

/// Per-period record for [`Selection::NoData`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoDataRecord {
    pub error: &'static str,
    pub satellite: &'static str,
}

impl Default for NoDataRecord {
    fn default() -> Self {
        Self {
            error: NO_DATA_MESSAGE,
            satellite: "none",
        }
    }
}

enum SelectionState {
    TrySource(usize),
    Validate { index: usize, scene: SceneCoverage },
    Resolve(Selection),
}

/// Least cloudy scene strictly under [`MAX_CLOUD_COVERAGE`].
///
/// Ties keep the scene listed first, so the winner follows the backend's
/// iteration order.
pub fn least_cloudy(scenes: &[SceneCoverage]) -> Option<&SceneCoverage> {
    scenes
        .iter()
        .filter_map(|s| s.cloud_coverage.map(|c| (s, c)))
        .filter(|(_, c)| *c < MAX_CLOUD_COVERAGE)
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(s, _)| s)
}

/// Select a scene from the default fallback order.
pub async fn select_scene(
    engine: &dyn EarthEngine,
    roi: &Geometry,
    window: &DateWindow,
    product: Product,
) -> Result<Selection> {
    select_scene_from(engine, &SATELLITE_FALLBACK_ORDER, roi, window, product).await
}

/// Select a scene trying `sources` in order.
pub async fn select_scene_from(
    engine: &dyn EarthEngine,
    sources: &[SatelliteSource],
    roi: &Geometry,
    window: &DateWindow,
    product: Product,
) -> Result<Selection> {
    let mut state = SelectionState::TrySource(0);

    loop {
        state = match state {
            SelectionState::TrySource(index) => match sources.get(index) {
                None => SelectionState::Resolve(Selection::NoData),
                Some(source) => {
                    let query = CollectionQuery::new(
                        source.collection,
                        roi.clone(),
                        window.start_date.as_str(),
                        window.end_date.as_str(),
                    )
                    .with_cloud_estimator(source.cloud_estimator());

                    let scenes = engine.scene_cloud_coverage(&query).await?;
                    match least_cloudy(&scenes) {
                        Some(scene) => SelectionState::Validate {
                            index,
                            scene: scene.clone(),
                        },
                        None => {
                            debug!(
                                source = source.name,
                                candidates = scenes.len(),
                                "No scene under cloud threshold"
                            );
                            SelectionState::TrySource(index + 1)
                        }
                    }
                }
            },

            SelectionState::Validate { index, scene } => {
                let source = sources[index];
                let image = product.image(&source, &scene.id, roi);

                if has_valid_pixels(engine, &image, roi, source.scale).await? {
                    if index > 0 {
                        metrics::counter!("ndvi_api_fallbacks_total", "source" => source.name)
                            .increment(1);
                        info!(source = source.name, scene = %scene.id, "Resolved on fallback source");
                    }
                    SelectionState::Resolve(Selection::Found(Selected {
                        source,
                        scene,
                        image,
                    }))
                } else {
                    debug!(source = source.name, scene = %scene.id, "Scene has no valid pixels");
                    SelectionState::TrySource(index + 1)
                }
            }

            SelectionState::Resolve(selection) => return Ok(selection),
        };
    }
}

/// Whether `image` has at least one unmasked pixel over `roi`.
///
/// The count of the image's first band is used; a missing count means zero.
pub async fn has_valid_pixels(
    engine: &dyn EarthEngine,
    image: &ImageExpr,
    roi: &Geometry,
    scale: f64,
) -> Result<bool> {
    let counts = engine
        .reduce_region(image, &Reducer::Count, roi, scale)
        .await?;

    Ok(counts
        .values()
        .next()
        .and_then(|v| v.as_f64())
        .map_or(false, |count| count > 0.0))
}
