//! The backend operation set.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::expr::{CollectionQuery, ImageExpr, Reducer, VisParams};
use crate::geometry::Geometry;

/// Maximum pixels a single region reduction may touch.
pub const MAX_PIXELS: f64 = 1e6;

/// One scene of a filtered collection with its cloud coverage over the region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneCoverage {
    /// Scene identifier within its collection.
    pub id: String,
    /// Cloud coverage over the query bounds, in percent. `None` when the
    /// backend could not estimate it (e.g. no overlapping pixels).
    pub cloud_coverage: Option<f64>,
}

/// Where the backend project identifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectSource {
    EnvironmentVariable,
    Default,
}

/// Backend identity reported alongside responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub project_id: String,
    pub status: String,
    pub source: ProjectSource,
}

impl ProjectInfo {
    pub fn initialized(project_id: impl Into<String>, source: ProjectSource) -> Self {
        Self {
            project_id: project_id.into(),
            status: "initialized".to_string(),
            source,
        }
    }
}

/// Remote earth-observation processing backend.
///
/// Implementations must be cheap to share across concurrent tasks; all
/// methods take `&self`.
#[async_trait]
pub trait EarthEngine: Send + Sync {
    /// Verify credentials and connectivity.
    async fn initialize(&self) -> Result<()>;

    /// Scenes of `query` with cloud coverage computed by the query's
    /// estimator, in backend iteration order.
    async fn scene_cloud_coverage(&self, query: &CollectionQuery) -> Result<Vec<SceneCoverage>>;

    /// Reduce `image` over `geometry` at `scale` metres per pixel.
    async fn reduce_region(
        &self,
        image: &ImageExpr,
        reducer: &Reducer,
        geometry: &Geometry,
        scale: f64,
    ) -> Result<Map<String, Value>>;

    /// Templated `{z}/{x}/{y}` tile URL rendering `image` with `vis`.
    async fn tile_url(&self, image: &ImageExpr, vis: &VisParams) -> Result<String>;

    /// Identity of the backend project this client talks to.
    fn project_info(&self) -> ProjectInfo;
}
