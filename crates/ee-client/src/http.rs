//! HTTP implementation of [`EarthEngine`].
//!
//! Expressions are POSTed as JSON to the project's `value:compute` endpoint;
//! tile rendering goes through the `maps` endpoint, whose returned map name
//! is expanded into a `{z}/{x}/{y}` URL template.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::client::{EarthEngine, ProjectInfo, ProjectSource, SceneCoverage, MAX_PIXELS};
use crate::error::{EeError, Result};
use crate::expr::{CollectionQuery, ImageExpr, Reducer, VisParams};
use crate::geometry::Geometry;

/// Connection settings for [`HttpEarthEngine`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// API root, e.g. `https://earthengine.googleapis.com`.
    pub base_url: String,
    /// Backend project identifier.
    pub project_id: String,
    /// Whether `project_id` came from the environment or the built-in default.
    pub project_source: ProjectSource,
    /// Bearer token sent with every request.
    pub access_token: Option<String>,
    /// Per-request timeout. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

/// Backend client speaking JSON over HTTP.
pub struct HttpEarthEngine {
    client: Client,
    config: HttpConfig,
}

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Computation<'a> {
    Constant {
        value: f64,
    },
    SceneCloudCoverage {
        query: &'a CollectionQuery,
    },
    ReduceRegion {
        image: &'a ImageExpr,
        reducer: &'a Reducer,
        geometry: &'a Geometry,
        scale: f64,
        max_pixels: f64,
    },
}

#[derive(Serialize)]
struct ComputeRequest<'a> {
    expression: Computation<'a>,
}

#[derive(Deserialize)]
struct ComputeResponse {
    result: Value,
}

#[derive(Serialize)]
struct MapRequest<'a> {
    expression: &'a ImageExpr,
    visualization: &'a VisParams,
}

#[derive(Deserialize)]
struct MapResponse {
    name: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpEarthEngine {
    /// Build the client without contacting the backend.
    pub fn new(config: HttpConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true);

        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| EeError::initialization(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Build the client and verify the backend is reachable.
    pub async fn connect(config: HttpConfig) -> Result<Self> {
        let engine = Self::new(config)?;
        engine.initialize().await?;
        Ok(engine)
    }

    fn project_url(&self, suffix: &str) -> String {
        format!(
            "{}/v1/projects/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.project_id,
            suffix
        )
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<R> {
        let mut request = self.client.post(url).json(body);
        if let Some(ref token) = self.config.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(backend_error(status, &bytes));
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn compute(&self, expression: Computation<'_>) -> Result<Value> {
        let url = self.project_url("value:compute");
        let response: ComputeResponse = self.post(&url, &ComputeRequest { expression }).await?;
        Ok(response.result)
    }
}

fn backend_error(status: StatusCode, body: &[u8]) -> EeError {
    let message = serde_json::from_slice::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());

    EeError::Backend {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl EarthEngine for HttpEarthEngine {
    #[instrument(skip(self), fields(project = %self.config.project_id))]
    async fn initialize(&self) -> Result<()> {
        let value = self
            .compute(Computation::Constant { value: 1.0 })
            .await
            .map_err(|e| EeError::initialization(e.to_string()))?;

        if value.as_f64() != Some(1.0) {
            return Err(EeError::initialization(format!(
                "connectivity probe returned {}",
                value
            )));
        }
        debug!("Backend connectivity probe succeeded");
        Ok(())
    }

    #[instrument(skip(self, query), fields(collection = %query.collection))]
    async fn scene_cloud_coverage(&self, query: &CollectionQuery) -> Result<Vec<SceneCoverage>> {
        let value = self
            .compute(Computation::SceneCloudCoverage { query })
            .await?;
        let scenes: Vec<SceneCoverage> = serde_json::from_value(value)?;
        debug!(scenes = scenes.len(), "Fetched scene cloud coverage");
        Ok(scenes)
    }

    #[instrument(skip(self, image, geometry))]
    async fn reduce_region(
        &self,
        image: &ImageExpr,
        reducer: &Reducer,
        geometry: &Geometry,
        scale: f64,
    ) -> Result<Map<String, Value>> {
        let value = self
            .compute(Computation::ReduceRegion {
                image,
                reducer,
                geometry,
                scale,
                max_pixels: MAX_PIXELS,
            })
            .await?;

        match value {
            Value::Object(map) => Ok(map),
            // A reduction over zero pixels comes back as null.
            Value::Null => Ok(Map::new()),
            other => Err(EeError::invalid_response(format!(
                "reduce_region expected an object, got {}",
                other
            ))),
        }
    }

    #[instrument(skip(self, image, vis))]
    async fn tile_url(&self, image: &ImageExpr, vis: &VisParams) -> Result<String> {
        let url = self.project_url("maps");
        let response: MapResponse = self
            .post(
                &url,
                &MapRequest {
                    expression: image,
                    visualization: vis,
                },
            )
            .await?;

        Ok(format!(
            "{}/v1/{}/tiles/{{z}}/{{x}}/{{y}}",
            self.config.base_url.trim_end_matches('/'),
            response.name
        ))
    }

    fn project_info(&self) -> ProjectInfo {
        ProjectInfo::initialized(self.config.project_id.clone(), self.config.project_source)
    }
}
