//! Image and collection expressions evaluated by the backend.
//!
//! Nothing here touches pixels. Expressions are plain data that serialize to
//! JSON and are shipped to the backend for evaluation, the same way a
//! computation graph is.

use serde::{Deserialize, Serialize};

use crate::geometry::Geometry;

/// Per-pixel validity mask applied to a scene before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PixelMask {
    /// Keep pixels whose classification value is one of `keep`.
    ClassIn { band: String, keep: Vec<u8> },
    /// Keep pixels where every listed QA bit is clear.
    BitsClear { band: String, bits: Vec<u8> },
}

/// How the backend estimates cloud coverage of a scene over the region.
///
/// The result is a percentage (0-100) of region pixels flagged as cloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CloudEstimator {
    /// Mean of `band ∈ classes`, times 100.
    ClassFraction {
        band: String,
        classes: Vec<u8>,
        scale: f64,
    },
    /// Mean of `(band & (1 << bit)) != 0`, times 100.
    BitFraction { band: String, bit: u8, scale: f64 },
}

/// A filtered image collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionQuery {
    /// Collection identifier, e.g. `COPERNICUS/S2_SR_HARMONIZED`.
    pub collection: String,
    /// Spatial filter.
    pub bounds: Geometry,
    /// Inclusive start date (`YYYY-MM-DD`).
    pub start_date: String,
    /// Exclusive end date (`YYYY-MM-DD`).
    pub end_date: String,
    /// Band selection; empty keeps every band.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bands: Vec<String>,
    /// Cloud estimator mapped over each scene, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_estimator: Option<CloudEstimator>,
}

impl CollectionQuery {
    pub fn new(
        collection: impl Into<String>,
        bounds: Geometry,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            bounds,
            start_date: start_date.into(),
            end_date: end_date.into(),
            bands: Vec::new(),
            cloud_estimator: None,
        }
    }

    pub fn select<I, S>(mut self, bands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bands = bands.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cloud_estimator(mut self, estimator: CloudEstimator) -> Self {
        self.cloud_estimator = Some(estimator);
        self
    }
}

/// Collection-wide per-pixel aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    Sum,
    Mean,
    Min,
    Max,
}

/// An image expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ImageExpr {
    /// A single scene of a collection.
    Scene { collection: String, id: String },
    /// A collection reduced pixel-wise to a single image.
    Composite {
        query: CollectionQuery,
        aggregate: Aggregate,
    },
    UpdateMask {
        input: Box<ImageExpr>,
        mask: PixelMask,
    },
    Select {
        input: Box<ImageExpr>,
        bands: Vec<String>,
    },
    Rename {
        input: Box<ImageExpr>,
        names: Vec<String>,
    },
    /// `(a - b) / (a + b)` over two bands, output band `name`.
    NormalizedDifference {
        input: Box<ImageExpr>,
        bands: [String; 2],
        name: String,
    },
    Clip {
        input: Box<ImageExpr>,
        geometry: Geometry,
    },
    /// Band-wise concatenation.
    Cat { inputs: Vec<ImageExpr> },
}

impl ImageExpr {
    pub fn scene(collection: impl Into<String>, id: impl Into<String>) -> Self {
        ImageExpr::Scene {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn composite(query: CollectionQuery, aggregate: Aggregate) -> Self {
        ImageExpr::Composite { query, aggregate }
    }

    pub fn cat(inputs: Vec<ImageExpr>) -> Self {
        ImageExpr::Cat { inputs }
    }

    pub fn update_mask(self, mask: PixelMask) -> Self {
        ImageExpr::UpdateMask {
            input: Box::new(self),
            mask,
        }
    }

    pub fn select<I, S>(self, bands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ImageExpr::Select {
            input: Box::new(self),
            bands: bands.into_iter().map(Into::into).collect(),
        }
    }

    pub fn rename<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ImageExpr::Rename {
            input: Box::new(self),
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn normalized_difference(
        self,
        a: impl Into<String>,
        b: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        ImageExpr::NormalizedDifference {
            input: Box::new(self),
            bands: [a.into(), b.into()],
            name: name.into(),
        }
    }

    pub fn clip(self, geometry: Geometry) -> Self {
        ImageExpr::Clip {
            input: Box::new(self),
            geometry,
        }
    }
}

/// Region reducer.
///
/// Output keys follow the backend convention: a single-output reducer keys
/// results by band name; combined reducers suffix the band name
/// (`NDVI_mean`, `NDVI_min`, `NDVI_max`, `B4_p15`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reducer {
    Count,
    First,
    Mean,
    /// Mean combined with min/max over shared inputs.
    MeanMinMax,
    Percentile { percentiles: Vec<u8> },
}

/// A min/max stretch bound: one value for all bands, or one per band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StretchValue {
    Scalar(f64),
    PerBand(Vec<f64>),
}

/// Visualization parameters for tile rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bands: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<StretchValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<StretchValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f64>,
}
