//! Request body validation.
//!
//! Bodies are parsed leniently as JSON; anything that lacks the required
//! geometry is rejected here, before the backend is touched.

use ee_client::{Geometry, VisParams};
use serde_json::Value;

use crate::error::ApiError;
use crate::periods::{extract_periods, Periods};

pub const INVALID_ROI: &str = "invalid ROI GeoJSON (polygon)";
pub const INVALID_POINT: &str = "invalid point GeoJSON";

/// A validated polygon request.
#[derive(Debug, Clone)]
pub struct RoiRequest {
    pub roi: Geometry,
    pub periods: Periods,
    /// Caller-supplied visualization, if any.
    pub vis_params: Option<VisParams>,
}

/// A validated point request.
#[derive(Debug, Clone)]
pub struct PointRequest {
    pub point: Geometry,
    pub periods: Periods,
}

/// Parse a raw body; empty or non-JSON bodies become `null`.
pub fn parse_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap_or(Value::Null)
}

fn coordinates<'a>(body: &'a Value, key: &str) -> Option<&'a Value> {
    body.get(key)?.get("coordinates")
}

impl RoiRequest {
    pub fn from_body(body: &Value) -> Result<Self, ApiError> {
        let coords =
            coordinates(body, "roi").ok_or_else(|| ApiError::invalid_request(INVALID_ROI))?;

        let roi = Geometry::polygon(coords)
            .map_err(|e| ApiError::invalid_request(format!("{}: {}", INVALID_ROI, e)))?;

        let vis_params = match body.get("vis_params") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                serde_json::from_value(value.clone())
                    .map_err(|e| ApiError::invalid_request(format!("invalid vis_params: {}", e)))?,
            ),
        };

        Ok(Self {
            roi,
            periods: extract_periods(body),
            vis_params,
        })
    }
}

impl PointRequest {
    pub fn from_body(body: &Value) -> Result<Self, ApiError> {
        let coords =
            coordinates(body, "point").ok_or_else(|| ApiError::invalid_request(INVALID_POINT))?;

        let point = Geometry::point(coords)
            .map_err(|e| ApiError::invalid_request(format!("{}: {}", INVALID_POINT, e)))?;

        Ok(Self {
            point,
            periods: extract_periods(body),
        })
    }
}
