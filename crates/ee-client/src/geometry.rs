//! Geometry constructors.
//!
//! Geometries serialize as GeoJSON (`{"type": ..., "coordinates": ...}`) and
//! use lon/lat axis order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EeError, Result};

/// A lon/lat position.
pub type Position = [f64; 2];

/// Region of interest for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    Polygon(Vec<Vec<Position>>),
}

impl Geometry {
    /// Build a point from a `[lon, lat]` array.
    pub fn point(coordinates: &Value) -> Result<Self> {
        let position = parse_position(coordinates)
            .ok_or_else(|| EeError::invalid_geometry("point needs [lon, lat]"))?;
        Ok(Geometry::Point(position))
    }

    /// Build a polygon from GeoJSON rings (`[[[lon, lat], ...]]`).
    ///
    /// A single bare ring (`[[lon, lat], ...]`) is accepted and treated as
    /// the outer ring.
    pub fn polygon(coordinates: &Value) -> Result<Self> {
        let items = coordinates
            .as_array()
            .ok_or_else(|| EeError::invalid_geometry("polygon coordinates must be an array"))?;

        if items.is_empty() {
            return Err(EeError::invalid_geometry("polygon has no rings"));
        }

        // Bare ring: the first element is itself a position.
        let rings: Vec<Vec<Position>> = if parse_position(&items[0]).is_some() {
            vec![parse_ring(coordinates)?]
        } else {
            items.iter().map(parse_ring).collect::<Result<_>>()?
        };

        Ok(Geometry::Polygon(rings))
    }

    /// Whether this geometry is a point.
    pub fn is_point(&self) -> bool {
        matches!(self, Geometry::Point(_))
    }
}

fn parse_ring(value: &Value) -> Result<Vec<Position>> {
    let positions = value
        .as_array()
        .ok_or_else(|| EeError::invalid_geometry("ring must be an array of positions"))?;

    let ring = positions
        .iter()
        .map(|p| {
            parse_position(p)
                .ok_or_else(|| EeError::invalid_geometry(format!("invalid position: {}", p)))
        })
        .collect::<Result<Vec<_>>>()?;

    if ring.len() < 3 {
        return Err(EeError::invalid_geometry(format!(
            "ring needs at least 3 positions, got {}",
            ring.len()
        )));
    }
    Ok(ring)
}

fn parse_position(value: &Value) -> Option<Position> {
    match value.as_array()?.as_slice() {
        [lon, lat] => {
            let lon = lon.as_f64()?;
            let lat = lat.as_f64()?;
            (lon.is_finite() && lat.is_finite()).then_some([lon, lat])
        }
        _ => None,
    }
}
