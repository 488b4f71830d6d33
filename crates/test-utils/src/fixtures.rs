//! Common request fixtures.
//!
//! Request bodies are plain JSON values, the same shape the HTTP routes
//! receive.

use serde_json::{json, Value};

/// Collection identifiers used by the service's source catalog.
pub mod collections {
    pub const SENTINEL: &str = "COPERNICUS/S2_SR_HARMONIZED";
    pub const LANDSAT: &str = "LANDSAT/LC09/C02/T1_L2";
    pub const CHIRPS: &str = "UCSB-CHG/CHIRPS/DAILY";
    pub const ERA5_LAND: &str = "ECMWF/ERA5_LAND/HOURLY";
}

/// A small square polygon ring near Brasília.
pub fn roi_coordinates() -> Value {
    json!([[
        [-47.95, -15.80],
        [-47.90, -15.80],
        [-47.90, -15.75],
        [-47.95, -15.75],
        [-47.95, -15.80]
    ]])
}

/// ROI request body with the given date periods.
pub fn roi_request(periods: &[(&str, &str)]) -> Value {
    json!({
        "roi": { "coordinates": roi_coordinates() },
        "date_periods": periods
            .iter()
            .map(|(start, end)| json!([start, end]))
            .collect::<Vec<_>>(),
    })
}

/// Point request body with the given date periods.
pub fn point_request(periods: &[(&str, &str)]) -> Value {
    json!({
        "point": { "coordinates": [-47.93, -15.78] },
        "date_periods": periods
            .iter()
            .map(|(start, end)| json!([start, end]))
            .collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roi_request_shape() {
        let body = roi_request(&[("2024-01-01", "2024-01-31")]);
        assert!(body["roi"]["coordinates"].is_array());
        assert_eq!(body["date_periods"][0][1], "2024-01-31");
    }
}
